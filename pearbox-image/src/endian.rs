//! Conversion between host and on-disk byte order.
//!
//! Every multi-byte field of a disk image is stored little-endian. On a
//! little-endian host these functions are the identity, on a big-endian host
//! they swap bytes. They are never needed for single-byte fills.

use byteorder::{ByteOrder, LittleEndian};

macro_rules! disk_codec {
    ($to:ident, $from:ident, $ty:ty, $write:ident, $read:ident) => {
        #[doc = concat!("Converts a host `", stringify!($ty), "` to its on-disk representation.")]
        #[inline]
        #[must_use]
        pub fn $to(value: $ty) -> $ty {
            let mut buf = [0u8; size_of::<$ty>()];
            LittleEndian::$write(&mut buf, value);
            <$ty>::from_ne_bytes(buf)
        }

        #[doc = concat!("Converts an on-disk `", stringify!($ty), "` to host byte order.")]
        #[inline]
        #[must_use]
        pub fn $from(value: $ty) -> $ty {
            LittleEndian::$read(&value.to_ne_bytes())
        }
    };
}

disk_codec!(to_disk16, from_disk16, u16, write_u16, read_u16);
disk_codec!(to_disk32, from_disk32, u32, write_u32, read_u32);
disk_codec!(to_disk64, from_disk64, u64, write_u64, read_u64);

/// Decodes a run of on-disk `u32` entries (e.g. a page allocation table).
///
/// Trailing bytes that do not form a whole entry are ignored.
pub fn decode_u32_entries(data: &[u8]) -> impl Iterator<Item = u32> + '_ {
    data.chunks_exact(4).map(|chunk| {
        let raw = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        from_disk32(raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_values_are_little_endian_in_memory() {
        assert_eq!(to_disk16(0x1234).to_ne_bytes(), [0x34, 0x12]);
        assert_eq!(to_disk32(0x02468ACE).to_ne_bytes(), [0xCE, 0x8A, 0x46, 0x02]);
        assert_eq!(
            to_disk64(0x0102_0304_0506_0708).to_ne_bytes(),
            [8, 7, 6, 5, 4, 3, 2, 1]
        );
    }

    #[test]
    fn from_disk_reverses_to_disk() {
        assert_eq!(from_disk16(to_disk16(0xBEEF)), 0xBEEF);
        assert_eq!(from_disk32(to_disk32(0xDEAD_BEEF)), 0xDEAD_BEEF);
        assert_eq!(from_disk64(to_disk64(u64::MAX - 7)), u64::MAX - 7);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn identity_on_little_endian_hosts() {
        assert_eq!(to_disk32(0x1122_3344), 0x1122_3344);
        assert_eq!(from_disk64(42), 42);
    }

    #[test]
    fn decodes_table_entries() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0xAA];
        let entries: Vec<u32> = decode_u32_entries(&data).collect();
        assert_eq!(entries, [0xFFFF_FFFF, 1]);
    }
}
