use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use snafu::{Snafu, ensure};

use crate::geometry::SECTOR_SIZE;

/// Errors when parsing a sparse image header from bytes.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display("source buffer is too short to read the header"))]
    ReadHeaderFailed,

    #[snafu(display("invalid magic {magic:#010x}"))]
    InvalidMagic { magic: u32 },

    #[snafu(display("unsupported version {version}"))]
    UnsupportedVersion { version: u32 },

    #[snafu(display("invalid page size {page_size}"))]
    InvalidPageSize { page_size: u32 },

    #[snafu(display("{page_count} pages of {page_size} bytes cannot hold {disk_size} bytes"))]
    TooFewPages {
        page_count: u32,
        page_size: u32,
        disk_size: u64,
    },
}

use zerocopy::byteorder::little_endian::{U32, U64};

/// Magic number at the start of every sparse image.
pub const SPARSE_HEADER_MAGIC: u32 = 0x02468ACE;

/// Version written by this crate.
pub const SPARSE_HEADER_VERSION: u32 = 2;

/// Previous version, still accepted when reading.
pub const SPARSE_HEADER_V1: u32 = 1;

/// The size of the sparse header on disk, padding included.
pub const SPARSE_HEADER_SIZE: usize = 256;

/// Allocation table entry of a page with no backing data.
pub const SPARSE_PAGE_NOT_ALLOCATED: u32 = 0xFFFFFFFF;

/// Default bytes per page.
pub const DEFAULT_PAGE_SIZE: u32 = 32 * 1024;

/// Contains the sparse image header as stored on disk.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub(crate) struct SparseHeaderRaw {
    magic: U32,            // 0x00
    version: U32,          // 0x04
    page_size: U32,        // 0x08
    page_count: U32,       // 0x0C
    disk_size: U64,        // 0x10
    _reserved: [U32; 58], // 0x18 - zero
}

const _: () = assert!(size_of::<SparseHeaderRaw>() == SPARSE_HEADER_SIZE);

/// Decoded sparse image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseHeader {
    version: u32,
    page_size: u32,
    page_count: u32,
    disk_size: u64,
}

impl SparseHeader {
    /// Creates a current-version header.
    pub(crate) fn new(page_size: u32, page_count: u32, disk_size: u64) -> Self {
        Self {
            version: SPARSE_HEADER_VERSION,
            page_size,
            page_count,
            disk_size,
        }
    }

    /// Parses the header directly from a byte slice.
    ///
    /// The slice must be at least [`SPARSE_HEADER_SIZE`] bytes. The reserved
    /// padding is not checked.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ReadError> {
        let (raw, _) =
            SparseHeaderRaw::read_from_prefix(data).map_err(|_| ReadHeaderFailedSnafu.build())?;

        let magic = raw.magic.get();
        ensure!(magic == SPARSE_HEADER_MAGIC, InvalidMagicSnafu { magic });

        let version = raw.version.get();
        ensure!(
            version == SPARSE_HEADER_VERSION || version == SPARSE_HEADER_V1,
            UnsupportedVersionSnafu { version }
        );

        let page_size = raw.page_size.get();
        ensure!(
            page_size.is_power_of_two() && page_size as u64 >= SECTOR_SIZE,
            InvalidPageSizeSnafu { page_size }
        );

        let page_count = raw.page_count.get();
        let disk_size = raw.disk_size.get();
        ensure!(
            page_count as u64 * page_size as u64 >= disk_size,
            TooFewPagesSnafu {
                page_count,
                page_size,
                disk_size,
            }
        );

        Ok(Self {
            version,
            page_size,
            page_count,
            disk_size,
        })
    }

    /// Encodes the header into its on-disk form.
    pub fn to_bytes(&self) -> [u8; SPARSE_HEADER_SIZE] {
        let mut raw = SparseHeaderRaw::new_zeroed();

        raw.magic = U32::new(SPARSE_HEADER_MAGIC);
        raw.version = U32::new(self.version);
        raw.page_size = U32::new(self.page_size);
        raw.page_count = U32::new(self.page_count);
        raw.disk_size = U64::new(self.disk_size);

        let mut out = [0u8; SPARSE_HEADER_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Gets the number of bytes per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Gets the number of entries in the allocation table.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Gets the virtual disk size in bytes.
    pub fn disk_size(&self) -> u64 {
        self.disk_size
    }

    /// Gets the allocation table size in bytes.
    pub fn table_size(&self) -> u64 {
        4 * self.page_count as u64
    }

    /// Gets the file offset of the first data page.
    ///
    /// The table is padded up to the next page boundary. When it already ends
    /// on one, a whole page of padding is still added.
    pub fn data_offset(&self) -> u64 {
        let page_size = self.page_size as u64;
        let so_far = SPARSE_HEADER_SIZE as u64 + self.table_size();

        so_far + (page_size - (so_far & (page_size - 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_layout() {
        let bytes = SparseHeader::new(DEFAULT_PAGE_SIZE, 3, 0x1_0000_0200).to_bytes();

        assert_eq!(&bytes[0..4], &[0xCE, 0x8A, 0x46, 0x02]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0x00, 0x80, 0, 0]);
        assert_eq!(&bytes[12..16], &[3, 0, 0, 0]);
        assert_eq!(&bytes[16..24], &[0x00, 0x02, 0, 0, 1, 0, 0, 0]);
        assert!(bytes[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parse_encoded_header() {
        let header = SparseHeader::new(DEFAULT_PAGE_SIZE, 33, 1024 * 1024);
        let parsed = SparseHeader::from_bytes(&header.to_bytes()).unwrap();

        assert_eq!(parsed, header);
        assert_eq!(parsed.table_size(), 132);
    }

    #[test]
    fn reject_short_buffer() {
        let bytes = SparseHeader::new(DEFAULT_PAGE_SIZE, 1, 0).to_bytes();
        let err = SparseHeader::from_bytes(&bytes[..255]).unwrap_err();
        assert!(matches!(err, ReadError::ReadHeaderFailed));
    }

    #[test]
    fn reject_bad_magic_and_version() {
        let mut bytes = SparseHeader::new(DEFAULT_PAGE_SIZE, 1, 0).to_bytes();
        bytes[4] = 3;
        assert!(matches!(
            SparseHeader::from_bytes(&bytes).unwrap_err(),
            ReadError::UnsupportedVersion { version: 3 }
        ));

        bytes[0] = 0;
        assert!(matches!(
            SparseHeader::from_bytes(&bytes).unwrap_err(),
            ReadError::InvalidMagic { .. }
        ));
    }

    #[test]
    fn accept_version_one() {
        let mut bytes = SparseHeader::new(DEFAULT_PAGE_SIZE, 1, 512).to_bytes();
        bytes[4] = 1;
        assert_eq!(SparseHeader::from_bytes(&bytes).unwrap().version(), 1);
    }

    #[test]
    fn reject_inconsistent_page_count() {
        let bytes = SparseHeader::new(DEFAULT_PAGE_SIZE, 1, DEFAULT_PAGE_SIZE as u64 + 512).to_bytes();
        assert!(matches!(
            SparseHeader::from_bytes(&bytes).unwrap_err(),
            ReadError::TooFewPages { .. }
        ));

        let bytes = SparseHeader::new(1000, 10, 512).to_bytes();
        assert!(matches!(
            SparseHeader::from_bytes(&bytes).unwrap_err(),
            ReadError::InvalidPageSize { page_size: 1000 }
        ));
    }
}
