//! Raw write primitives shared by the image formats.

use snafu::{ResultExt, Snafu, ensure};
use std::io::{self, Seek, SeekFrom, Write};
use tracing::trace;

/// Size of the reusable buffer used by [`fill()`].
pub const FILL_BLOCK_SIZE: usize = 4096;

/// Largest relative seek issued by [`extend_to()`].
///
/// This is `i32::MAX` rounded down to a whole sector so the cursor never
/// needs more than a signed 32-bit step on any platform.
pub const MAX_SEEK_STEP: u64 = 4_194_303 * 512;

/// Errors from the raw write primitives.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriteError {
    #[snafu(display("cannot seek to byte {offset}"))]
    Seek { offset: u64, source: io::Error },

    #[snafu(display("short write at byte {offset}: {written} of {expected} bytes"))]
    ShortWrite {
        offset: u64,
        written: usize,
        expected: usize,
    },

    #[snafu(display("cannot write at byte {offset}"))]
    WriteFailed { offset: u64, source: io::Error },
}

/// Writes `count` copies of `byte` to `out`.
///
/// A single [`FILL_BLOCK_SIZE`] buffer is reused for every chunk, so memory
/// use does not depend on `count`. `offset` is only used for error reporting
/// and should be the position of the cursor when the call starts.
pub fn fill<W: Write>(out: &mut W, byte: u8, count: u64, offset: u64) -> Result<(), WriteError> {
    let block = [byte; FILL_BLOCK_SIZE];
    let mut written = 0u64;

    trace!(byte, count, offset, "filling");

    while written < count {
        let len = (count - written).min(FILL_BLOCK_SIZE as u64) as usize;
        write_bytes(out, &block[..len], offset + written)?;
        written += len as u64;
    }

    Ok(())
}

/// Writes `data` with a single write call, failing if it is not taken whole.
///
/// `offset` is only used for error reporting.
pub fn write_bytes<W: Write>(out: &mut W, data: &[u8], offset: u64) -> Result<(), WriteError> {
    let n = out.write(data).context(WriteFailedSnafu { offset })?;

    ensure!(
        n == data.len(),
        ShortWriteSnafu {
            offset,
            written: n,
            expected: data.len(),
        }
    );

    Ok(())
}

/// Grows `out` to exactly `size` bytes without writing the bytes in between.
///
/// The cursor is rewound, advanced by relative seeks of at most
/// [`MAX_SEEK_STEP`] bytes, and a single zero byte is written at `size - 1`.
/// The skipped range is left to the filesystem, which reads it back as zeros.
/// A `size` of zero leaves `out` untouched.
pub fn extend_to<W: Write + Seek>(out: &mut W, size: u64) -> Result<(), WriteError> {
    if size == 0 {
        return Ok(());
    }

    out.seek(SeekFrom::Start(0))
        .context(SeekSnafu { offset: 0u64 })?;

    let target = size - 1;
    let mut pos = 0u64;

    while pos < target {
        let step = (target - pos).min(MAX_SEEK_STEP);
        pos += step;

        trace!(step, pos, "seeking");

        out.seek(SeekFrom::Current(step as i64))
            .context(SeekSnafu { offset: pos })?;
    }

    write_bytes(out, &[0], target)
}
