//! Read-side checks for images produced by this crate.

use snafu::{ResultExt, Snafu, ensure};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::endian::{decode_u32_entries, from_disk32};
use crate::geometry::SECTOR_SIZE;
use crate::header::{
    ReadError, SPARSE_HEADER_MAGIC, SPARSE_HEADER_SIZE, SPARSE_PAGE_NOT_ALLOCATED, SparseHeader,
};

const TABLE_CHUNK_SIZE: usize = 64 * 1024;

/// Errors for [`inspect_image()`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum InspectError {
    #[snafu(display("cannot open {}", path.display()))]
    OpenImage { path: PathBuf, source: io::Error },

    #[snafu(display("cannot read {}", path.display()))]
    ReadImage { path: PathBuf, source: io::Error },

    #[snafu(display("cannot parse sparse header of {}", path.display()))]
    ReadHeaderFailed { path: PathBuf, source: ReadError },

    #[snafu(display("{} ends inside its page allocation table", path.display()))]
    TruncatedTable { path: PathBuf },
}

/// Summary of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageInfo {
    Flat {
        /// File size in bytes.
        size: u64,
        /// Number of whole sectors.
        sectors: u64,
    },
    Sparse {
        header: SparseHeader,
        /// Number of table entries pointing at a data page.
        allocated_pages: u32,
        /// File offset of the first data page.
        data_offset: u64,
    },
}

impl ImageInfo {
    /// Gets the virtual disk size in bytes.
    pub fn disk_size(&self) -> u64 {
        match self {
            Self::Flat { size, .. } => *size,
            Self::Sparse { header, .. } => header.disk_size(),
        }
    }
}

/// Identifies and summarizes the image at `path`.
///
/// A file that begins with the sparse magic is parsed as a sparse image and
/// its allocation table is scanned; anything else is treated as flat.
pub fn inspect_image(path: impl AsRef<Path>) -> Result<ImageInfo, InspectError> {
    let path = path.as_ref();
    let mut file = File::open(path).context(OpenImageSnafu { path })?;
    let size = file.metadata().context(ReadImageSnafu { path })?.len();

    let mut head = [0u8; SPARSE_HEADER_SIZE];
    let read = read_up_to(&mut file, &mut head).context(ReadImageSnafu { path })?;

    let is_sparse = read >= 4
        && from_disk32(u32::from_ne_bytes([head[0], head[1], head[2], head[3]]))
            == SPARSE_HEADER_MAGIC;

    if !is_sparse {
        return Ok(ImageInfo::Flat {
            size,
            sectors: size / SECTOR_SIZE,
        });
    }

    let header =
        SparseHeader::from_bytes(&head[..read]).context(ReadHeaderFailedSnafu { path })?;

    let mut remaining = header.table_size();
    let mut allocated_pages = 0u32;
    let mut chunk = vec![0u8; TABLE_CHUNK_SIZE];

    while remaining > 0 {
        let len = remaining.min(TABLE_CHUNK_SIZE as u64) as usize;
        let n = read_up_to(&mut file, &mut chunk[..len]).context(ReadImageSnafu { path })?;

        ensure!(n == len, TruncatedTableSnafu { path });

        allocated_pages += decode_u32_entries(&chunk[..len])
            .filter(|&entry| entry != SPARSE_PAGE_NOT_ALLOCATED)
            .count() as u32;
        remaining -= len as u64;
    }

    Ok(ImageInfo::Sparse {
        header,
        allocated_pages,
        data_offset: header.data_offset(),
    })
}

/// Reads until `buf` is full or the end of the file is reached.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;

    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(total)
}
