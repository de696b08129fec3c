//! Flat and sparse image producers.

use snafu::{ResultExt, Snafu, ensure};
use std::fmt::{Display, Formatter};
use std::io::{Seek, Write};
use tracing::debug;

use crate::geometry::SECTOR_SIZE;
use crate::header::{DEFAULT_PAGE_SIZE, SPARSE_HEADER_SIZE, SparseHeader};
use crate::writer::{WriteError, extend_to, fill, write_bytes};

/// Errors while writing an image body to an open file.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ProduceError {
    #[snafu(display("cannot extend image to {size} bytes (image larger than free space?)"))]
    ExtendImage { size: u64, source: WriteError },

    #[snafu(display("invalid sparse page size {page_size}"))]
    InvalidPageSize { page_size: u32 },

    #[snafu(display("{sectors} sectors need {page_count} pages, too many for a sparse image"))]
    TooLargeForSparse { sectors: u64, page_count: u64 },

    #[snafu(display("cannot write sparse header"))]
    WriteHeader { source: WriteError },

    #[snafu(display("cannot write page allocation table"))]
    WriteTable { source: WriteError },

    #[snafu(display("cannot pad sparse image to a page boundary"))]
    WritePadding { source: WriteError },
}

/// On-disk representation of a created image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Every sector has a place in the file; unwritten ranges are holes.
    #[default]
    Flat,

    /// A header and page allocation table followed by on-demand data pages.
    Sparse { page_size: u32 },
}

impl ImageFormat {
    /// Gets a sparse format with [`DEFAULT_PAGE_SIZE`] pages.
    pub const fn sparse() -> Self {
        Self::Sparse {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Maps the boolean `sparse` switch to a format.
    pub const fn from_sparse_flag(sparse: bool) -> Self {
        if sparse { Self::sparse() } else { Self::Flat }
    }

    /// Writes an image of `sectors` sectors to `out`, which must be empty.
    pub fn produce<W: Write + Seek>(self, out: &mut W, sectors: u64) -> Result<(), ProduceError> {
        match self {
            Self::Flat => produce_flat(out, sectors),
            Self::Sparse { page_size } => produce_sparse(out, sectors, page_size),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Sparse { page_size } => write!(f, "sparse ({} KiB pages)", page_size / 1024),
        }
    }
}

/// Produces a flat image by extending the file to its full size.
pub fn produce_flat<W: Write + Seek>(out: &mut W, sectors: u64) -> Result<(), ProduceError> {
    let size = sectors * SECTOR_SIZE;

    debug!(sectors, size, "writing flat image");

    extend_to(out, size).context(ExtendImageSnafu { size })
}

/// Byte layout of a sparse image before its first data page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseLayout {
    header: SparseHeader,
}

impl SparseLayout {
    /// Computes the layout for a disk of `sectors` sectors.
    ///
    /// The page count is `sectors / (page_size / 512) + 1`. This overcounts by
    /// one page when the disk is page aligned; existing readers expect it.
    pub fn new(sectors: u64, page_size: u32) -> Result<Self, ProduceError> {
        ensure!(
            page_size.is_power_of_two()
                && page_size as u64 >= SECTOR_SIZE
                && page_size <= 1 << 31,
            InvalidPageSizeSnafu { page_size }
        );

        let page_count = sectors / (page_size as u64 / SECTOR_SIZE) + 1;
        let page_count_u32 = u32::try_from(page_count).map_err(|_| {
            TooLargeForSparseSnafu {
                sectors,
                page_count,
            }
            .build()
        })?;

        let header = SparseHeader::new(page_size, page_count_u32, sectors * SECTOR_SIZE);

        Ok(Self { header })
    }

    pub fn header(&self) -> &SparseHeader {
        &self.header
    }

    /// Gets the number of zero bytes after the allocation table.
    pub fn padding(&self) -> u64 {
        self.data_offset() - SPARSE_HEADER_SIZE as u64 - self.header.table_size()
    }

    /// Gets the offset of the first data page, which is also the file size
    /// of a freshly created image.
    pub fn data_offset(&self) -> u64 {
        self.header.data_offset()
    }
}

/// Produces a sparse image with every page unallocated.
pub fn produce_sparse<W: Write>(
    out: &mut W,
    sectors: u64,
    page_size: u32,
) -> Result<(), ProduceError> {
    let layout = SparseLayout::new(sectors, page_size)?;
    let header = layout.header();

    debug!(
        sectors,
        page_size,
        page_count = header.page_count(),
        padding = layout.padding(),
        "writing sparse image"
    );

    write_bytes(out, &header.to_bytes(), 0).context(WriteHeaderSnafu)?;

    // Every entry is SPARSE_PAGE_NOT_ALLOCATED, whose bytes are all 0xFF.
    let table_offset = SPARSE_HEADER_SIZE as u64;
    fill(out, 0xFF, header.table_size(), table_offset).context(WriteTableSnafu)?;

    let padding_offset = table_offset + header.table_size();
    fill(out, 0, layout.padding(), padding_offset).context(WritePaddingSnafu)?;

    Ok(())
}
