use snafu::{OptionExt, Snafu, ensure};
use std::fmt::{Display, Formatter};

/// Bytes per sector.
pub const SECTOR_SIZE: u64 = 512;

/// Heads per cylinder used for every created image.
pub const HEADS: u32 = 16;

/// Sectors per track used for every created image.
pub const SECTORS_PER_TRACK: u32 = 63;

/// Number of bits available for the cylinder count (8 TB).
pub const MAX_CYLINDER_BITS: u32 = 24;

/// Errors when deriving a geometry from a requested size.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum GeometryError {
    #[snafu(display("{size_mb} MB does not fit in a 64-bit byte count"))]
    SizeOverflow { size_mb: u64 },

    #[snafu(display(
        "{size_mb} MB needs {cylinders} cylinders, the limit is {}",
        (1u64 << MAX_CYLINDER_BITS) - 1
    ))]
    CylinderOverflow { size_mb: u64, cylinders: u64 },
}

/// Cylinder/head/sector triple of a disk image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    cylinders: u64,
    heads: u32,
    sectors_per_track: u32,
}

impl Geometry {
    /// Derives the geometry for a disk of `size_mb` megabytes.
    ///
    /// Heads and sectors per track are fixed at 16 and 63; the cylinder count
    /// is rounded down, so the resulting disk may be up to one cylinder
    /// (516096 bytes) smaller than requested.
    pub fn from_megabytes(size_mb: u64) -> Result<Self, GeometryError> {
        let bytes = size_mb
            .checked_mul(1024 * 1024)
            .context(SizeOverflowSnafu { size_mb })?;
        let cylinders = bytes / (HEADS as u64) / (SECTORS_PER_TRACK as u64) / SECTOR_SIZE;

        ensure!(
            cylinders < (1 << MAX_CYLINDER_BITS),
            CylinderOverflowSnafu { size_mb, cylinders }
        );

        Ok(Self {
            cylinders,
            heads: HEADS,
            sectors_per_track: SECTORS_PER_TRACK,
        })
    }

    pub fn cylinders(&self) -> u64 {
        self.cylinders
    }

    pub fn heads(&self) -> u32 {
        self.heads
    }

    pub fn sectors_per_track(&self) -> u32 {
        self.sectors_per_track
    }

    /// Gets the number of addressable sectors.
    pub fn total_sectors(&self) -> u64 {
        self.cylinders * self.heads as u64 * self.sectors_per_track as u64
    }

    /// Gets the disk size in bytes.
    pub fn size_in_bytes(&self) -> u64 {
        self.total_sectors() * SECTOR_SIZE
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "CHS {}/{}/{}",
            self.cylinders, self.heads, self.sectors_per_track
        )
    }
}
