use snafu::{ResultExt, Snafu};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::format::{ImageFormat, ProduceError};
use crate::geometry::{Geometry, GeometryError};

/// Errors for [`create_image()`] and [`create_image_with_geometry()`].
///
/// A failure after the target has been opened leaves a partially written
/// file behind; removing it is up to the caller.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum CreateError {
    #[snafu(display("invalid disk size"))]
    Geometry { source: GeometryError },

    #[snafu(display("{} already exists", path.display()))]
    TargetExists { path: PathBuf },

    #[snafu(display("cannot create {}", path.display()))]
    OpenTarget {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot write image {}", path.display()))]
    Produce { path: PathBuf, source: ProduceError },

    #[snafu(display("cannot flush image {}", path.display()))]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Creates a new disk image of `size_mb` megabytes at `path`.
///
/// An existing file at `path` is never touched. The image size is derived
/// from [`Geometry::from_megabytes()`], so it may be slightly smaller than
/// requested. Returns the geometry of the created image.
pub fn create_image(
    size_mb: u64,
    path: impl AsRef<Path>,
    format: ImageFormat,
) -> Result<Geometry, CreateError> {
    let geometry = Geometry::from_megabytes(size_mb).context(GeometrySnafu)?;

    create_image_with_geometry(geometry, path, format)
}

/// Creates a new disk image at `path` for an already computed `geometry`.
pub fn create_image_with_geometry(
    geometry: Geometry,
    path: impl AsRef<Path>,
    format: ImageFormat,
) -> Result<Geometry, CreateError> {
    let path = path.as_ref();

    debug!(
        %geometry,
        sectors = geometry.total_sectors(),
        %format,
        path = %path.display(),
        "creating image"
    );

    // create_new fails atomically if anything is already at the path.
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return TargetExistsSnafu { path }.fail();
        }
        Err(e) => return Err(e).context(OpenTargetSnafu { path }),
    };

    format
        .produce(&mut file, geometry.total_sectors())
        .context(ProduceSnafu { path })?;

    file.flush().context(FlushSnafu { path })?;

    info!(path = %path.display(), bytes = geometry.size_in_bytes(), %format, "image created");

    Ok(geometry)
}
