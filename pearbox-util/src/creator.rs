use crate::progress::CreateProgress;
use pearbox_image::{CreateError, Geometry, GeometryError, ImageFormat};
use snafu::{ResultExt, Snafu};
use std::path::Path;

/// Errors that can occur while creating an image through [`ImageCreator`].
#[derive(Debug, Snafu)]
pub enum CreatorError {
    #[snafu(display("invalid disk size: {source}"))]
    InvalidSize { source: GeometryError },

    #[snafu(display("{source}"))]
    CreateFailed { source: CreateError },
}

/// Creates disk images and reports progress.
pub struct ImageCreator<P: CreateProgress> {
    format: ImageFormat,
    progress: P,
}

impl<P: CreateProgress> ImageCreator<P> {
    pub fn new(format: ImageFormat, progress: P) -> Self {
        Self { format, progress }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Consumes the creator, returning its progress reporter.
    pub fn into_progress(self) -> P {
        self.progress
    }

    /// Creates an image of `size_mb` megabytes at `path`.
    ///
    /// The target must not exist. On failure after the file was opened, the
    /// partial file is left in place.
    pub fn create(&self, size_mb: u64, path: impl AsRef<Path>) -> Result<Geometry, CreatorError> {
        let path = path.as_ref();
        let geometry = Geometry::from_megabytes(size_mb).context(InvalidSizeSnafu)?;

        self.progress.image_start(path, &geometry, self.format);

        let created = match pearbox_image::create_image_with_geometry(geometry, path, self.format)
        {
            Ok(created) => created,
            Err(e) => {
                self.progress.image_failed(path);
                return Err(e).context(CreateFailedSnafu);
            }
        };

        self.progress.image_completed(path, &created);

        Ok(created)
    }
}
