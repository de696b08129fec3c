use pearbox_image::{Geometry, ImageFormat};
use std::path::Path;

/// Trait for receiving image creation progress updates.
pub trait CreateProgress {
    /// Called once the geometry is known, before the file is created.
    fn image_start(&self, _path: &Path, _geometry: &Geometry, _format: ImageFormat) {}

    /// Called when the image has been written and closed.
    fn image_completed(&self, _path: &Path, _geometry: &Geometry) {}

    /// Called when creation fails. The file may be partially written.
    fn image_failed(&self, _path: &Path) {}
}

/// A no-op progress implementation that discards all updates.
pub struct SilentProgress;

impl CreateProgress for SilentProgress {}

/// Console progress reporter using an indicatif spinner.
///
/// Writing a large sparse allocation table can take a moment, so a spinner
/// ticks on stderr while the image is being produced.
#[cfg(feature = "cli")]
pub struct ConsoleProgress {
    spinner: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            spinner: indicatif::ProgressBar::hidden(),
        }
    }
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl CreateProgress for ConsoleProgress {
    fn image_start(&self, path: &Path, geometry: &Geometry, format: ImageFormat) {
        self.spinner
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.spinner.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed_precise}]")
                .unwrap(),
        );
        self.spinner.set_message(format!(
            "Writing {} image {} ({}, {} sectors)",
            format,
            path.display(),
            geometry,
            geometry.total_sectors()
        ));
        self.spinner
            .enable_steady_tick(std::time::Duration::from_millis(100));
    }

    fn image_completed(&self, _path: &Path, _geometry: &Geometry) {
        self.spinner.finish_and_clear();
    }

    fn image_failed(&self, _path: &Path) {
        self.spinner.finish_and_clear();
    }
}
