//! Library for managing PearPC disk images and configuration files.
//!
//! This crate ties [`pearbox_image`] and [`pearbox_config`] together for the
//! `pearbox-util` command-line tool.
//!
//! # Example
//!
//! ```no_run
//! use pearbox_image::ImageFormat;
//! use pearbox_util::{ImageCreator, SilentProgress};
//!
//! let creator = ImageCreator::new(ImageFormat::sparse(), SilentProgress);
//! let geometry = creator.create(41984, "HD2.img").expect("creation failed");
//! println!("{geometry}");
//! ```
//!
//! # Custom progress reporting
//!
//! Implement the [`CreateProgress`] trait to be told when an image is started,
//! completed, or fails.

pub mod creator;
pub mod progress;

pub use self::creator::{CreatorError, ImageCreator};
pub use self::progress::{CreateProgress, SilentProgress};

#[cfg(feature = "cli")]
pub use self::progress::ConsoleProgress;
