//! A library for creating PearPC hard-disk images.
//!
//! Two on-disk formats are supported:
//!
//! - **Flat**: the file is as large as the virtual disk. It is created by
//!   writing a single byte at the end and letting the filesystem leave a hole.
//! - **Sparse**: a 256-byte header, a page allocation table with every page
//!   unallocated, and padding up to the first page boundary. Data pages are
//!   appended by the emulator as sectors are written.
//!
//! Disk sizes are given in megabytes and converted to a legacy
//! cylinder/head/sector [`Geometry`] with 16 heads and 63 sectors per track.
//!
//! # Example
//!
//! ```no_run
//! use pearbox_image::{ImageFormat, create_image};
//!
//! let geometry = create_image(1024, "HD1.img", ImageFormat::Flat).unwrap();
//! println!("created {} sectors", geometry.total_sectors());
//!
//! create_image(41984, "HD2.img", ImageFormat::from_sparse_flag(true)).unwrap();
//! ```

pub mod create;
pub mod endian;
pub mod format;
pub mod geometry;
pub mod header;
pub mod inspect;
pub mod writer;

pub use self::create::{CreateError, create_image, create_image_with_geometry};
pub use self::format::{ImageFormat, ProduceError, SparseLayout};
pub use self::geometry::{Geometry, GeometryError, SECTOR_SIZE};
pub use self::header::{DEFAULT_PAGE_SIZE, SparseHeader};
pub use self::inspect::{ImageInfo, InspectError, inspect_image};
