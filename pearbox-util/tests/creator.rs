use pearbox_image::{CreateError, Geometry, ImageFormat, ImageInfo, inspect_image};
use pearbox_util::{CreateProgress, CreatorError, ImageCreator, SilentProgress};

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Start(PathBuf, u64, ImageFormat),
    Completed(PathBuf, u64),
    Failed(PathBuf),
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl CreateProgress for Recorder {
    fn image_start(&self, path: &Path, geometry: &Geometry, format: ImageFormat) {
        self.events.borrow_mut().push(Event::Start(
            path.to_path_buf(),
            geometry.total_sectors(),
            format,
        ));
    }

    fn image_completed(&self, path: &Path, geometry: &Geometry) {
        self.events
            .borrow_mut()
            .push(Event::Completed(path.to_path_buf(), geometry.total_sectors()));
    }

    fn image_failed(&self, path: &Path) {
        self.events
            .borrow_mut()
            .push(Event::Failed(path.to_path_buf()));
    }
}

#[test]
fn reports_start_and_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("HD1.img");
    let creator = ImageCreator::new(ImageFormat::Flat, Recorder::default());

    let geometry = creator.create(128, &path).unwrap();
    let size = fs::metadata(&path).unwrap().len();

    assert_eq!(size, geometry.size_in_bytes());

    let Recorder { events } = creator.into_progress();
    assert_eq!(
        events.into_inner(),
        [
            Event::Start(path.clone(), geometry.total_sectors(), ImageFormat::Flat),
            Event::Completed(path, geometry.total_sectors()),
        ]
    );
}

#[test]
fn sparse_completion_reports_disk_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("HD2.img");
    let creator = ImageCreator::new(ImageFormat::sparse(), Recorder::default());

    let geometry = creator.create(1024, &path).unwrap();

    // The sparse file only holds the header and table.
    assert!(fs::metadata(&path).unwrap().len() < geometry.size_in_bytes());

    let events = creator.into_progress().events.into_inner();
    assert_eq!(
        events.last(),
        Some(&Event::Completed(path, geometry.total_sectors()))
    );
}

#[test]
fn reports_failure_for_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("HD1.img");
    fs::write(&path, b"keep me").unwrap();

    let creator = ImageCreator::new(ImageFormat::sparse(), Recorder::default());
    let err = creator.create(64, &path).unwrap_err();

    assert!(matches!(
        err,
        CreatorError::CreateFailed {
            source: CreateError::TargetExists { .. }
        }
    ));
    assert_eq!(fs::read(&path).unwrap(), b"keep me");

    let events = creator.into_progress().events.into_inner();
    assert!(matches!(events.last(), Some(Event::Failed(p)) if *p == path));
}

#[test]
fn invalid_size_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.img");
    let creator = ImageCreator::new(ImageFormat::Flat, Recorder::default());

    let err = creator.create(u64::MAX, &path).unwrap_err();

    assert!(matches!(err, CreatorError::InvalidSize { .. }));
    assert!(creator.into_progress().events.into_inner().is_empty());
    assert!(!path.exists());
}

#[test]
fn silent_sparse_image_inspects_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("HD2.img");
    let creator = ImageCreator::new(ImageFormat::from_sparse_flag(true), SilentProgress);

    let geometry = creator.create(512, &path).unwrap();

    match inspect_image(&path).unwrap() {
        ImageInfo::Sparse {
            header,
            allocated_pages,
            ..
        } => {
            assert_eq!(header.disk_size(), geometry.size_in_bytes());
            assert_eq!(allocated_pages, 0);
        }
        other => panic!("expected sparse image, got {other:?}"),
    }
}
