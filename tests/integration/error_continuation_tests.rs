use crate::common::{card, write_image};
use rotodupe::duplicates::{DuplicateFinder, FinderConfig};
use rotodupe::error::ExitCode;
use rotodupe::scanner::FileEntry;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_corrupt_image_does_not_abort_scan() {
    let dir = tempdir().unwrap();
    let image = card(32, 32);
    write_image(dir.path(), "a.png", &image);
    write_image(dir.path(), "b.png", &image);
    std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();

    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.summary.total_images, 3);
    assert_eq!(report.summary.hashed_images, 2);
    assert_eq!(report.groups().len(), 1);

    assert_eq!(report.summary.failures.len(), 1);
    let failure = &report.summary.failures[0];
    assert!(failure.path.ends_with("broken.png"));
    assert!(failure.message.contains("decode"));
    assert!(report.summary.is_partial());

    assert_eq!(
        ExitCode::for_scan(
            report.summary.interrupted,
            report.summary.is_partial(),
            report.has_duplicates()
        ),
        ExitCode::PartialSuccess
    );
}

#[test]
fn test_find_duplicates_from_files_continues_on_error() {
    let finder = DuplicateFinder::with_defaults().unwrap();
    let file1 = FileEntry::new(PathBuf::from("nonexistent_1.png"), 100);
    let file2 = FileEntry::new(PathBuf::from("nonexistent_2.png"), 100);

    let report = finder.find_duplicates_from_files(vec![file1, file2]).unwrap();

    assert!(report.groups().is_empty());
    assert_eq!(report.summary.failures.len(), 2);
    assert_eq!(
        report.summary.failures[0].path,
        PathBuf::from("nonexistent_1.png")
    );
    for failure in &report.summary.failures {
        assert!(failure.message.contains("not found"), "{}", failure.message);
    }
}

#[test]
fn test_failed_images_keep_their_walk_position() {
    let dir = tempdir().unwrap();
    let image = card(32, 32);
    let good_a = write_image(dir.path(), "1.png", &image);
    let bad = dir.path().join("2.png");
    std::fs::write(&bad, b"\x89PNG\r\n\x1a\n").unwrap();
    let good_b = write_image(dir.path(), "3.png", &image);

    let files = vec![
        FileEntry::new(good_a.clone(), 0),
        FileEntry::new(bad.clone(), 0),
        FileEntry::new(good_b.clone(), 0),
    ];
    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates_from_files(files)
        .unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].path(), Some(good_a.as_path()));
    assert_eq!(report.records[1].path(), Some(good_b.as_path()));
    assert_eq!(report.summary.failures[0].path, bad);
    assert_eq!(report.group_indices(), &[vec![0, 1]]);
}

#[test]
fn test_generous_timeout_still_hashes() {
    let dir = tempdir().unwrap();
    let image = card(64, 64);
    write_image(dir.path(), "a.png", &image);
    write_image(dir.path(), "b.png", &image);

    let config = FinderConfig::default().with_hash_timeout(Some(Duration::from_secs(60)));
    let report = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.summary.failures.is_empty());
    assert!(report.has_duplicates());
}
