use crate::common::{card, noise, write_image};
use rotodupe::actions::copy::{copy_groups, group_dir};
use rotodupe::cli::Cli;
use rotodupe::duplicates::DuplicateFinder;
use rotodupe::error::ExitCode;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use clap::Parser;

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_copy_each_group_to_its_own_directory() {
    let dir = tempdir().unwrap();
    let photos = dir.path().join("photos");
    let first = card(32, 32);
    let second = noise(8, 32);
    write_image(&photos, "a1.png", &first);
    write_image(&photos, "a2.bmp", &first);
    write_image(&photos, "b1.png", &second);
    write_image(&photos, "b2.png", &second);
    write_image(&photos, "lonely.png", &noise(9, 32));

    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates(&photos)
        .unwrap();
    let groups = report.groups();
    assert_eq!(groups.len(), 2);

    let review = dir.path().join("review");
    let summary = copy_groups(&groups, &review).unwrap();

    assert_eq!(summary.copied, 4);
    assert_eq!(summary.skipped, 0);
    assert_eq!(sorted_names(&review), vec!["group_0", "group_1"]);
    assert_eq!(sorted_names(&group_dir(&review, 0)), vec!["a1.png", "a2.bmp"]);
    assert_eq!(sorted_names(&group_dir(&review, 1)), vec!["b1.png", "b2.png"]);

    let original = fs::read(photos.join("a2.bmp")).unwrap();
    let copied = fs::read(group_dir(&review, 0).join("a2.bmp")).unwrap();
    assert_eq!(original, copied);
}

#[test]
fn test_copy_renames_colliding_file_names() {
    let dir = tempdir().unwrap();
    let photos = dir.path().join("photos");
    let image = card(32, 32);
    write_image(&photos, "2023/img.png", &image);
    write_image(&photos, "2024/img.png", &image);

    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates(&photos)
        .unwrap();
    let review = dir.path().join("review");
    copy_groups(&report.groups(), &review).unwrap();

    let names = sorted_names(&group_dir(&review, 0));
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"img.png".to_string()));
    let renamed = names.iter().find(|n| *n != "img.png").unwrap();
    assert!(renamed.starts_with("img_"));
    assert!(renamed.ends_with(".png"));
    assert!(renamed[4..12].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_scan_with_copy_to_flag() {
    let dir = tempdir().unwrap();
    let photos = dir.path().join("photos");
    let image = card(32, 32);
    write_image(&photos, "x.png", &image);
    write_image(&photos, "y.png", &image);
    let review = dir.path().join("review");
    let output = dir.path().join("listing.txt");

    let cli = Cli::try_parse_from([
        "rotodupe",
        "-q",
        "scan",
        photos.to_str().unwrap(),
        "--copy-to",
        review.to_str().unwrap(),
        "--output-file",
        output.to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(rotodupe::run_app(cli).unwrap(), ExitCode::Success);
    assert_eq!(sorted_names(&group_dir(&review, 0)), vec!["x.png", "y.png"]);
}
