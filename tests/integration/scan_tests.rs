use crate::common::{card, noise, write_image};
use image::{imageops, DynamicImage};
use rotodupe::cli::Cli;
use rotodupe::duplicates::{DuplicateFinder, FinderConfig, GroupingConfig, MatchMode};
use rotodupe::error::ExitCode;
use rotodupe::output::JsonOutput;
use rotodupe::record::ImageRecord;
use rotodupe::scanner::{HasherConfig, PerceptualHasher, WalkerConfig};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

use clap::Parser;

fn finder(grouping: GroupingConfig) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_grouping(grouping)).unwrap()
}

fn file_names(paths: Vec<&Path>) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.groups().is_empty());
    assert!(!report.has_duplicates());
    assert_eq!(report.summary.total_images, 0);
    assert_eq!(report.summary.duplicate_groups, 0);
}

#[test]
fn test_scan_ignores_non_image_extensions() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    std::fs::write(dir.path().join("copy.txt"), b"hello").unwrap();

    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.groups().is_empty());
    assert_eq!(report.summary.total_images, 0);
    assert!(report.summary.failures.is_empty());
}

#[test]
fn test_identical_images_are_grouped() {
    let dir = tempdir().unwrap();
    let image = card(64, 48);
    write_image(dir.path(), "a.png", &image);
    write_image(dir.path(), "b.bmp", &image);
    write_image(dir.path(), "c.png", &noise(5, 32));

    let report = finder(GroupingConfig::default())
        .find_duplicates(dir.path())
        .unwrap();
    let groups = report.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(file_names(groups[0].paths()), vec!["a.png", "b.bmp"]);
    assert_eq!(
        groups[0].records()[0].hash.difference(&groups[0].records()[1].hash).unwrap(),
        0.0
    );
    assert_eq!(report.summary.total_images, 3);
    assert_eq!(report.summary.hashed_images, 3);
    assert_eq!(report.summary.duplicate_groups, 1);
    assert_eq!(report.summary.duplicate_images, 1);
    let scanned: u64 = ["a.png", "b.bmp", "c.png"]
        .iter()
        .map(|name| std::fs::metadata(dir.path().join(name)).unwrap().len())
        .sum();
    assert_eq!(report.summary.total_size, scanned);
}

/// Nudge single pixels of `base` until its hash moves by a nonzero amount no
/// larger than `limit`.
fn near_duplicate(base: &DynamicImage, limit: f64) -> (DynamicImage, f64) {
    let hasher = PerceptualHasher::new(HasherConfig::default()).unwrap();
    let original = ImageRecord::from_matrix(base, &hasher).unwrap().hash;
    let luma = base.to_luma8();
    for (x, y) in [(16, 16), (3, 7), (25, 12), (9, 28), (30, 1)] {
        for delta in 1..=u8::MAX {
            let mut nudged = luma.clone();
            let pixel = &mut nudged.get_pixel_mut(x, y).0[0];
            *pixel = pixel.wrapping_add(delta);
            let candidate = DynamicImage::ImageLuma8(nudged);
            let hash = ImageRecord::from_matrix(&candidate, &hasher).unwrap().hash;
            let difference = hash.difference(&original).unwrap();
            if difference > 0.0 && difference <= limit {
                return (candidate, difference);
            }
        }
    }
    panic!("no single-pixel change moved the hash by at most {limit}");
}

#[test]
fn test_near_duplicates_with_threshold() {
    let dir = tempdir().unwrap();
    let a = noise(21, 32);
    let (b, expected) = near_duplicate(&a, 0.01);
    write_image(dir.path(), "a.png", &a);
    write_image(dir.path(), "b.png", &b);
    write_image(dir.path(), "c.png", &noise(22, 32));

    let exact = finder(GroupingConfig::default())
        .find_duplicates(dir.path())
        .unwrap();
    assert!(!exact.has_duplicates());
    assert_eq!(exact.summary.hashed_images, 3);

    let grouping = GroupingConfig::default().with_threshold(0.01);
    let report = finder(grouping).find_duplicates(dir.path()).unwrap();
    let groups = report.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(file_names(groups[0].paths()), vec!["a.png", "b.png"]);
    let members = groups[0].records();
    let difference = members[0].hash.difference(&members[1].hash).unwrap();
    assert_eq!(difference, expected);
    assert!(difference > 0.0 && difference <= 0.01);

    let c = report
        .records
        .iter()
        .find(|r| r.path().is_some_and(|p| p.ends_with("c.png")))
        .unwrap();
    for member in groups[0].iter() {
        assert!(member.hash.difference(&c.hash).unwrap() > 0.01);
    }
}

#[test]
fn test_rotated_copy_needs_rotated_mode() {
    let dir = tempdir().unwrap();
    let image = noise(42, 32);
    let rotated = DynamicImage::ImageLuma8(imageops::rotate90(&image.to_luma8()));
    write_image(dir.path(), "original.png", &image);
    write_image(dir.path(), "rotated.png", &rotated);

    let aligned = finder(GroupingConfig::default())
        .find_duplicates(dir.path())
        .unwrap();
    assert!(!aligned.has_duplicates());

    let grouping = GroupingConfig::default().with_match_mode(MatchMode::Rotated);
    let report = finder(grouping).find_duplicates(dir.path()).unwrap();
    let groups = report.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(
        file_names(groups[0].paths()),
        vec!["original.png", "rotated.png"]
    );
}

#[test]
fn test_extension_filter_and_nested_directories() {
    let dir = tempdir().unwrap();
    let image = card(40, 40);
    write_image(dir.path(), "one.png", &image);
    write_image(dir.path(), "nested/deeper/two.PNG", &image);
    write_image(dir.path(), "three.bmp", &image);

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::new(false, false, Vec::new(), &["png"]));
    let report = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.summary.total_images, 2);
    let groups = report.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(file_names(groups[0].paths()), vec!["two.PNG", "one.png"]);
}

#[test]
fn test_results_do_not_depend_on_thread_count() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        let image = noise(i % 3, 32);
        write_image(dir.path(), &format!("img_{i}.png"), &image);
    }

    let scan = |threads| {
        let config = FinderConfig::default().with_threads(threads);
        let report = DuplicateFinder::new(config)
            .unwrap()
            .find_duplicates(dir.path())
            .unwrap();
        report.group_indices().to_vec()
    };

    let single = scan(1);
    assert_eq!(single, vec![vec![0, 3], vec![1, 4], vec![2, 5]]);
    assert_eq!(scan(4), single);
}

#[test]
fn test_interrupted_before_scan_keeps_partial_summary() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "a.png", &card(32, 32));

    let flag = Arc::new(AtomicBool::new(true));
    let config = FinderConfig::default().with_shutdown_flag(flag);
    let report = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.summary.interrupted);
    assert!(!report.has_duplicates());
    assert_eq!(
        ExitCode::for_scan(report.summary.interrupted, false, false),
        ExitCode::Interrupted
    );
}

#[test]
fn test_json_output_of_scan() {
    let dir = tempdir().unwrap();
    let image = card(48, 32);
    write_image(dir.path(), "x.png", &image);
    write_image(dir.path(), "y.png", &image);

    let report = DuplicateFinder::with_defaults()
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();
    let json = JsonOutput::new(&report.groups()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let group = value[0].as_array().unwrap();
    assert_eq!(group.len(), 2);
    assert_eq!(group[0]["filename"], "x");
    assert_eq!(group[0]["extension"], ".png");
    assert_eq!(group[0]["width"], 48);
    assert_eq!(group[0]["height"], 32);
    assert_eq!(group[1]["filename"], "y");
    assert!(group[0]["filepath"].as_str().unwrap().ends_with("x.png"));
}

#[test]
fn test_run_app_scan_writes_json_file() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    let image = card(32, 32);
    write_image(&images, "p.png", &image);
    write_image(&images, "q.bmp", &image);
    let output = dir.path().join("out.json");

    let cli = Cli::try_parse_from([
        "rotodupe",
        "-q",
        "scan",
        images.to_str().unwrap(),
        "--output",
        "json",
        "--output-file",
        output.to_str().unwrap(),
    ])
    .unwrap();

    let code = rotodupe::run_app(cli).unwrap();
    assert_eq!(code, ExitCode::Success);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
    assert_eq!(value[0].as_array().unwrap().len(), 2);
}

#[test]
fn test_run_app_scan_without_duplicates() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "only.png", &card(32, 32));
    let output = dir.path().join("report.txt");

    let cli = Cli::try_parse_from([
        "rotodupe",
        "-q",
        "scan",
        dir.path().to_str().unwrap(),
        "--output-file",
        output.to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(rotodupe::run_app(cli).unwrap(), ExitCode::NoDuplicates);
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("No duplicate images found."));
}
