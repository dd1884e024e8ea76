#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use rotodupe::hash::{BitFingerprint, CompositeHash};
use rotodupe::record::{ImageRecord, Provenance};

/// Deterministic grayscale noise; 32x32 images hash without resampling.
pub fn noise(seed: u32, size: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(size, size, |x, y| {
        let mut v = x
            .wrapping_mul(374_761_393)
            .wrapping_add(y.wrapping_mul(668_265_263))
            .wrapping_add(seed.wrapping_mul(2_246_822_519));
        v = (v ^ (v >> 13)).wrapping_mul(1_274_126_177);
        Luma([(v >> 24) as u8])
    }))
}

/// Colourful smooth test card.
pub fn card(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = if (x / 8 + y / 8) % 2 == 0 { 220 } else { 30 };
        Rgb([r, g, b])
    }))
}

/// Save `image` under `dir`, the format following the extension.
pub fn write_image(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image.save(&path).unwrap();
    path
}

/// Record with no pixels behind it, for grouping tests.
pub fn record_from_hash(hash: CompositeHash) -> ImageRecord {
    ImageRecord {
        width: 1,
        height: 1,
        channels: 1,
        hash,
        provenance: Provenance::Matrix,
    }
}

/// Composite hash built from 4 * hash_size² bits, one rotation after another.
pub fn hash_from_bits(hash_size: usize, bits: &[bool]) -> CompositeHash {
    let per = hash_size * hash_size;
    let mut builder = CompositeHash::builder();
    for chunk in bits.chunks(per).take(4) {
        builder
            .append(BitFingerprint::from_bit_iter(hash_size, chunk.iter().copied()).unwrap())
            .unwrap();
    }
    builder.build().unwrap()
}
