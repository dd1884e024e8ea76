//! Best-effort EXIF tag extraction.
//!
//! Tags are keyed as `"<IFD> <TagName>"` (for example `"Image Make"` or
//! `"EXIF DateTimeOriginal"`) and rendered as human-readable text. Images
//! without EXIF data, or with EXIF data that cannot be parsed, yield an empty
//! map; extraction never fails the surrounding operation.

use std::collections::BTreeMap;
use std::io::Cursor;

use exif::{Context, Exif, Field, In};

/// Ordered map from `"<IFD> <TagName>"` to the rendered tag value.
pub type ExifTags = BTreeMap<String, String>;

/// Extract all EXIF tags from encoded image bytes.
#[must_use]
pub fn read_tags(bytes: &[u8]) -> ExifTags {
    let mut cursor = Cursor::new(bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => collect_tags(&exif),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF data found");
            ExifTags::new()
        }
        Err(e) => {
            log::warn!("Ignoring unreadable EXIF data: {}", e);
            ExifTags::new()
        }
    }
}

fn collect_tags(exif: &Exif) -> ExifTags {
    exif.fields()
        .map(|field| {
            let key = format!("{} {}", ifd_label(field), field.tag);
            let value = field.display_value().with_unit(exif).to_string();
            (key, value)
        })
        .collect()
}

fn ifd_label(field: &Field) -> &'static str {
    if field.ifd_num == In::THUMBNAIL {
        return "Thumbnail";
    }
    match field.tag.context() {
        Context::Tiff => "Image",
        Context::Exif => "EXIF",
        Context::Gps => "GPS",
        Context::Interop => "Interoperability",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    #[test]
    fn test_no_exif_in_png() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        assert!(read_tags(&bytes).is_empty());
    }

    #[test]
    fn test_ifd_labels() {
        let field = |tag, ifd_num| Field {
            tag,
            ifd_num,
            value: exif::Value::Ascii(vec![]),
        };
        assert_eq!(ifd_label(&field(exif::Tag::Make, In::PRIMARY)), "Image");
        assert_eq!(ifd_label(&field(exif::Tag::ExposureTime, In::PRIMARY)), "EXIF");
        assert_eq!(ifd_label(&field(exif::Tag::GPSLatitude, In::PRIMARY)), "GPS");
        assert_eq!(ifd_label(&field(exif::Tag::Make, In::THUMBNAIL)), "Thumbnail");
    }

    #[test]
    fn test_garbage_yields_empty_map() {
        assert!(read_tags(b"not an image at all").is_empty());
        assert!(read_tags(&[]).is_empty());
    }

    #[test]
    fn test_tiff_header_with_make_tag() {
        // Little-endian TIFF with a single IFD holding Make = "ACM"
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x010fu16.to_le_bytes()); // Make
        tiff.extend_from_slice(&2u16.to_le_bytes()); // ASCII
        tiff.extend_from_slice(&4u32.to_le_bytes());
        tiff.extend_from_slice(b"ACM\0");
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let tags = read_tags(&tiff);
        let make = tags.get("Image Make").expect("Make tag present");
        assert!(make.contains("ACM"), "unexpected value {make}");
    }
}
