//! Ingestion-time image normalization
//!
//! Runs exactly once, when an image record is first persisted: captures EXIF
//! metadata, rotates the stored raster upright, converts legacy bitmaps to
//! JPEG in place, and records the resulting pixel dimensions. Re-running on
//! update would corrupt the created-once width/height invariant.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use depot_core::error::{DepotError, DepotResult};
use image::{DynamicImage, ImageFormat, ImageReader};
use rexif::{ExifTag, TagValue};
use tracing::debug;

use crate::model::FileRecord;

pub(crate) fn image_err(e: image::ImageError) -> DepotError {
    DepotError::Image(e.to_string())
}

/// Normalize a freshly stored image record
pub(crate) fn normalize(record: &mut FileRecord, storage_root: &Path) -> DepotResult<()> {
    let abs = storage_root.join(&record.path);
    let data = std::fs::read(&abs)?;

    let (exif, orientation) = extract_exif(&data);

    let reader = ImageReader::new(Cursor::new(data.as_slice())).with_guessed_format()?;
    let format = reader.format();
    let mut img = reader.decode().map_err(image_err)?;

    // Rotate to upright and overwrite the stored bytes
    if let Some(rotated) = orientation.and_then(|o| apply_orientation(&img, o)) {
        rotated
            .save_with_format(&abs, format.unwrap_or(ImageFormat::Jpeg))
            .map_err(image_err)?;
        debug!(path = %record.path, orientation = ?orientation, "image rotated upright");
        img = rotated;
    }

    // Convert legacy bitmaps to JPEG, retargeting path and MIME
    if format == Some(ImageFormat::Bmp) {
        let old_abs = abs.clone();

        let mut new_path = record.path.replace(".bmp", ".jpg");
        if !new_path.ends_with(".jpg") {
            new_path.push_str(".jpg");
        }
        record.retarget(new_path, "image/jpeg");

        let new_abs = storage_root.join(&record.path);
        // JPEG carries no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.save_with_format(&new_abs, ImageFormat::Jpeg)
            .map_err(image_err)?;
        std::fs::remove_file(&old_abs)?;
        debug!(path = %record.path, "bitmap converted to JPEG");
        img = rgb;
    }

    let attrs = record
        .image_mut()
        .ok_or_else(|| DepotError::Image("normalize called on a non-image record".to_string()))?;
    attrs.width = img.width();
    attrs.height = img.height();
    attrs.exif = exif;

    Ok(())
}

/// Extract a flat tag -> display-value mapping and the numeric orientation.
/// Embedded-thumbnail tags are skipped.
fn extract_exif(data: &[u8]) -> (BTreeMap<String, String>, Option<u16>) {
    let mut tags = BTreeMap::new();
    let mut orientation = None;

    if let Ok(exif) = rexif::parse_buffer_quiet(data).0 {
        for entry in &exif.entries {
            let name = entry.tag.to_string();
            if name.to_ascii_lowercase().starts_with("thumbnail") {
                continue;
            }
            if entry.tag == ExifTag::Orientation {
                orientation = tag_value_to_u16(&entry.value);
            }
            tags.insert(name, entry.value_more_readable.to_string());
        }
    }

    (tags, orientation)
}

fn tag_value_to_u16(value: &TagValue) -> Option<u16> {
    match value {
        TagValue::U16(values) => values.first().copied(),
        _ => None,
    }
}

/// Physical rotation for an EXIF orientation value. Values 3/6/8 encode
/// 180/90 CW/270 CW; everything else (including mirrored forms) is left as is.
fn apply_orientation(img: &DynamicImage, orientation: u16) -> Option<DynamicImage> {
    match orientation {
        3 => Some(img.rotate180()),
        6 => Some(img.rotate90()),
        8 => Some(img.rotate270()),
        _ => None,
    }
}
