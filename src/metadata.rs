//! Embedded-metadata extraction from raw image bytes.
//!
//! The pipeline only consumes the structured [`ExtractedMetadata`] result, so
//! the decoder sits behind the [`MetadataExtractor`] trait and can be swapped
//! for a test double. The default implementation reads EXIF with the `exif`
//! crate; anything undecodable simply yields `has_exif == false` rather than
//! an error, because a photo without usable metadata is still a valid upload.

use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub captured_at: Option<String>,
}

/// Structured result of decoding a photo's embedded metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub has_exif: bool,
    pub has_gps: bool,
    /// Decimal-degree (latitude, longitude), present only when both axes
    /// decoded successfully.
    pub coordinates: Option<(f64, f64)>,
    pub camera: CameraInfo,
}

pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> ExtractedMetadata;
}

/// Default extractor backed by the `exif` crate.
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, bytes: &[u8]) -> ExtractedMetadata {
        let mut cursor = Cursor::new(bytes);
        let Ok(exif) = Reader::new().read_from_container(&mut cursor) else {
            return ExtractedMetadata::default();
        };

        let coordinates = extract_gps(&exif);
        ExtractedMetadata {
            has_exif: true,
            has_gps: coordinates.is_some(),
            coordinates,
            camera: CameraInfo {
                make: string_field(&exif, Tag::Make),
                model: string_field(&exif, Tag::Model),
                captured_at: string_field(&exif, Tag::DateTimeOriginal)
                    .or_else(|| string_field(&exif, Tag::DateTime)),
            },
        }
    }
}

fn extract_gps(exif: &exif::Exif) -> Option<(f64, f64)> {
    let latitude = gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S")?;
    let longitude = gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W")?;
    Some((latitude, longitude))
}

/// Reads one GPS axis: degree/minute/second rationals plus the hemisphere
/// reference that flips the sign.
fn gps_coordinate(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_ref: &str,
) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let degrees = dms_to_decimal(&field.value)?;

    let negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|f| f.display_value().to_string())
        .is_some_and(|r| {
            r.trim_matches(|c: char| c == '"' || c.is_whitespace())
                .eq_ignore_ascii_case(negative_ref)
        });

    Some(if negative { -degrees } else { degrees })
}

fn dms_to_decimal(value: &Value) -> Option<f64> {
    let Value::Rational(parts) = value else {
        return None;
    };
    let degrees = parts.first()?.to_f64();
    let minutes = parts.get(1).map_or(0.0, |r| r.to_f64());
    let seconds = parts.get(2).map_or(0.0, |r| r.to_f64());
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

fn string_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let raw = exif.get_field(tag, In::PRIMARY)?.display_value().to_string();
    // Camera firmware pads ASCII fields with NULs; display output may also
    // carry surrounding quotes.
    let cleaned = raw.trim_matches(|c: char| c == '"' || c == '\0' || c.is_whitespace());
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
