use crate::metadata::ExtractedMetadata;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoordinateError {
    #[error(
        "no GPS data: the image carries no embedded coordinates and no device coordinates were supplied"
    )]
    NoGpsData,

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Which source produced a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpsSource {
    Exif,
    Device,
}

impl GpsSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::Device => "device",
        }
    }
}

/// A validated coordinate pair tagged with its provenance.
///
/// Immutable once constructed; `new` rejects out-of-range values, so any
/// `Coordinates` value in the pipeline is known to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
    source: GpsSource,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64, source: GpsSource) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            source,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn source(&self) -> GpsSource {
        self.source
    }
}

/// Decides the authoritative coordinate pair for a photo.
///
/// Embedded GPS is ground truth: it records where the photograph was taken,
/// while device GPS at upload time may be somewhere else entirely. Device
/// coordinates are therefore only a fallback, never a cross-check.
pub fn resolve_coordinates(
    metadata: &ExtractedMetadata,
    device_latitude: Option<f64>,
    device_longitude: Option<f64>,
) -> Result<Coordinates, CoordinateError> {
    if metadata.has_gps
        && let Some((latitude, longitude)) = metadata.coordinates
    {
        return Coordinates::new(latitude, longitude, GpsSource::Exif);
    }
    if let (Some(latitude), Some(longitude)) = (device_latitude, device_longitude) {
        return Coordinates::new(latitude, longitude, GpsSource::Device);
    }
    Err(CoordinateError::NoGpsData)
}
