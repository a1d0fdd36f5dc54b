use crate::coordinates::Coordinates;
use crate::metadata::CameraInfo;
use crate::places::structs::PlaceInfo;
use crate::store::AnalysisStatus;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifSummary {
    pub has_exif: bool,
    pub has_gps: bool,
}

/// The outward-facing result of processing one photo. Also stored as the
/// structured `result` payload of the analysis record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub request_id: String,
    pub status: AnalysisStatus,
    pub message: String,
    pub coordinates: Coordinates,
    pub place: PlaceInfo,
    pub camera: CameraInfo,
    pub exif: ExifSummary,
    /// Locator returned by the object store for the raw bytes.
    pub storage_locator: String,
    /// Informational wall-clock duration of the whole pipeline.
    pub processing_seconds: f64,
}
