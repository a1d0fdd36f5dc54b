//! # Photo Places
//!
//! Photo intake and place resolution pipeline: take a photographed image
//! (optionally with device-supplied GPS), decide which coordinates to trust,
//! resolve them to a human-meaningful place through a tiered mapping-service
//! lookup, and track the analysis as an addressable record.
//!
//! ## Key pieces
//!
//! - **Coordinate arbitration**: embedded EXIF GPS is ground truth; device
//!   GPS is only a fallback. No coordinates at all rejects the request.
//! - **Tiered place resolution**: reverse geocode, category-ranked nearby
//!   search, detail enrichment, placeholder. The coordinate path never fails;
//!   every upstream problem degrades to the next tier.
//! - **Keyword search**: an independent text-search entry point that, unlike
//!   the coordinate path, surfaces a definitive miss.
//! - **Analysis records**: each processed photo gets a PENDING record that is
//!   finalized synchronously or completed later by a downstream worker.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use photo_places::analyzer::PhotoAnalyzer;
//! use photo_places::metadata::ExifExtractor;
//! use photo_places::places::client::GoogleMapsClient;
//! use photo_places::places::resolver::PlaceResolver;
//! use photo_places::storage::LocalObjectStore;
//! use photo_places::store::InMemoryRecordStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let maps = GoogleMapsClient::builder().api_key("my-key").build()?;
//!     let analyzer = PhotoAnalyzer::builder()
//!         .extractor(Arc::new(ExifExtractor))
//!         .resolver(PlaceResolver::builder().client(Arc::new(maps)).build())
//!         .objects(Arc::new(LocalObjectStore::new("uploads")))
//!         .records(Arc::new(InMemoryRecordStore::builder().build()))
//!         .build();
//!
//!     let bytes = std::fs::read("photo.jpg")?;
//!     let outcome = analyzer
//!         .process(&bytes, "image/jpeg", Some(37.5665), Some(126.9780))
//!         .await?;
//!
//!     println!("Place: {} ({})", outcome.place.name, outcome.place.address);
//!     println!("Track with id {}", outcome.request_id);
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod coordinates;
pub mod metadata;
pub mod places;
pub mod storage;
pub mod store;
pub mod structs;

pub use analyzer::PhotoAnalyzer;
pub use coordinates::{CoordinateError, Coordinates, GpsSource};
pub use metadata::{CameraInfo, ExifExtractor, ExtractedMetadata, MetadataExtractor};
pub use places::structs::PlaceInfo;
pub use store::{AnalysisRecord, AnalysisStatus};
pub use structs::ProcessOutcome;

use crate::places::error::MapsError;
use crate::storage::StorageError;
use crate::store::RecordNotFound;
use thiserror::Error;

/// The primary error type for the photo-places pipeline.
///
/// Mapping-service failures on the coordinate path never appear here; they
/// are absorbed by the resolver's tier fallback.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    #[error("analysis record not found: {0}")]
    RecordNotFound(String),

    #[error("no place found for keyword: {0}")]
    PlaceNotFound(String),

    #[error("place search failed")]
    Search(#[source] MapsError),

    #[error("object storage failed")]
    Storage(#[from] StorageError),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<RecordNotFound> for PipelineError {
    fn from(err: RecordNotFound) -> Self {
        Self::RecordNotFound(err.id)
    }
}

impl PipelineError {
    /// Stable machine-readable code for the outward error payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Coordinate(CoordinateError::NoGpsData) => "NO_GPS_DATA",
            Self::Coordinate(_) => "INVALID_GPS_COORDINATES",
            Self::RecordNotFound(_) => "REQUEST_NOT_FOUND",
            Self::PlaceNotFound(_) => "PLACE_NOT_FOUND",
            Self::Search(_) => "SEARCH_FAILED",
            Self::Storage(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error rejects the request (client fault) rather than
    /// reporting a pipeline fault. The HTTP collaborator maps rejections to
    /// 4xx and the rest to 5xx.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Coordinate(_) | Self::RecordNotFound(_) | Self::PlaceNotFound(_)
        )
    }
}
