use crate::PipelineError;
use crate::coordinates::resolve_coordinates;
use crate::metadata::MetadataExtractor;
use crate::places::error::SearchError;
use crate::places::resolver::PlaceResolver;
use crate::places::structs::PlaceInfo;
use crate::storage::ObjectStore;
use crate::store::{AnalysisRecord, AnalysisStatus, RecordStore, RecordUpdate, UpdateOutcome};
use crate::structs::{ExifSummary, ProcessOutcome};
use bon::bon;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The pipeline orchestrator.
///
/// Sequences metadata extraction, coordinate arbitration, place resolution,
/// byte storage and record keeping for each incoming photo. All collaborators
/// are injected at construction, so tests can swap any of them for doubles.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use photo_places::analyzer::PhotoAnalyzer;
/// use photo_places::metadata::ExifExtractor;
/// use photo_places::places::client::GoogleMapsClient;
/// use photo_places::places::resolver::PlaceResolver;
/// use photo_places::storage::LocalObjectStore;
/// use photo_places::store::InMemoryRecordStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let maps = GoogleMapsClient::builder().api_key("my-key").build()?;
/// let analyzer = PhotoAnalyzer::builder()
///     .extractor(Arc::new(ExifExtractor))
///     .resolver(PlaceResolver::builder().client(Arc::new(maps)).build())
///     .objects(Arc::new(LocalObjectStore::new("uploads")))
///     .records(Arc::new(InMemoryRecordStore::builder().build()))
///     .build();
///
/// let bytes = std::fs::read("photo.jpg")?;
/// let outcome = analyzer.process(&bytes, "image/jpeg", None, None).await?;
/// println!("{} ({})", outcome.place.name, outcome.place.address);
/// # Ok(())
/// # }
/// ```
pub struct PhotoAnalyzer {
    extractor: Arc<dyn MetadataExtractor>,
    resolver: PlaceResolver,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
}

#[bon]
impl PhotoAnalyzer {
    #[builder]
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        resolver: PlaceResolver,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            objects,
            records,
        }
    }

    /// Runs the full intake pipeline for one photo.
    ///
    /// Fails fast with a validation error when neither embedded nor device
    /// GPS is usable; in that case no record is created. Place resolution
    /// never fails the request. A storage failure marks the record FAILED.
    pub async fn process(
        &self,
        bytes: &[u8],
        content_type: &str,
        device_latitude: Option<f64>,
        device_longitude: Option<f64>,
    ) -> Result<ProcessOutcome, PipelineError> {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let metadata = self.extractor.extract(bytes);
        let coordinates = resolve_coordinates(&metadata, device_latitude, device_longitude)?;
        info!(
            request_id,
            source = coordinates.source().as_str(),
            latitude = coordinates.latitude(),
            longitude = coordinates.longitude(),
            "coordinates resolved"
        );

        self.records.create(&request_id).await;

        let place = self
            .resolver
            .resolve(coordinates.latitude(), coordinates.longitude())
            .await;

        let object_metadata = HashMap::from([
            ("latitude".to_string(), coordinates.latitude().to_string()),
            ("longitude".to_string(), coordinates.longitude().to_string()),
            (
                "gps_source".to_string(),
                coordinates.source().as_str().to_string(),
            ),
            ("has_exif".to_string(), metadata.has_exif.to_string()),
            (
                "camera_make".to_string(),
                metadata.camera.make.clone().unwrap_or_default(),
            ),
            (
                "camera_model".to_string(),
                metadata.camera.model.clone().unwrap_or_default(),
            ),
            (
                "capture_time".to_string(),
                metadata.camera.captured_at.clone().unwrap_or_default(),
            ),
            ("place_name".to_string(), place.name.clone()),
            ("address".to_string(), place.address.clone()),
        ]);

        let storage_locator = match self.objects.store(bytes, content_type, &object_metadata).await
        {
            Ok(locator) => locator,
            Err(err) => {
                error!(request_id, error = %err, "object storage failed");
                if let Err(update_err) = self
                    .records
                    .update(&request_id, RecordUpdate::failed("image could not be stored"))
                    .await
                {
                    warn!(request_id, error = %update_err, "could not mark record failed");
                }
                return Err(err.into());
            }
        };

        let outcome = ProcessOutcome {
            request_id: request_id.clone(),
            status: AnalysisStatus::Completed,
            message: "photo analysis completed".to_string(),
            coordinates,
            place,
            camera: metadata.camera,
            exif: ExifSummary {
                has_exif: metadata.has_exif,
                has_gps: metadata.has_gps,
            },
            storage_locator,
            processing_seconds: started.elapsed().as_secs_f64(),
        };

        let result = serde_json::to_value(&outcome)
            .map_err(|err| PipelineError::Internal(err.to_string()))?;
        self.records
            .update(
                &request_id,
                RecordUpdate::completed(outcome.message.clone(), Some(result)),
            )
            .await?;

        info!(
            request_id,
            elapsed = outcome.processing_seconds,
            place = %outcome.place.name,
            "photo processed"
        );
        Ok(outcome)
    }

    /// Looks up the analysis record for a request id.
    pub async fn status(&self, request_id: &str) -> Result<AnalysisRecord, PipelineError> {
        self.records
            .get(request_id)
            .await
            .ok_or_else(|| PipelineError::RecordNotFound(request_id.to_string()))
    }

    /// Ingests a result posted by a downstream worker against an existing
    /// record. A record already COMPLETED is left untouched: there is no
    /// transition out of the completed state, and the guard runs inside the
    /// store's write lock so a result racing the synchronous completion
    /// cannot overwrite it.
    pub async fn apply_external_result(
        &self,
        request_id: &str,
        payload: Value,
    ) -> Result<(), PipelineError> {
        let outcome = self
            .records
            .update_if_not_completed(
                request_id,
                RecordUpdate::completed("analysis completed", Some(payload)),
            )
            .await;
        match outcome {
            UpdateOutcome::Applied => Ok(()),
            UpdateOutcome::AlreadyCompleted => {
                debug!(request_id, "ignoring external result for completed record");
                Ok(())
            }
            UpdateOutcome::NotFound => Err(PipelineError::RecordNotFound(request_id.to_string())),
        }
    }

    /// Keyword place search; a definitive miss and an upstream failure are
    /// surfaced as distinct errors.
    pub async fn search_place(
        &self,
        keyword: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<PlaceInfo, PipelineError> {
        self.resolver
            .search_by_keyword(keyword, latitude, longitude)
            .await
            .map_err(|err| match err {
                SearchError::NotFound => PipelineError::PlaceNotFound(keyword.to_string()),
                SearchError::Upstream(source) => PipelineError::Search(source),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{CameraInfo, ExtractedMetadata};
    use crate::places::client::MapsClient;
    use crate::places::error::MapsError;
    use crate::places::structs::{GeocodeResult, NearbyPlace, PlaceDetails, TextSearchHit};
    use crate::storage::StorageError;
    use crate::store::{InMemoryRecordStore, RecordNotFound};
    use async_trait::async_trait;
    use serde_json::json;

    /// Extractor double returning a fixed metadata result.
    struct FixedExtractor(ExtractedMetadata);

    impl MetadataExtractor for FixedExtractor {
        fn extract(&self, _bytes: &[u8]) -> ExtractedMetadata {
            self.0.clone()
        }
    }

    /// Mapping service double: reverse geocoding always succeeds with a fixed
    /// address, nothing is nearby, text search is empty.
    struct QuietMaps;

    #[async_trait]
    impl MapsClient for QuietMaps {
        async fn reverse_geocode(
            &self,
            _latitude: f64,
            _longitude: f64,
        ) -> Result<Option<GeocodeResult>, MapsError> {
            Ok(Some(GeocodeResult {
                formatted_address: Some("161 Sajik-ro, Jongno-gu, Seoul".to_string()),
                address_components: vec![],
            }))
        }

        async fn nearby_search(
            &self,
            _latitude: f64,
            _longitude: f64,
            _radius_m: u32,
            _category: &str,
        ) -> Result<Vec<NearbyPlace>, MapsError> {
            Ok(Vec::new())
        }

        async fn place_details(
            &self,
            _place_id: &str,
        ) -> Result<Option<PlaceDetails>, MapsError> {
            Ok(None)
        }

        async fn text_search(
            &self,
            _query: &str,
            _latitude: f64,
            _longitude: f64,
            _radius_m: u32,
        ) -> Result<Vec<TextSearchHit>, MapsError> {
            Ok(Vec::new())
        }
    }

    /// Object store double that either records a locator or fails.
    struct MemoryObjects {
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for MemoryObjects {
        async fn store(
            &self,
            _bytes: &[u8],
            _content_type: &str,
            _metadata: &HashMap<String, String>,
        ) -> Result<String, StorageError> {
            if self.fail {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            Ok("memory://stored".to_string())
        }
    }

    /// Record store double whose `get` reports a stale PENDING snapshot for a
    /// record that has already completed, mimicking a read taken just before
    /// a concurrent completion landed.
    struct StaleReadRecords {
        inner: InMemoryRecordStore,
    }

    #[async_trait]
    impl RecordStore for StaleReadRecords {
        async fn create(&self, id: &str) {
            self.inner.create(id).await;
        }

        async fn get(&self, id: &str) -> Option<AnalysisRecord> {
            self.inner.get(id).await.map(|mut record| {
                record.status = AnalysisStatus::Pending;
                record
            })
        }

        async fn update(&self, id: &str, update: RecordUpdate) -> Result<(), RecordNotFound> {
            self.inner.update(id, update).await
        }

        async fn update_if_not_completed(&self, id: &str, update: RecordUpdate) -> UpdateOutcome {
            self.inner.update_if_not_completed(id, update).await
        }
    }

    /// Record store double where every record has already been evicted.
    struct EvictedRecords;

    #[async_trait]
    impl RecordStore for EvictedRecords {
        async fn create(&self, _id: &str) {}

        async fn get(&self, _id: &str) -> Option<AnalysisRecord> {
            None
        }

        async fn update(&self, id: &str, _update: RecordUpdate) -> Result<(), RecordNotFound> {
            Err(RecordNotFound { id: id.to_string() })
        }

        async fn update_if_not_completed(
            &self,
            _id: &str,
            _update: RecordUpdate,
        ) -> UpdateOutcome {
            UpdateOutcome::NotFound
        }
    }

    fn metadata_with_exif_gps() -> ExtractedMetadata {
        ExtractedMetadata {
            has_exif: true,
            has_gps: true,
            coordinates: Some((37.5796, 126.9770)),
            camera: CameraInfo {
                make: Some("Apple".to_string()),
                model: Some("iPhone 14 Pro".to_string()),
                captured_at: Some("2024:05:01 12:00:00".to_string()),
            },
        }
    }

    fn metadata_without_gps() -> ExtractedMetadata {
        ExtractedMetadata {
            has_exif: true,
            has_gps: false,
            coordinates: None,
            camera: CameraInfo::default(),
        }
    }

    fn analyzer(
        metadata: ExtractedMetadata,
        records: Arc<InMemoryRecordStore>,
        storage_fails: bool,
    ) -> PhotoAnalyzer {
        PhotoAnalyzer::builder()
            .extractor(Arc::new(FixedExtractor(metadata)))
            .resolver(PlaceResolver::builder().client(Arc::new(QuietMaps)).build())
            .objects(Arc::new(MemoryObjects {
                fail: storage_fails,
            }))
            .records(records)
            .build()
    }

    fn records() -> Arc<InMemoryRecordStore> {
        Arc::new(InMemoryRecordStore::builder().build())
    }

    #[tokio::test]
    async fn exif_gps_photo_completes_with_exif_provenance() {
        let records = records();
        let analyzer = analyzer(metadata_with_exif_gps(), records.clone(), false);

        let outcome = analyzer
            .process(b"bytes", "image/jpeg", Some(51.5), Some(-0.12))
            .await
            .unwrap();

        assert_eq!(outcome.status, AnalysisStatus::Completed);
        assert_eq!(outcome.coordinates.source().as_str(), "exif");
        assert_eq!(outcome.coordinates.latitude(), 37.5796);
        assert_eq!(outcome.place.address, "161 Sajik-ro, Jongno-gu, Seoul");
        assert_eq!(outcome.storage_locator, "memory://stored");
        assert!(outcome.processing_seconds >= 0.0);

        let record = records.get(&outcome.request_id).await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        let result = record.result.unwrap();
        assert_eq!(result["coordinates"]["source"], "exif");
    }

    #[tokio::test]
    async fn device_gps_photo_completes_with_device_provenance() {
        let analyzer = analyzer(metadata_without_gps(), records(), false);

        let outcome = analyzer
            .process(b"bytes", "image/jpeg", Some(37.5665), Some(126.9780))
            .await
            .unwrap();

        assert_eq!(outcome.coordinates.source().as_str(), "device");
        assert_eq!(outcome.coordinates.latitude(), 37.5665);
    }

    #[tokio::test]
    async fn no_gps_at_all_rejects_without_creating_a_record() {
        let records = records();
        let analyzer = analyzer(metadata_without_gps(), records.clone(), false);

        let err = analyzer
            .process(b"bytes", "image/jpeg", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "NO_GPS_DATA");
        assert!(records.ids().await.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_marks_record_failed() {
        let records = records();
        let analyzer = analyzer(metadata_with_exif_gps(), records.clone(), true);

        let err = analyzer
            .process(b"bytes", "image/jpeg", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Storage(_)));
        assert_eq!(err.code(), "INTERNAL_ERROR");

        let ids = records.ids().await;
        assert_eq!(ids.len(), 1);
        let record = records.get(&ids[0]).await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed);
        assert_eq!(record.message, "image could not be stored");
    }

    #[tokio::test]
    async fn status_lookup_is_idempotent() {
        let records = records();
        let analyzer = analyzer(metadata_with_exif_gps(), records, false);

        let outcome = analyzer
            .process(b"bytes", "image/jpeg", None, None)
            .await
            .unwrap();

        let first = analyzer.status(&outcome.request_id).await.unwrap();
        let second = analyzer.status(&outcome.request_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn status_for_unknown_id_is_not_found() {
        let analyzer = analyzer(metadata_with_exif_gps(), records(), false);

        let err = analyzer.status("missing").await.unwrap_err();

        assert_eq!(err.code(), "REQUEST_NOT_FOUND");
    }

    #[tokio::test]
    async fn external_result_completes_a_pending_record() {
        let records = records();
        records.create("req-async").await;
        let analyzer = analyzer(metadata_with_exif_gps(), records.clone(), false);

        analyzer
            .apply_external_result("req-async", json!({"buildings": ["palace"]}))
            .await
            .unwrap();

        let record = records.get("req-async").await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.result.unwrap()["buildings"][0], "palace");
    }

    #[tokio::test]
    async fn external_result_for_unknown_id_is_rejected() {
        let analyzer = analyzer(metadata_with_exif_gps(), records(), false);

        let err = analyzer
            .apply_external_result("missing", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "REQUEST_NOT_FOUND");
    }

    #[tokio::test]
    async fn external_result_never_overwrites_a_completed_record() {
        let records = records();
        let analyzer = analyzer(metadata_with_exif_gps(), records.clone(), false);
        let outcome = analyzer
            .process(b"bytes", "image/jpeg", None, None)
            .await
            .unwrap();

        analyzer
            .apply_external_result(&outcome.request_id, json!({"late": true}))
            .await
            .unwrap();

        let record = records.get(&outcome.request_id).await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert!(record.result.unwrap().get("late").is_none());
    }

    #[tokio::test]
    async fn late_external_result_cannot_replace_a_concurrent_completion() {
        let records = Arc::new(StaleReadRecords {
            inner: InMemoryRecordStore::builder().build(),
        });
        records.create("req-race").await;
        records
            .update(
                "req-race",
                RecordUpdate::completed("done", Some(json!({"sync": true}))),
            )
            .await
            .unwrap();
        let analyzer = PhotoAnalyzer::builder()
            .extractor(Arc::new(FixedExtractor(metadata_with_exif_gps())))
            .resolver(PlaceResolver::builder().client(Arc::new(QuietMaps)).build())
            .objects(Arc::new(MemoryObjects { fail: false }))
            .records(records.clone())
            .build();

        analyzer
            .apply_external_result("req-race", json!({"late": true}))
            .await
            .unwrap();

        let record = records.inner.get("req-race").await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.result.unwrap(), json!({"sync": true}));
    }

    #[tokio::test]
    async fn storage_failure_with_evicted_record_still_surfaces_the_storage_error() {
        let analyzer = PhotoAnalyzer::builder()
            .extractor(Arc::new(FixedExtractor(metadata_with_exif_gps())))
            .resolver(PlaceResolver::builder().client(Arc::new(QuietMaps)).build())
            .objects(Arc::new(MemoryObjects { fail: true }))
            .records(Arc::new(EvictedRecords))
            .build();

        let err = analyzer
            .process(b"bytes", "image/jpeg", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[tokio::test]
    async fn keyword_search_miss_surfaces_place_not_found() {
        let analyzer = analyzer(metadata_with_exif_gps(), records(), false);

        let err = analyzer
            .search_place("경복궁", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PLACE_NOT_FOUND");
    }
}
