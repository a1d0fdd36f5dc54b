//! HTTP client for the external mapping service.
//!
//! The four operations mirror the service's reverse-geocode, nearby-search,
//! place-details and text-search endpoints. The [`MapsClient`] trait is the
//! seam the resolver depends on; tests implement it directly with scripted
//! responses instead of going over the network.

use crate::places::error::MapsError;
use crate::places::structs::{
    DetailsResponse, GeocodeResponse, GeocodeResult, NearbyPlace, NearbyResponse, PlaceDetails,
    TextSearchHit, TextSearchResponse,
};
use async_trait::async_trait;
use bon::bon;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait MapsClient: Send + Sync {
    /// Maps coordinates to the best-matching address, `None` when the
    /// service has no address for the location.
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<GeocodeResult>, MapsError>;

    /// Points of interest of one category within `radius_m`, nearest first.
    async fn nearby_search(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<NearbyPlace>, MapsError>;

    async fn place_details(&self, place_id: &str) -> Result<Option<PlaceDetails>, MapsError>;

    async fn text_search(
        &self,
        query: &str,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<Vec<TextSearchHit>, MapsError>;
}

pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[bon]
impl GoogleMapsClient {
    /// Builds a client with a bounded per-request timeout.
    ///
    /// # Builder Arguments
    ///
    /// * `api_key: String` - The mapping service API key.
    /// * `base_url: String` - (Default: the public service URL) Override for tests or proxies.
    /// * `timeout: Duration` - (Default: 10s) Applied to every request; a timeout surfaces as a transport error.
    #[builder]
    pub fn new(
        #[builder(into)] api_key: String,
        #[builder(into, default = DEFAULT_BASE_URL.to_string())] base_url: String,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
    ) -> Result<Self, MapsError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MapsError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MapsClient for GoogleMapsClient {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<GeocodeResult>, MapsError> {
        let body: GeocodeResponse = self
            .get_json(
                "geocode/json",
                &[("latlng", format!("{latitude},{longitude}"))],
            )
            .await?;
        if body.status != "OK" {
            debug!(status = %body.status, "reverse geocode returned no address");
            return Ok(None);
        }
        Ok(body.results.into_iter().next())
    }

    async fn nearby_search(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
        category: &str,
    ) -> Result<Vec<NearbyPlace>, MapsError> {
        let body: NearbyResponse = self
            .get_json(
                "place/nearbysearch/json",
                &[
                    ("location", format!("{latitude},{longitude}")),
                    ("radius", radius_m.to_string()),
                    ("type", category.to_string()),
                ],
            )
            .await?;
        if body.status != "OK" {
            return Ok(Vec::new());
        }
        Ok(body.results)
    }

    async fn place_details(&self, place_id: &str) -> Result<Option<PlaceDetails>, MapsError> {
        let body: DetailsResponse = self
            .get_json(
                "place/details/json",
                &[
                    ("place_id", place_id.to_string()),
                    ("fields", "name,formatted_address,types".to_string()),
                ],
            )
            .await?;
        if body.status != "OK" {
            return Ok(None);
        }
        Ok(body.result)
    }

    async fn text_search(
        &self,
        query: &str,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<Vec<TextSearchHit>, MapsError> {
        let body: TextSearchResponse = self
            .get_json(
                "place/textsearch/json",
                &[
                    ("query", query.to_string()),
                    ("location", format!("{latitude},{longitude}")),
                    ("radius", radius_m.to_string()),
                ],
            )
            .await?;
        if body.status != "OK" {
            return Ok(Vec::new());
        }
        Ok(body.results)
    }
}

/// Offline stand-in for the mapping service, selectable at construction time
/// when no API key is available (development, demos). Reverse geocoding
/// always answers with the configured address; the other operations return
/// nothing.
#[derive(Default)]
pub struct OfflineMapsClient {
    pub formatted_address: Option<String>,
}

#[async_trait]
impl MapsClient for OfflineMapsClient {
    async fn reverse_geocode(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Option<GeocodeResult>, MapsError> {
        Ok(self.formatted_address.clone().map(|address| GeocodeResult {
            formatted_address: Some(address),
            address_components: Vec::new(),
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

    async fn place_details(&self, _place_id: &str) -> Result<Option<PlaceDetails>, MapsError> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults_and_trims_base_url() {
        let client = GoogleMapsClient::builder()
            .api_key("test-key")
            .base_url("https://example.test/maps/")
            .build()
            .unwrap();

        assert_eq!(client.base_url, "https://example.test/maps");
        assert_eq!(client.api_key, "test-key");
    }

    #[test]
    fn builder_uses_public_service_url_by_default() {
        let client = GoogleMapsClient::builder().api_key("k").build().unwrap();
        assert_eq!(client.base_url, "https://maps.googleapis.com/maps/api");
    }

    #[tokio::test]
    async fn offline_client_answers_with_configured_address() {
        let client = OfflineMapsClient {
            formatted_address: Some("161 Sajik-ro, Jongno-gu, Seoul".to_string()),
        };

        let geocoded = client.reverse_geocode(37.5796, 126.977).await.unwrap();
        assert_eq!(
            geocoded.unwrap().formatted_address.as_deref(),
            Some("161 Sajik-ro, Jongno-gu, Seoul")
        );
        assert!(client.nearby_search(0.0, 0.0, 500, "park").await.unwrap().is_empty());
        assert!(client.text_search("palace", 0.0, 0.0, 500).await.unwrap().is_empty());
    }
}
