//! Tiered place resolution.
//!
//! The coordinate path is a total function: reverse geocode, then a
//! category-ranked nearby search, then detail enrichment, and finally a
//! placeholder. Upstream failures downgrade to the next tier and are logged,
//! never raised. The keyword path is the one lookup that surfaces a miss.

use crate::places::client::MapsClient;
use crate::places::error::SearchError;
use crate::places::structs::{
    GENERAL_CATEGORY, GeocodeResult, NO_ADDRESS, PlaceInfo, UNKNOWN_PLACE,
};
use bon::bon;
use std::sync::Arc;
use tracing::{debug, warn};

/// Search radius around a photo's coordinates for nearby points of interest.
pub const NEARBY_RADIUS_M: u32 = 500;
/// Wide radius for keyword searches, which may name something far away.
pub const KEYWORD_RADIUS_M: u32 = 20_000;
/// Anchor used when a keyword search supplies no coordinates (Seoul City Hall).
pub const DEFAULT_ANCHOR: (f64, f64) = (37.5665, 126.9780);

/// Category filters tried in priority order; the first category with any
/// result wins, regardless of what later categories might return.
const CATEGORY_PRIORITY: [&str; 3] = ["tourist_attraction", "museum", "park"];

/// Named anchor points a caller can use instead of explicit coordinates.
pub fn region_anchor(region: &str) -> Option<(f64, f64)> {
    let anchor = match region.to_ascii_lowercase().as_str() {
        "seoul" => (37.5665, 126.9780),
        "busan" => (35.1796, 129.0756),
        "daegu" => (35.8714, 128.6014),
        "incheon" => (37.4563, 126.7052),
        "gwangju" => (35.1595, 126.8526),
        "daejeon" => (36.3504, 127.3845),
        "ulsan" => (35.5384, 129.3114),
        "sejong" => (36.4800, 127.2890),
        _ => return None,
    };
    Some(anchor)
}

pub struct PlaceResolver {
    client: Arc<dyn MapsClient>,
    nearby_radius_m: u32,
    keyword_radius_m: u32,
    anchor: (f64, f64),
}

#[bon]
impl PlaceResolver {
    /// # Builder Arguments
    ///
    /// * `client: Arc<dyn MapsClient>` - The mapping-service client.
    /// * `nearby_radius_m: u32` - (Default: 500) Radius for the nearby POI tier.
    /// * `keyword_radius_m: u32` - (Default: 20000) Radius for keyword text search.
    /// * `anchor: (f64, f64)` - (Default: Seoul City Hall) Fallback location for keyword searches without coordinates.
    #[builder]
    pub fn new(
        client: Arc<dyn MapsClient>,
        #[builder(default = NEARBY_RADIUS_M)] nearby_radius_m: u32,
        #[builder(default = KEYWORD_RADIUS_M)] keyword_radius_m: u32,
        #[builder(default = DEFAULT_ANCHOR)] anchor: (f64, f64),
    ) -> Self {
        Self {
            client,
            nearby_radius_m,
            keyword_radius_m,
            anchor,
        }
    }

    /// Resolves coordinates to a place description. Total: every failure path
    /// ends in a degraded `PlaceInfo`, never an error.
    pub async fn resolve(&self, latitude: f64, longitude: f64) -> PlaceInfo {
        // Tier 1: without an address there is nothing to enrich, so a
        // reverse-geocode miss goes straight to the placeholder.
        let geocoded = match self.client.reverse_geocode(latitude, longitude).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                debug!(latitude, longitude, "no address for coordinates");
                return PlaceInfo::placeholder();
            }
            Err(err) => {
                warn!(latitude, longitude, error = %err, "reverse geocode failed");
                return PlaceInfo::placeholder();
            }
        };
        let address = geocoded
            .formatted_address
            .clone()
            .unwrap_or_else(|| NO_ADDRESS.to_string());

        // Tiers 2+3: nearest POI by category priority, detail-enriched. The
        // reverse-geocoded address always wins over the POI vicinity string.
        if let Some(mut place) = self.nearby_poi(latitude, longitude).await {
            place.address = address;
            return place;
        }

        // Tier 4: no POI nearby; name the locality if the address components
        // offer one.
        PlaceInfo {
            name: locality_name(&geocoded),
            address,
            category: GENERAL_CATEGORY.to_string(),
        }
    }

    /// First POI found walking the category priority list, enriched with
    /// place details when those are available.
    async fn nearby_poi(&self, latitude: f64, longitude: f64) -> Option<PlaceInfo> {
        for category in CATEGORY_PRIORITY {
            let results = match self
                .client
                .nearby_search(latitude, longitude, self.nearby_radius_m, category)
                .await
            {
                Ok(results) => results,
                Err(err) => {
                    warn!(category, error = %err, "nearby search failed");
                    return None;
                }
            };
            let Some(candidate) = results.into_iter().next() else {
                continue;
            };

            if let Some(place_id) = candidate.place_id.as_deref() {
                match self.client.place_details(place_id).await {
                    Ok(Some(details)) => {
                        return Some(PlaceInfo {
                            name: details.name.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
                            address: details
                                .formatted_address
                                .unwrap_or_else(|| NO_ADDRESS.to_string()),
                            category: title_case_category(&details.types),
                        });
                    }
                    Ok(None) => {}
                    Err(err) => warn!(place_id, error = %err, "place details failed"),
                }
            }

            return Some(PlaceInfo {
                name: candidate
                    .name
                    .unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
                address: candidate
                    .vicinity
                    .unwrap_or_else(|| NO_ADDRESS.to_string()),
                category: title_case_category(&candidate.types),
            });
        }
        None
    }

    /// Text search for a keyword, anchored to the given coordinates or to the
    /// default anchor when none are supplied. Zero results is a definitive
    /// [`SearchError::NotFound`]; a transport failure is surfaced separately.
    pub async fn search_by_keyword(
        &self,
        keyword: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<PlaceInfo, SearchError> {
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                debug!(
                    keyword,
                    "no location supplied for keyword search, using default anchor"
                );
                self.anchor
            }
        };

        let results = self
            .client
            .text_search(keyword, latitude, longitude, self.keyword_radius_m)
            .await?;
        let Some(hit) = results.into_iter().next() else {
            return Err(SearchError::NotFound);
        };

        if let Some(place_id) = hit.place_id.as_deref() {
            match self.client.place_details(place_id).await {
                Ok(Some(details)) => {
                    return Ok(PlaceInfo {
                        name: details.name.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
                        address: details
                            .formatted_address
                            .unwrap_or_else(|| NO_ADDRESS.to_string()),
                        category: title_case_category(&details.types),
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(place_id, error = %err, "place details failed"),
            }
        }

        Ok(PlaceInfo {
            name: hit.name.unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
            address: hit
                .formatted_address
                .unwrap_or_else(|| NO_ADDRESS.to_string()),
            category: title_case_category(&hit.types),
        })
    }
}

/// Locality-level name from reverse-geocode address components, placeholder
/// when none is present.
fn locality_name(geocoded: &GeocodeResult) -> String {
    geocoded
        .address_components
        .iter()
        .find(|component| {
            component
                .types
                .iter()
                .any(|t| t == "sublocality" || t == "locality")
        })
        .map(|component| component.long_name.clone())
        .unwrap_or_else(|| UNKNOWN_PLACE.to_string())
}

/// "tourist_attraction" -> "Tourist Attraction"; empty types degrade to the
/// placeholder category.
fn title_case_category(types: &[String]) -> String {
    let Some(first) = types.first().filter(|t| !t.is_empty()) else {
        return GENERAL_CATEGORY.to_string();
    };
    first
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
