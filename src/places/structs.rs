use serde::{Deserialize, Serialize};

/// Placeholder values used when an upstream tier produced nothing usable.
pub const UNKNOWN_PLACE: &str = "unknown place";
pub const NO_ADDRESS: &str = "no address";
pub const GENERAL_CATEGORY: &str = "general";

/// A human-meaningful place description.
///
/// The coordinate resolution path never yields an absent `PlaceInfo`; missing
/// upstream data degrades to the placeholder strings instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceInfo {
    pub name: String,
    pub address: String,
    pub category: String,
}

impl PlaceInfo {
    pub fn placeholder() -> Self {
        Self {
            name: UNKNOWN_PLACE.to_string(),
            address: NO_ADDRESS.to_string(),
            category: GENERAL_CATEGORY.to_string(),
        }
    }
}

// Wire shapes of the mapping service's JSON responses. Fields the service
// omits per response are defaulted so a sparse payload still deserializes.

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<NearbyPlace>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyPlace {
    pub place_id: Option<String>,
    pub name: Option<String>,
    /// Short vicinity string, not a full formatted address.
    pub vicinity: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<TextSearchHit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextSearchHit {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}
