use thiserror::Error;

/// Transport-level failure talking to the mapping service.
///
/// An upstream "no results" status is never an error; only the request itself
/// failing (connect, timeout, non-2xx, bad body) produces one.
#[derive(Error, Debug)]
pub enum MapsError {
    #[error("mapping service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outcome of a keyword search that did not produce a place.
///
/// Unlike the coordinate path, a keyword query surfaces a definitive miss
/// instead of a placeholder: the caller asked for a specific thing.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("no place found for the given keyword")]
    NotFound,

    #[error("place search failed")]
    Upstream(#[from] MapsError),
}
