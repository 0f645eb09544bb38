/// External data providers
///
/// Each collaborator the subsystem talks to sits behind a trait so the
/// recommendation logic never depends on a concrete vendor:
/// - place search (Kakao Local keyword search)
/// - routing (OSRM-compatible route service)
/// - the saved venue list (backend REST API)
use serde_json::Value;

use crate::{
    error::AppResult,
    models::{Candidate, Coordinate, RouteResult, TravelMode},
};

pub mod backend;
pub mod kakao;
pub mod osrm;

pub use backend::BackendVenueSource;
pub use kakao::KakaoPlaceSearch;
pub use osrm::OsrmRoutingProvider;

/// Parameters of a keyword/proximity place search
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub keyword: String,
    pub center: Coordinate,
    pub radius_meters: u32,
    /// Category group code, e.g. `FD6` for restaurants
    pub category_group: Option<String>,
    pub sort_by_distance: bool,
}

/// Outcome of a place search, mirroring the map SDK status enum
///
/// Records are passed on untouched; validating them is the caller's job.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceSearchResponse {
    Ok(Vec<Value>),
    ZeroResults,
    Error(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    /// Keyword search around `query.center`
    async fn keyword_search(&self, query: &PlaceQuery) -> PlaceSearchResponse;

    /// One-time initialization; must succeed before searches are served
    async fn warm_up(&self) -> Result<(), String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("routing request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("routing service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed routing response: {0}")]
    Malformed(String),

    #[error("no route found: {0}")]
    NoRoute(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Fetches a routed path; the path runs from `origin` to `destination`
    async fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteResult, RouteError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SavedVenueSource: Send + Sync {
    /// The user's saved venues, in backend order
    async fn list_saved(&self) -> AppResult<Vec<Candidate>>;
}
