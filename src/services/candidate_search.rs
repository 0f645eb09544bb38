use std::sync::Arc;

use crate::{
    models::{Candidate, Coordinate, RawPlace},
    services::{
        distance::distance_meters,
        providers::{PlaceQuery, PlaceSearchProvider, PlaceSearchResponse},
        sdk_loader::{SdkLoadError, SdkLoader},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchFailure {
    #[error("no places matched the search")]
    ZeroResults,
    #[error("place search failed: {0}")]
    ServiceError(String),
}

/// Proximity/keyword search returning normalized candidates
///
/// Every raw record is validated and converted here; records that cannot be
/// turned into a [`Candidate`] are dropped and logged. Each returned candidate
/// carries its distance from the search center.
pub struct CandidateSearchService {
    provider: Arc<dyn PlaceSearchProvider>,
    loader: Arc<SdkLoader>,
}

impl CandidateSearchService {
    pub fn new(provider: Arc<dyn PlaceSearchProvider>, loader: Arc<SdkLoader>) -> Self {
        Self { provider, loader }
    }

    /// True once the provider's one-time warm-up has succeeded
    pub fn is_ready(&self) -> bool {
        self.loader.is_loaded()
    }

    pub fn readiness(&self) -> &'static str {
        self.loader.state_name()
    }

    /// Why the last warm-up failed, while it has not been retried successfully
    pub fn last_failure(&self) -> Option<String> {
        self.loader.failure()
    }

    /// Runs (or joins) the provider warm-up
    pub async fn initialize(&self) -> Result<(), SdkLoadError> {
        let provider = self.provider.clone();
        self.loader
            .ensure_loaded(|| async move { provider.warm_up().await })
            .await
    }

    pub async fn search(
        &self,
        center: Coordinate,
        radius_meters: u32,
        keyword: &str,
        category_group: Option<&str>,
    ) -> Result<Vec<Candidate>, SearchFailure> {
        let query = PlaceQuery {
            keyword: keyword.to_string(),
            center,
            radius_meters,
            category_group: category_group.map(str::to_string),
            sort_by_distance: true,
        };

        match self.provider.keyword_search(&query).await {
            PlaceSearchResponse::Ok(records) => {
                let received = records.len();
                let candidates = normalize_places(records, center);

                if candidates.len() < received {
                    tracing::warn!(
                        received,
                        kept = candidates.len(),
                        provider = self.provider.name(),
                        "Dropped malformed place records"
                    );
                }

                if candidates.is_empty() {
                    Err(SearchFailure::ZeroResults)
                } else {
                    Ok(candidates)
                }
            }
            PlaceSearchResponse::ZeroResults => Err(SearchFailure::ZeroResults),
            PlaceSearchResponse::Error(reason) => {
                tracing::error!(reason = %reason, provider = self.provider.name(), "Place search failed");
                Err(SearchFailure::ServiceError(reason))
            }
        }
    }
}

/// Converts raw search records into candidates with their distance from `origin`
pub fn normalize_places(records: Vec<serde_json::Value>, origin: Coordinate) -> Vec<Candidate> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<RawPlace>(record) {
            Ok(raw) => raw.into_candidate(),
            Err(e) => {
                tracing::debug!(error = %e, "Unrecognized place record");
                None
            }
        })
        .map(|mut candidate| {
            candidate.distance_meters = Some(distance_meters(origin, candidate.coordinate));
            candidate
        })
        .collect()
}
