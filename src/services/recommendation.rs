use rand::seq::SliceRandom;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{Candidate, Coordinate, TravelTime},
    services::{
        candidate_search::{CandidateSearchService, SearchFailure},
        distance::{distance_meters, estimate_travel_time},
    },
};

/// Default search radius for "from current location"
pub const DEFAULT_RADIUS_METERS: u32 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecommendError {
    #[error("the saved list is empty")]
    EmptyList,
    #[error("no origin coordinate is available")]
    NoOrigin,
    #[error("place search is not ready")]
    ServiceUnavailable,
    #[error("no places matched the search")]
    ZeroResults,
    #[error("place search failed: {0}")]
    ServiceError(String),
}

impl From<SearchFailure> for RecommendError {
    fn from(failure: SearchFailure) -> Self {
        match failure {
            SearchFailure::ZeroResults => RecommendError::ZeroResults,
            SearchFailure::ServiceError(reason) => RecommendError::ServiceError(reason),
        }
    }
}

impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::EmptyList => AppError::EmptyCandidatePool,
            RecommendError::NoOrigin => AppError::LocationUnavailable(
                "enable location access to get a recommendation".to_string(),
            ),
            RecommendError::ServiceUnavailable => {
                AppError::ServiceUnavailable("place search is still loading".to_string())
            }
            RecommendError::ZeroResults => AppError::SearchZeroResults,
            RecommendError::ServiceError(reason) => AppError::SearchServiceError(reason),
        }
    }
}

/// A venue drawn from the saved list, measured from the origin
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPick {
    pub candidate: Candidate,
    pub distance_meters: f64,
    pub travel_time: TravelTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub radius_meters: u32,
    pub category: Option<String>,
    pub keyword: String,
}

impl Default for NearbyQuery {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_RADIUS_METERS,
            category: Some("FD6".to_string()),
            keyword: "맛집".to_string(),
        }
    }
}

/// The two recommendation modes
///
/// Without a search service only the saved-list mode works; nearby requests
/// answer [`RecommendError::ServiceUnavailable`].
pub struct RecommendationSelector {
    search: Option<Arc<CandidateSearchService>>,
}

impl RecommendationSelector {
    pub fn new(search: Option<Arc<CandidateSearchService>>) -> Self {
        Self { search }
    }

    /// Uniform pick from `saved`, with distance and ETA from `origin`
    pub fn recommend_from_saved_list(
        &self,
        saved: &[Candidate],
        origin: Option<Coordinate>,
    ) -> Result<SavedPick, RecommendError> {
        if saved.is_empty() {
            return Err(RecommendError::EmptyList);
        }
        let origin = origin.ok_or(RecommendError::NoOrigin)?;

        let candidate = saved
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(RecommendError::EmptyList)?;

        let distance = distance_meters(origin, candidate.coordinate);
        let travel_time = estimate_travel_time(distance);

        tracing::debug!(
            name = %candidate.name,
            pool = saved.len(),
            distance,
            "Picked saved venue"
        );

        Ok(SavedPick {
            candidate: Candidate {
                distance_meters: Some(distance),
                ..candidate
            },
            distance_meters: distance,
            travel_time,
        })
    }

    /// Fails fast when a nearby search cannot run right now
    pub fn check_location_ready(
        &self,
        origin: Option<Coordinate>,
    ) -> Result<(Coordinate, &Arc<CandidateSearchService>), RecommendError> {
        let origin = origin.ok_or(RecommendError::NoOrigin)?;
        match &self.search {
            Some(search) if search.is_ready() => Ok((origin, search)),
            _ => Err(RecommendError::ServiceUnavailable),
        }
    }

    /// Nearby candidates in a uniformly shuffled order
    pub async fn recommend_from_location(
        &self,
        origin: Option<Coordinate>,
        query: &NearbyQuery,
    ) -> Result<Vec<Candidate>, RecommendError> {
        let (origin, search) = self.check_location_ready(origin)?;

        let mut candidates = search
            .search(
                origin,
                query.radius_meters,
                &query.keyword,
                query.category.as_deref(),
            )
            .await?;

        candidates.shuffle(&mut rand::thread_rng());
        tracing::debug!(count = candidates.len(), "Nearby candidates shuffled");
        Ok(candidates)
    }
}
