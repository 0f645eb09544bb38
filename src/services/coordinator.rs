use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{Coordinate, RecommendationMode, RecommendationState, RouteResult, TravelMode},
    services::{
        distance::{distance_meters, estimate_travel_time},
        map::MapAdapter,
        providers::SavedVenueSource,
        recommendation::{NearbyQuery, RecommendError, RecommendationSelector},
        routing::RouteResolver,
        session::{ActionTicket, MapSession},
    },
};

/// What a route action produced, with the ETA to display
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub mode: TravelMode,
    pub route: RouteResult,
    /// Routed duration, or the heuristic ETA when the route is a fallback
    pub travel_minutes: u32,
    pub distance_meters: f64,
}

/// Runs user actions against a map session
///
/// Each flow takes a ticket, releases the session while it waits on I/O and
/// renders only if its ticket is still the latest one. A flow overtaken by a
/// newer action fails with [`AppError::Superseded`].
pub struct Coordinator {
    selector: RecommendationSelector,
    resolver: RouteResolver,
    saved: Arc<dyn SavedVenueSource>,
    defaults: NearbyQuery,
    geolocation_timeout: Duration,
}

impl Coordinator {
    pub fn new(
        selector: RecommendationSelector,
        resolver: RouteResolver,
        saved: Arc<dyn SavedVenueSource>,
        defaults: NearbyQuery,
        geolocation_timeout: Duration,
    ) -> Self {
        Self {
            selector,
            resolver,
            saved,
            defaults,
            geolocation_timeout,
        }
    }

    pub fn selector(&self) -> &RecommendationSelector {
        &self.selector
    }

    pub fn defaults(&self) -> &NearbyQuery {
        &self.defaults
    }

    /// Takes a ticket, then waits for the session's location outside the lock
    async fn start<M: MapAdapter>(
        &self,
        session: &Mutex<MapSession<M>>,
    ) -> (ActionTicket, Option<Coordinate>) {
        let (ticket, mut location) = {
            let mut guard = session.lock().await;
            (guard.begin_action(), guard.location())
        };
        let origin = location.settled(self.geolocation_timeout).await.coordinate();
        (ticket, origin)
    }

    pub async fn recommend_saved<M: MapAdapter>(
        &self,
        session: &Mutex<MapSession<M>>,
    ) -> AppResult<RecommendationState> {
        let (ticket, origin) = self.start(session).await;
        let saved = self.saved.list_saved().await?;

        let pick = self.selector.recommend_from_saved_list(&saved, origin);

        let mut guard = session.lock().await;
        if !guard.is_current(ticket) {
            return Err(AppError::Superseded);
        }
        let pick = pick?;
        let origin = origin.ok_or(RecommendError::NoOrigin)?;

        guard.enter_mode(RecommendationMode::FromSavedList);
        guard.apply_saved_pick(ticket, origin, pick);
        tracing::info!(session_id = %guard.id(), "Recommended from saved list");
        Ok(guard.state().clone())
    }

    pub async fn recommend_nearby<M: MapAdapter>(
        &self,
        session: &Mutex<MapSession<M>>,
        query: Option<NearbyQuery>,
    ) -> AppResult<RecommendationState> {
        let query = query.unwrap_or_else(|| self.defaults.clone());
        let (ticket, origin) = self.start(session).await;
        self.selector.check_location_ready(origin)?;

        {
            let mut guard = session.lock().await;
            if !guard.is_current(ticket) {
                return Err(AppError::Superseded);
            }
            guard.enter_mode(RecommendationMode::FromLocation);
        }

        let result = self.selector.recommend_from_location(origin, &query).await;

        let mut guard = session.lock().await;
        if !guard.is_current(ticket) {
            return Err(AppError::Superseded);
        }
        let nearby = result?;
        let origin = origin.ok_or(RecommendError::NoOrigin)?;

        let count = nearby.len();
        guard.apply_nearby(ticket, origin, nearby);
        tracing::info!(session_id = %guard.id(), count, radius = query.radius_meters, "Recommended nearby venues");
        Ok(guard.state().clone())
    }

    /// Routes to the saved pick, or to nearby candidate `index`
    pub async fn route<M: MapAdapter>(
        &self,
        session: &Mutex<MapSession<M>>,
        mode: TravelMode,
        index: Option<usize>,
    ) -> AppResult<RouteOutcome> {
        let (ticket, mut location, destination, marker_index) = {
            let mut guard = session.lock().await;
            let state = guard.state();
            let destination = state.destination(index).cloned().ok_or_else(|| match state.mode {
                RecommendationMode::None => {
                    AppError::InvalidInput("nothing has been recommended yet".to_string())
                }
                RecommendationMode::FromLocation if index.is_none() => {
                    AppError::InvalidInput("candidate_index is required for nearby results".to_string())
                }
                _ => AppError::NotFound(format!("candidate {}", index.unwrap_or_default())),
            })?;
            let marker_index = match state.mode {
                RecommendationMode::FromLocation => index.unwrap_or_default(),
                _ => 0,
            };
            (guard.begin_action(), guard.location(), destination, marker_index)
        };

        let origin = location
            .settled(self.geolocation_timeout)
            .await
            .coordinate()
            .ok_or(RecommendError::NoOrigin)?;

        let route = self
            .resolver
            .resolve(origin, destination.coordinate, mode)
            .await;

        let outcome = if route.is_fallback {
            let distance = distance_meters(origin, destination.coordinate);
            RouteOutcome {
                mode,
                travel_minutes: estimate_travel_time(distance).for_mode(mode),
                distance_meters: distance,
                route,
            }
        } else {
            RouteOutcome {
                mode,
                travel_minutes: route.duration_minutes(),
                distance_meters: route.distance_meters,
                route,
            }
        };

        let mut guard = session.lock().await;
        if !guard.apply_route(ticket, origin, marker_index, mode, outcome.route.clone()) {
            return Err(AppError::Superseded);
        }
        tracing::info!(
            session_id = %guard.id(),
            destination = %destination.name,
            fallback = outcome.route.is_fallback,
            "Route rendered"
        );
        Ok(outcome)
    }
}
