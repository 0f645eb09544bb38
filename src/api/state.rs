use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::Coordinate,
    services::{
        geolocation::{FixedLocator, GeoFailure, LocationState, LocationWatch, ReportedLocator},
        map::SceneMap,
        providers::{
            BackendVenueSource, KakaoPlaceSearch, OsrmRoutingProvider, PlaceSearchProvider,
            RoutingProvider, SavedVenueSource,
        },
        sdk_loader::SdkLoader,
        CandidateSearchService, Coordinator, MapSession, NearbyQuery, RecommendationSelector,
        RouteResolver,
    },
};

pub type SharedSession = Arc<Mutex<MapSession<SceneMap>>>;

/// External collaborators the service is wired to
pub struct Providers {
    pub place_search: Arc<dyn PlaceSearchProvider>,
    pub routing: Arc<dyn RoutingProvider>,
    pub saved: Arc<dyn SavedVenueSource>,
}

/// How a new session learns its location
#[derive(Debug, Clone, Copy, Default)]
pub enum InitialLocation {
    /// Wait for a one-shot report from the client
    #[default]
    Reported,
    Known(Coordinate),
    Failed(GeoFailure),
}

/// Shared application state
pub struct AppState {
    pub coordinator: Coordinator,
    pub search: Arc<CandidateSearchService>,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    fixed_origin: Option<Coordinate>,
    geolocation_timeout: Duration,
}

impl AppState {
    /// Builds the production providers from configuration
    pub fn new(config: &Config) -> AppResult<Self> {
        let providers = Providers {
            place_search: Arc::new(KakaoPlaceSearch::new(
                config.kakao_rest_api_key.clone(),
                config.kakao_api_url.clone(),
                config.http_timeout(),
            )?),
            routing: Arc::new(OsrmRoutingProvider::new(
                config.routing_api_url.clone(),
                config.http_timeout(),
            )?),
            saved: Arc::new(BackendVenueSource::new(
                config.backend_api_url.clone(),
                config.http_timeout(),
            )?),
        };
        Ok(Self::from_providers(providers, config))
    }

    pub fn from_providers(providers: Providers, config: &Config) -> Self {
        let search = Arc::new(CandidateSearchService::new(
            providers.place_search,
            Arc::new(SdkLoader::new("place-search")),
        ));

        let defaults = NearbyQuery {
            radius_meters: config.search_radius_meters,
            category: Some(config.search_category.trim().to_string()).filter(|c| !c.is_empty()),
            keyword: config.search_keyword.clone(),
        };

        let coordinator = Coordinator::new(
            RecommendationSelector::new(Some(search.clone())),
            RouteResolver::new(providers.routing),
            providers.saved,
            defaults,
            config.geolocation_timeout(),
        );

        Self {
            coordinator,
            search,
            sessions: RwLock::new(HashMap::new()),
            fixed_origin: config.fixed_origin(),
            geolocation_timeout: config.geolocation_timeout(),
        }
    }

    /// Runs the place-search warm-up in the background
    pub fn spawn_search_warm_up(self: &Arc<Self>) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            match state.search.initialize().await {
                Ok(()) => tracing::info!("Place search ready"),
                Err(e) => tracing::warn!(error = %e, "Place search warm-up failed, will retry on next use"),
            }
        });
    }

    pub async fn create_session(&self, initial: InitialLocation) -> SharedSession {
        let (location, reporter) = match (initial, self.fixed_origin) {
            (InitialLocation::Known(coordinate), _) => (
                LocationWatch::settled_with(LocationState::Available { coordinate }),
                None,
            ),
            (InitialLocation::Failed(reason), _) => (
                LocationWatch::settled_with(LocationState::Unavailable { reason }),
                None,
            ),
            (InitialLocation::Reported, Some(origin)) => (
                LocationWatch::spawn(
                    Box::new(FixedLocator::new(Some(origin))),
                    self.geolocation_timeout,
                ),
                None,
            ),
            (InitialLocation::Reported, None) => {
                let (reporter, locator) = ReportedLocator::channel();
                (
                    LocationWatch::spawn(Box::new(locator), self.geolocation_timeout),
                    Some(reporter),
                )
            }
        };

        let session = MapSession::new(SceneMap::default(), location, reporter);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, shared.clone());
        tracing::info!(session_id = %id, live = sessions.len(), "Map session created");
        shared
    }

    /// Looks the session up and marks it as in use
    pub async fn session(&self, id: Uuid) -> AppResult<SharedSession> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("session {}", id)))?;
        session.lock().await.touch();
        Ok(session)
    }

    /// Tears the session down and forgets it
    pub async fn close_session(&self, id: Uuid) -> AppResult<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {}", id)))?;
        session.lock().await.teardown();
        Ok(())
    }

    /// Tears down every live session; returns how many were cleared
    pub async fn teardown_all(&self) -> usize {
        let drained: Vec<SharedSession> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };

        let mut cleared = 0;
        for session in drained {
            if session.lock().await.teardown() {
                cleared += 1;
            }
        }
        cleared
    }

    /// Tears down and forgets sessions idle for at least `idle` as of `now`
    ///
    /// Sessions locked by an in-flight request are in use and stay.
    pub async fn expire_idle(&self, idle: Duration, now: Instant) -> usize {
        let expired: Vec<(Uuid, SharedSession)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, session)| {
                    session
                        .try_lock()
                        .map(|guard| guard.is_idle(idle, now))
                        .unwrap_or(false)
                })
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|session| (id, session)))
                .collect()
        };

        let mut cleared = 0;
        for (id, session) in expired {
            if session.lock().await.teardown() {
                cleared += 1;
            }
            tracing::info!(session_id = %id, "Idle map session expired");
        }
        cleared
    }

    /// Periodically expires idle sessions
    pub fn spawn_session_sweeper(self: &Arc<Self>, idle: Duration, period: Duration) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let expired = state.expire_idle(idle, Instant::now()).await;
                if expired > 0 {
                    let live = state.session_count().await;
                    tracing::debug!(expired, live, "Session sweep");
                }
            }
        });
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{
        MockPlaceSearchProvider, MockRoutingProvider, MockSavedVenueSource,
    };

    const ORIGIN: Coordinate = Coordinate::new(37.5665, 126.9780);
    const IDLE: Duration = Duration::from_secs(60);

    fn state() -> AppState {
        let providers = Providers {
            place_search: Arc::new(MockPlaceSearchProvider::new()),
            routing: Arc::new(MockRoutingProvider::new()),
            saved: Arc::new(MockSavedVenueSource::new()),
        };
        AppState::from_providers(providers, &Config::default())
    }

    #[tokio::test]
    async fn test_idle_session_is_cleared_once_and_forgotten() {
        let state = state();
        let session = state.create_session(InitialLocation::Known(ORIGIN)).await;
        let id = session.lock().await.id();

        assert_eq!(state.expire_idle(IDLE, Instant::now()).await, 0);
        assert_eq!(state.session_count().await, 1);

        let later = Instant::now() + IDLE;
        assert_eq!(state.expire_idle(IDLE, later).await, 1);
        assert_eq!(state.session_count().await, 0);
        assert!(matches!(state.session(id).await, Err(AppError::NotFound(_))));

        assert!(session.lock().await.is_torn_down());
        assert!(!session.lock().await.teardown());
        assert_eq!(state.expire_idle(IDLE, later).await, 0);
    }

    #[tokio::test]
    async fn test_used_session_outlives_idle_one() {
        let state = state();
        let stale = state.create_session(InitialLocation::Known(ORIGIN)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let active = state.create_session(InitialLocation::Known(ORIGIN)).await;
        let active_id = active.lock().await.id();

        let idle = Duration::from_millis(10);
        state.session(active_id).await.unwrap();
        let now = Instant::now();
        assert_eq!(state.expire_idle(idle, now).await, 1);
        assert!(stale.lock().await.is_torn_down());
        assert!(state.session(active_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_busy_session_is_skipped() {
        let state = state();
        let session = state.create_session(InitialLocation::Known(ORIGIN)).await;
        let guard = session.lock().await;

        assert_eq!(state.expire_idle(IDLE, Instant::now() + IDLE).await, 0);
        assert_eq!(state.session_count().await, 1);
        drop(guard);
    }
}
