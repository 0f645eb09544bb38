use std::sync::Arc;

use crate::{
    models::{Coordinate, RouteResult, TravelMode},
    services::providers::RoutingProvider,
};

/// Best-effort route lookup
///
/// Never fails: when the routing service errors or answers with something
/// unusable, a straight origin-to-destination line flagged `is_fallback` is
/// returned and the caller shows the heuristic ETA instead.
pub struct RouteResolver {
    provider: Arc<dyn RoutingProvider>,
}

impl RouteResolver {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> RouteResult {
        match self.provider.fetch_route(origin, destination, mode).await {
            Ok(route) if route.path.len() >= 2 => {
                tracing::debug!(
                    mode = mode.profile(),
                    distance = route.distance_meters,
                    points = route.path.len(),
                    "Route resolved"
                );
                route
            }
            Ok(route) => {
                tracing::warn!(
                    points = route.path.len(),
                    "Routing service returned a degenerate path, using straight line"
                );
                RouteResult::fallback(origin, destination)
            }
            Err(e) => {
                tracing::warn!(error = %e, mode = mode.profile(), "Routing failed, using straight line");
                RouteResult::fallback(origin, destination)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{MockRoutingProvider, RouteError};

    const ORIGIN: Coordinate = Coordinate::new(37.5665, 126.9780);
    const DESTINATION: Coordinate = Coordinate::new(37.5700, 126.9920);

    #[tokio::test]
    async fn test_failing_service_falls_back_to_straight_line() {
        let mut provider = MockRoutingProvider::new();
        provider.expect_fetch_route().times(1).returning(|_, _, _| {
            Err(RouteError::Status {
                status: 503,
                body: "busy".to_string(),
            })
        });

        let route = RouteResolver::new(Arc::new(provider))
            .resolve(ORIGIN, DESTINATION, TravelMode::Walking)
            .await;

        assert!(route.is_fallback);
        assert_eq!(route.path, vec![ORIGIN, DESTINATION]);
        assert_eq!(route.distance_meters, 0.0);
        assert_eq!(route.duration_seconds, 0.0);
    }

    #[tokio::test]
    async fn test_mode_is_forwarded_and_route_kept() {
        let mut provider = MockRoutingProvider::new();
        provider
            .expect_fetch_route()
            .withf(|origin, destination, mode| {
                *origin == ORIGIN && *destination == DESTINATION && *mode == TravelMode::Driving
            })
            .times(1)
            .returning(|origin, destination, _| {
                Ok(RouteResult {
                    path: vec![origin, Coordinate::new(37.568, 126.985), destination],
                    distance_meters: 1500.0,
                    duration_seconds: 240.0,
                    is_fallback: false,
                })
            });

        let route = RouteResolver::new(Arc::new(provider))
            .resolve(ORIGIN, DESTINATION, TravelMode::Driving)
            .await;

        assert!(!route.is_fallback);
        assert_eq!(route.path.len(), 3);
        assert_eq!(route.path.first(), Some(&ORIGIN));
        assert_eq!(route.path.last(), Some(&DESTINATION));
    }

    #[tokio::test]
    async fn test_degenerate_path_falls_back() {
        let mut provider = MockRoutingProvider::new();
        provider.expect_fetch_route().returning(|origin, _, _| {
            Ok(RouteResult {
                path: vec![origin],
                distance_meters: 10.0,
                duration_seconds: 10.0,
                is_fallback: false,
            })
        });

        let route = RouteResolver::new(Arc::new(provider))
            .resolve(ORIGIN, DESTINATION, TravelMode::Walking)
            .await;
        assert!(route.is_fallback);
        assert_eq!(route.path, vec![ORIGIN, DESTINATION]);
    }
}
