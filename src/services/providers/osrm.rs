/// OSRM routing provider
///
/// `GET /route/v1/{profile}/{lng},{lat};{lng},{lat}?overview=full&geometries=geojson`
/// where profile is `foot` or `driving`. GeoJSON positions come back as
/// `[lng, lat]` and are flipped into [`Coordinate`] here, before anything else
/// sees them.
use reqwest::Client as HttpClient;
use std::time::Duration;

use super::{RouteError, RoutingProvider};
use crate::{
    error::AppResult,
    models::{Coordinate, OsrmResponse, RouteResult, TravelMode},
};

const USER_AGENT: &str = "venue-picker-api";

#[derive(Clone)]
pub struct OsrmRoutingProvider {
    http_client: HttpClient,
    base_url: String,
}

impl OsrmRoutingProvider {
    pub fn new(base_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate, mode: TravelMode) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.base_url.trim_end_matches('/'),
            mode.profile(),
            origin.lng,
            origin.lat,
            destination.lng,
            destination.lat
        )
    }
}

/// Validates an OSRM payload and converts it into a [`RouteResult`]
pub fn normalize_route(response: OsrmResponse) -> Result<RouteResult, RouteError> {
    if response.code != "Ok" {
        return Err(RouteError::NoRoute(format!(
            "{}: {}",
            response.code,
            response.message.unwrap_or_default()
        )));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::NoRoute("response contained no routes".to_string()))?;

    let path: Vec<Coordinate> = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| Coordinate::new(*lat, *lng))
        .collect();

    if path.len() < 2 {
        return Err(RouteError::Malformed(format!(
            "route geometry has {} point(s)",
            path.len()
        )));
    }
    if let Some(bad) = path.iter().find(|c| !c.is_valid()) {
        return Err(RouteError::Malformed(format!("invalid position {:?}", bad)));
    }
    if !route.distance.is_finite() || !route.duration.is_finite() || route.distance < 0.0 || route.duration < 0.0 {
        return Err(RouteError::Malformed(format!(
            "invalid summary: distance={} duration={}",
            route.distance, route.duration
        )));
    }

    Ok(RouteResult {
        path,
        distance_meters: route.distance,
        duration_seconds: route.duration,
        is_fallback: false,
    })
}

#[async_trait::async_trait]
impl RoutingProvider for OsrmRoutingProvider {
    async fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteResult, RouteError> {
        let url = self.route_url(origin, destination, mode);
        tracing::debug!(url = %url, "Requesting route");

        let response = self
            .http_client
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RouteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: OsrmResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, response = %text, "Failed to deserialize OSRM response");
            RouteError::Malformed(e.to_string())
        })?;

        normalize_route(parsed)
    }
}
