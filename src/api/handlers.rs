use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Coordinate, RecommendationState, TravelMode, TravelTime},
    services::{
        distance::{distance_meters, estimate_travel_time},
        geolocation::{GeoFailure, LocationState},
        map::SceneSnapshot,
        NearbyQuery, RouteOutcome,
    },
};

use super::{AppState, InitialLocation};

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub location: Option<Coordinate>,
    pub location_error: Option<GeoFailure>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub location: LocationState,
    pub recommendation: RecommendationState,
}

#[derive(Debug, Deserialize)]
pub struct LocationReport {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub error: Option<GeoFailure>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NearbyRequest {
    pub radius_meters: Option<u32>,
    pub category: Option<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub mode: TravelMode,
    pub candidate_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_lat: f64,
    pub to_lng: f64,
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    pub distance_meters: f64,
    pub travel_time: TravelTime,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub place_search: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_search_error: Option<String>,
    pub sessions: usize,
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        place_search: state.search.readiness(),
        place_search_error: state.search.last_failure(),
        sessions: state.session_count().await,
    })
}

/// Open a map session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    request: Option<Json<CreateSessionRequest>>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let initial = match (request.location, request.location_error) {
        (Some(_), Some(_)) => {
            return Err(AppError::InvalidInput(
                "send either location or location_error, not both".to_string(),
            ))
        }
        (Some(coordinate), None) if !coordinate.is_valid() => {
            return Err(AppError::InvalidInput(format!(
                "invalid coordinate ({}, {})",
                coordinate.lat, coordinate.lng
            )))
        }
        (Some(coordinate), None) => InitialLocation::Known(coordinate),
        (None, Some(reason)) => InitialLocation::Failed(reason),
        (None, None) => InitialLocation::Reported,
    };

    let session = state.create_session(initial).await;
    let session = session.lock().await;
    let response = SessionResponse {
        id: session.id(),
        created_at: session.created_at(),
        location: session.location().current(),
        recommendation: session.state().clone(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Tear the session's map down
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.close_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// One-shot geolocation result from the client
pub async fn report_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(report): Json<LocationReport>,
) -> AppResult<StatusCode> {
    let result = match (report.lat, report.lng, report.error) {
        (Some(lat), Some(lng), None) => {
            let coordinate = Coordinate::new(lat, lng);
            if !coordinate.is_valid() {
                return Err(AppError::InvalidInput(format!("invalid coordinate ({}, {})", lat, lng)));
            }
            Ok(coordinate)
        }
        (None, None, Some(reason)) => Err(reason),
        _ => {
            return Err(AppError::InvalidInput(
                "send lat and lng, or error".to_string(),
            ))
        }
    };

    let session = state.session(id).await?;
    let reporter = session
        .lock()
        .await
        .take_reporter()
        .ok_or_else(|| AppError::InvalidInput("location was already settled".to_string()))?;

    if !reporter.report(result) {
        return Err(AppError::InvalidInput("location report was not accepted".to_string()));
    }
    Ok(StatusCode::ACCEPTED)
}

/// Current scene: markers, open info-windows, route overlay and viewport
pub async fn get_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SceneSnapshot>> {
    let session = state.session(id).await?;
    let snapshot = session.lock().await.map().snapshot();
    Ok(Json(snapshot))
}

pub async fn get_recommendation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RecommendationState>> {
    let session = state.session(id).await?;
    let recommendation = session.lock().await.state().clone();
    Ok(Json(recommendation))
}

/// Random pick from the saved venue list
pub async fn recommend_saved(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RecommendationState>> {
    let session = state.session(id).await?;
    let recommendation = state.coordinator.recommend_saved(&session).await?;
    Ok(Json(recommendation))
}

/// Nearby venues in shuffled order
pub async fn recommend_nearby(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    request: Option<Json<NearbyRequest>>,
) -> AppResult<Json<RecommendationState>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let defaults = state.coordinator.defaults();

    let radius_meters = request.radius_meters.unwrap_or(defaults.radius_meters);
    if radius_meters == 0 {
        return Err(AppError::InvalidInput("radius_meters must be positive".to_string()));
    }
    let query = NearbyQuery {
        radius_meters,
        category: match request.category {
            Some(category) if category.trim().is_empty() => None,
            Some(category) => Some(category),
            None => defaults.category.clone(),
        },
        keyword: request
            .keyword
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| defaults.keyword.clone()),
    };

    let session = state.session(id).await?;
    match state.coordinator.recommend_nearby(&session, Some(query)).await {
        Err(AppError::ServiceUnavailable(reason)) => {
            state.spawn_search_warm_up();
            Err(AppError::ServiceUnavailable(reason))
        }
        result => Ok(Json(result?)),
    }
}

/// Route from the origin to the recommended venue
pub async fn route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RouteRequest>,
) -> AppResult<Json<RouteOutcome>> {
    let session = state.session(id).await?;
    let outcome = state
        .coordinator
        .route(&session, request.mode, request.candidate_index)
        .await?;
    Ok(Json(outcome))
}

/// List selection: only this candidate's info-window stays open
pub async fn focus_candidate(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> AppResult<Json<SceneSnapshot>> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    if !session.focus_candidate(index) {
        return Err(AppError::NotFound(format!("candidate {}", index)));
    }
    Ok(Json(session.map().snapshot()))
}

/// Marker click: opens the marker's info-window next to any already open
pub async fn click_marker(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> AppResult<Json<SceneSnapshot>> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    if !session.marker_clicked(index) {
        return Err(AppError::NotFound(format!("marker {}", index)));
    }
    Ok(Json(session.map().snapshot()))
}

/// Great-circle distance with the heuristic ETA
pub async fn distance(Query(query): Query<DistanceQuery>) -> AppResult<Json<DistanceResponse>> {
    let from = Coordinate::new(query.from_lat, query.from_lng);
    let to = Coordinate::new(query.to_lat, query.to_lng);
    if !from.is_valid() || !to.is_valid() {
        return Err(AppError::InvalidInput("coordinates out of range".to_string()));
    }

    let distance = distance_meters(from, to);
    Ok(Json(DistanceResponse {
        distance_meters: distance,
        travel_time: estimate_travel_time(distance),
    }))
}
