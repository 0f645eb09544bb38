use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// Every variant carries the message shown to the user. Retrying is always left
/// to the user; nothing here is retried automatically.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("No matching venues within the search radius")]
    SearchZeroResults,

    #[error("Place search failed, please try again: {0}")]
    SearchServiceError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("There are no saved venues to recommend from")]
    EmptyCandidatePool,

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Superseded by a newer action")]
    Superseded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::LocationUnavailable(_) => StatusCode::PRECONDITION_FAILED,
            AppError::SearchZeroResults | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyCandidatePool => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SearchServiceError(_) | AppError::Backend(_) | AppError::HttpClient(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Superseded => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
