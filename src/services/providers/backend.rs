//! Saved venue list served by the backend REST API
use reqwest::Client as HttpClient;
use std::time::Duration;

use super::SavedVenueSource;
use crate::{
    error::{AppError, AppResult},
    models::{Candidate, SavedVenue},
};

#[derive(Clone)]
pub struct BackendVenueSource {
    http_client: HttpClient,
    api_url: String,
}

impl BackendVenueSource {
    pub fn new(api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_url,
        })
    }

    fn list_url(&self) -> String {
        format!("{}/api/restaurants/", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl SavedVenueSource for BackendVenueSource {
    async fn list_saved(&self) -> AppResult<Vec<Candidate>> {
        let url = self.list_url();

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "Saved venue request failed");
            AppError::Backend("Could not load the saved venue list".to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Backend returned an error");
            return Err(AppError::Backend(format!(
                "Saved venue list request returned status {}",
                status
            )));
        }

        let venues: Vec<SavedVenue> = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to deserialize saved venues");
            AppError::Backend("Saved venue list had an unexpected format".to_string())
        })?;

        let candidates: Vec<Candidate> = venues
            .into_iter()
            .map(Candidate::from)
            .filter(|candidate| {
                let valid = candidate.coordinate.is_valid();
                if !valid {
                    tracing::debug!(name = %candidate.name, "Skipping saved venue with invalid coordinates");
                }
                valid
            })
            .collect();

        tracing::info!(count = candidates.len(), "Saved venues loaded");
        Ok(candidates)
    }
}
