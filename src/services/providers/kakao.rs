/// Kakao Local keyword search provider
///
/// Uses the REST counterpart of the map SDK's `Places.keywordSearch`:
/// `GET /v2/local/search/keyword.json` with an `Authorization: KakaoAK {key}`
/// header. Kakao serves at most 15 documents per page and 3 pages per query,
/// so pages are followed until `meta.is_end` to hand the caller the full set.
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{PlaceQuery, PlaceSearchProvider, PlaceSearchResponse};
use crate::error::AppResult;

const PAGE_SIZE: u32 = 15;
const MAX_PAGES: u32 = 3;
/// Kakao rejects radii above 20 km
const MAX_RADIUS_METERS: u32 = 20_000;

#[derive(Clone)]
pub struct KakaoPlaceSearch {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct KeywordSearchResponse {
    #[serde(default)]
    documents: Vec<Value>,
    meta: KeywordSearchMeta,
}

#[derive(Debug, Deserialize)]
struct KeywordSearchMeta {
    #[serde(default = "default_is_end")]
    is_end: bool,
}

fn default_is_end() -> bool {
    true
}

enum PageOutcome {
    Page(KeywordSearchResponse),
    Failed(String),
}

impl KakaoPlaceSearch {
    pub fn new(api_key: Option<String>, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            api_url,
        })
    }

    fn authorization(&self) -> Result<String, String> {
        self.api_key
            .as_ref()
            .map(|key| format!("KakaoAK {}", key))
            .ok_or_else(|| "Kakao REST API key is not configured (KAKAO_REST_API_KEY)".to_string())
    }

    fn query_params(query: &PlaceQuery, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", query.keyword.clone()),
            ("x", query.center.lng.to_string()),
            ("y", query.center.lat.to_string()),
            ("radius", query.radius_meters.min(MAX_RADIUS_METERS).to_string()),
            ("page", page.to_string()),
            ("size", PAGE_SIZE.to_string()),
            (
                "sort",
                if query.sort_by_distance { "distance" } else { "accuracy" }.to_string(),
            ),
        ];
        if let Some(code) = &query.category_group {
            params.push(("category_group_code", code.clone()));
        }
        params
    }

    async fn fetch_page(&self, query: &PlaceQuery, page: u32) -> PageOutcome {
        let authorization = match self.authorization() {
            Ok(value) => value,
            Err(reason) => return PageOutcome::Failed(reason),
        };
        let url = format!("{}/v2/local/search/keyword.json", self.api_url);

        let response = match self
            .http_client
            .get(&url)
            .header("Authorization", authorization)
            .query(&Self::query_params(query, page))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PageOutcome::Failed(format!("Kakao request failed: {}", e)),
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return PageOutcome::Failed(format!("Kakao API returned status {}: {}", status, body));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return PageOutcome::Failed(format!("Failed to read Kakao response: {}", e)),
        };

        match serde_json::from_str::<KeywordSearchResponse>(&text) {
            Ok(parsed) => PageOutcome::Page(parsed),
            Err(e) => {
                tracing::error!(error = %e, response = %text, "Failed to deserialize Kakao response");
                PageOutcome::Failed(format!("Invalid Kakao response format: {}", e))
            }
        }
    }
}

#[async_trait::async_trait]
impl PlaceSearchProvider for KakaoPlaceSearch {
    async fn keyword_search(&self, query: &PlaceQuery) -> PlaceSearchResponse {
        if query.keyword.trim().is_empty() {
            return PlaceSearchResponse::Error("Search keyword cannot be empty".to_string());
        }

        let mut documents = Vec::new();
        for page in 1..=MAX_PAGES {
            match self.fetch_page(query, page).await {
                PageOutcome::Page(response) => {
                    documents.extend(response.documents);
                    if response.meta.is_end {
                        break;
                    }
                }
                // Later pages failing still leaves a usable first result set
                PageOutcome::Failed(reason) if !documents.is_empty() => {
                    tracing::warn!(page, reason = %reason, "Stopping pagination after failed page");
                    break;
                }
                PageOutcome::Failed(reason) => return PlaceSearchResponse::Error(reason),
            }
        }

        tracing::info!(
            keyword = %query.keyword,
            radius = query.radius_meters,
            results = documents.len(),
            provider = "kakao",
            "Place search completed"
        );

        if documents.is_empty() {
            PlaceSearchResponse::ZeroResults
        } else {
            PlaceSearchResponse::Ok(documents)
        }
    }

    async fn warm_up(&self) -> Result<(), String> {
        let authorization = self.authorization()?;
        let url = format!("{}/v2/local/search/keyword.json", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", authorization)
            .query(&[("query", "서울"), ("size", "1")])
            .send()
            .await
            .map_err(|e| format!("Kakao API unreachable: {}", e))?;

        match response.status().as_u16() {
            200..=299 => Ok(()),
            401 | 403 => Err("Kakao API rejected the configured key".to_string()),
            status => Err(format!("Kakao API returned status {}", status)),
        }
    }

    fn name(&self) -> &'static str {
        "kakao"
    }
}
