use serde::Deserialize;
use std::time::Duration;

use crate::{models::Coordinate, services::geolocation::DEFAULT_GEOLOCATION_TIMEOUT};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Kakao Local REST API key; place search stays unavailable without it
    #[serde(default)]
    pub kakao_rest_api_key: Option<String>,

    /// Kakao Local API base URL
    #[serde(default = "default_kakao_api_url")]
    pub kakao_api_url: String,

    /// OSRM-compatible routing service base URL
    #[serde(default = "default_routing_api_url")]
    pub routing_api_url: String,

    /// Backend serving the saved venue list
    #[serde(default = "default_backend_api_url")]
    pub backend_api_url: String,

    #[serde(default = "default_search_radius_meters")]
    pub search_radius_meters: u32,

    #[serde(default = "default_search_keyword")]
    pub search_keyword: String,

    /// Category group filter (FD6 = restaurants)
    #[serde(default = "default_search_category")]
    pub search_category: String,

    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Sessions untouched for this long are torn down and forgotten
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,

    /// Fixed origin for kiosk deployments; both must be set to take effect
    #[serde(default)]
    pub fixed_latitude: Option<f64>,
    #[serde(default)]
    pub fixed_longitude: Option<f64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_kakao_api_url() -> String {
    "https://dapi.kakao.com".to_string()
}

fn default_routing_api_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_backend_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_search_radius_meters() -> u32 {
    3000
}

fn default_search_keyword() -> String {
    "맛집".to_string()
}

fn default_search_category() -> String {
    "FD6".to_string()
}

fn default_geolocation_timeout_secs() -> u64 {
    DEFAULT_GEOLOCATION_TIMEOUT.as_secs()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

fn default_session_sweep_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Sweep period, never zero
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs.max(1))
    }

    pub fn fixed_origin(&self) -> Option<Coordinate> {
        match (self.fixed_latitude, self.fixed_longitude) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)).filter(|c| c.is_valid()),
            _ => None,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            kakao_rest_api_key: None,
            kakao_api_url: default_kakao_api_url(),
            routing_api_url: default_routing_api_url(),
            backend_api_url: default_backend_api_url(),
            search_radius_meters: default_search_radius_meters(),
            search_keyword: default_search_keyword(),
            search_category: default_search_category(),
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            session_idle_secs: default_session_idle_secs(),
            session_sweep_secs: default_session_sweep_secs(),
            fixed_latitude: None,
            fixed_longitude: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.search_radius_meters, 3000);
        assert_eq!(config.search_category, "FD6");
        assert_eq!(config.geolocation_timeout(), Duration::from_secs(10));
        assert!(config.kakao_rest_api_key.is_none());
        assert_eq!(config.session_idle(), Duration::from_secs(1800));
        assert_eq!(config.session_sweep_interval(), Duration::from_secs(60));
        assert!(config.fixed_origin().is_none());
    }

    #[test]
    fn test_fixed_origin_requires_both_components() {
        let vars = vec![
            ("FIXED_LATITUDE".to_string(), "37.5".to_string()),
            ("PORT".to_string(), "8088".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 8088);
        assert!(config.fixed_origin().is_none());

        let vars = vec![
            ("FIXED_LATITUDE".to_string(), "37.5".to_string()),
            ("FIXED_LONGITUDE".to_string(), "127.0".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.fixed_origin(), Some(Coordinate::new(37.5, 127.0)));
    }
}
