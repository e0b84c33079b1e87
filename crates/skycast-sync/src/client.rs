//! # Remote Weather Client
//!
//! Single-attempt HTTP access to the OpenWeather-compatible API.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         One Fetch, One Round Trip                       │
//! │                                                                         │
//! │  SyncOrchestrator                                                      │
//! │       │  fetch_current(lat, lon, units, lang)                          │
//! │       ▼                                                                 │
//! │  OpenWeatherClient ──GET {base}/weather?lat&lon&units&lang&appid──►    │
//! │       │                                                                 │
//! │       ├── 2xx + valid JSON ──► CurrentConditions                       │
//! │       ├── 2xx + bad JSON   ──► FetchError::Decode                      │
//! │       ├── non-2xx          ──► FetchError::Status                      │
//! │       └── transport error  ──► FetchError::Network                     │
//! │                                                                         │
//! │  No retries. The orchestrator decides what a failure means.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ApiSettings;
use crate::error::{SyncError, SyncResult};
use skycast_core::{CurrentConditions, Forecast, GeocodeResult, Units};

// =============================================================================
// Fetch Errors
// =============================================================================

/// Why a remote call failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// No API key configured; nothing was sent.
    #[error("API key is not configured")]
    MissingApiKey,

    /// Connection, TLS or timeout failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body did not match the expected payload shape.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

// =============================================================================
// Weather API Seam
// =============================================================================

/// Remote weather source used by the orchestrator.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Current conditions at the given coordinates.
    async fn fetch_current(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        lang: &str,
    ) -> Result<CurrentConditions, FetchError>;

    /// Forecast series at the given coordinates.
    async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        lang: &str,
    ) -> Result<Forecast, FetchError>;

    /// Place names near the given coordinates, best match first.
    async fn fetch_reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<GeocodeResult>, FetchError>;
}

// =============================================================================
// OpenWeather Client
// =============================================================================

/// `reqwest`-backed [`WeatherApi`].
///
/// Holds one connection pool for the life of the process.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    settings: ApiSettings,
}

impl OpenWeatherClient {
    /// Builds the HTTP client from API settings.
    ///
    /// ## Returns
    /// * `Err(SyncError::InvalidConfig)` - The HTTP client could not be built
    pub fn new(settings: ApiSettings) -> SyncResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(OpenWeatherClient { client, settings })
    }

    fn endpoint(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    fn api_key(&self) -> Result<&str, FetchError> {
        self.settings.api_key().ok_or(FetchError::MissingApiKey)
    }

    async fn get_weather<T: DeserializeOwned>(
        &self,
        path: &str,
        lat: f64,
        lon: f64,
        units: Units,
        lang: &str,
    ) -> Result<T, FetchError> {
        let api_key = self.api_key()?;
        let url = Self::endpoint(&self.settings.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("units", units.as_query_param().to_string()),
                ("lang", lang.to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Maps status and body into a typed payload.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, FetchError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Weather API returned an error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_current(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        lang: &str,
    ) -> Result<CurrentConditions, FetchError> {
        self.get_weather("weather", lat, lon, units, lang).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        lang: &str,
    ) -> Result<Forecast, FetchError> {
        self.get_weather("forecast", lat, lon, units, lang).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<GeocodeResult>, FetchError> {
        let api_key = self.api_key()?;
        let url = Self::endpoint(&self.settings.geo_base_url, "reverse");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("limit", self.settings.geocode_limit.to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(ApiSettings::with_base_url("test-key", &server.uri())).unwrap()
    }

    fn current_body() -> serde_json::Value {
        json!({
            "coord": {"lon": -12.4194, "lat": 50.7749},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {
                "temp": 14.2, "feels_like": 13.5, "temp_min": 12.0,
                "temp_max": 15.1, "pressure": 1021, "humidity": 64
            },
            "wind": {"speed": 4.1, "deg": 240},
            "dt": 1700000000,
            "timezone": 0,
            "name": "Somewhere"
        })
    }

    #[tokio::test]
    async fn test_fetch_current_sends_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "50.7749"))
            .and(query_param("lon", "-12.4194"))
            .and(query_param("units", "imperial"))
            .and(query_param("lang", "fr"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(1)
            .mount(&server)
            .await;

        let current = client_for(&server)
            .fetch_current(50.7749, -12.4194, Units::Imperial, "fr")
            .await
            .unwrap();

        assert_eq!(current.name, "Somewhere");
        assert_eq!(current.description(), Some("clear sky"));
        assert_eq!(current.main.humidity, 64);
    }

    #[tokio::test]
    async fn test_fetch_forecast() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{
                    "dt": 1700010800,
                    "main": {
                        "temp": 9.0, "feels_like": 7.2, "temp_min": 8.1,
                        "temp_max": 9.0, "pressure": 1019, "humidity": 77
                    },
                    "weather": [{"id": 501, "main": "Rain", "description": "moderate rain", "icon": "10n"}],
                    "wind": {"speed": 5.5, "deg": 200},
                    "pop": 0.8
                }],
                "city": {"name": "York", "coord": {"lat": 53.96, "lon": -1.08}, "timezone": 0}
            })))
            .mount(&server)
            .await;

        let forecast = client_for(&server)
            .fetch_forecast(53.96, -1.08, Units::Metric, "en")
            .await
            .unwrap();

        assert_eq!(forecast.list.len(), 1);
        assert_eq!(forecast.city.name, "York");
        assert_eq!(forecast.max_precipitation_chance(), Some(0.8));
    }

    #[tokio::test]
    async fn test_fetch_reverse_geocode_uses_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "York", "lat": 53.96, "lon": -1.08, "country": "GB", "state": "England"}
            ])))
            .mount(&server)
            .await;

        let places = client_for(&server)
            .fetch_reverse_geocode(53.96, -1.08)
            .await
            .unwrap();

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].display_address(), "York, England, GB");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_current(1.0, 2.0, Units::Metric, "en")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FetchError::Status {
                status: 401,
                body: "Invalid API key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;

        // "weather" must be a non-empty list.
        let mut body = current_body();
        body["weather"] = json!([]);

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_current(1.0, 2.0, Units::Metric, "en")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(0)
            .mount(&server)
            .await;

        let mut settings = ApiSettings::with_base_url("", &server.uri());
        settings.api_key = None;
        let client = OpenWeatherClient::new(settings).unwrap();

        let err = client
            .fetch_current(1.0, 2.0, Units::Metric, "en")
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::MissingApiKey);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let client =
            OpenWeatherClient::new(ApiSettings::with_base_url("test-key", "http://127.0.0.1:1"))
                .unwrap();

        let err = client
            .fetch_forecast(1.0, 2.0, Units::Metric, "en")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
