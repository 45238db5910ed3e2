//! The external weather collaborator: given a city name, produce a
//! structured report or a typed failure. Two sequential Open-Meteo calls
//! (geocoding search, then hourly forecast), each schema-validated.

use reqwest::StatusCode;

pub mod schema;

pub use schema::{City, Forecast, GeocodingResponse, WeatherReport};

const GEOCODING_BASE: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_BASE: &str = "https://api.open-meteo.com";

const HOURLY_FIELDS: &str = "temperature_2m,rain,relative_humidity_2m,visibility,weather_code,\
                             precipitation,precipitation_probability,apparent_temperature,dew_point_2m";

/// Failure surface of the collaborator. The display strings are what tool
/// callers see verbatim in their text result.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Failed to fetch geocoding data: {0}")]
    GeocodingStatus(StatusCode),
    #[error("Invalid geocoding data or city not found.")]
    CityNotFound,
    #[error("Failed to fetch weather data: {0}")]
    ForecastStatus(StatusCode),
    #[error("Invalid weather data.")]
    InvalidForecast,
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

pub struct WeatherClient {
    http: reqwest::Client,
    geocoding_base: String,
    forecast_base: String,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    pub fn new() -> Self {
        Self::with_base_urls(GEOCODING_BASE, FORECAST_BASE)
    }

    /// Point the client somewhere else, e.g. a local stub in tests.
    pub fn with_base_urls(
        geocoding_base: impl Into<String>,
        forecast_base: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            geocoding_base: geocoding_base.into(),
            forecast_base: forecast_base.into(),
        }
    }

    /// Resolve the city, fetch its hourly forecast, and return both.
    pub async fn fetch_current(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        tracing::info!(%city, "fetching weather data");

        let response = self
            .http
            .get(format!("{}/v1/search", self.geocoding_base))
            .query(&[
                ("name", city),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WeatherError::GeocodingStatus(response.status()));
        }
        let geocoding: GeocodingResponse = response
            .json()
            .await
            .map_err(|_| WeatherError::CityNotFound)?;
        let city_data = geocoding
            .results
            .as_deref()
            .and_then(|results| results.first())
            .cloned()
            .ok_or(WeatherError::CityNotFound)?;

        let response = self
            .http
            .get(format!("{}/v1/forecast", self.forecast_base))
            .query(&[
                ("latitude", city_data.latitude.to_string().as_str()),
                ("longitude", city_data.longitude.to_string().as_str()),
                ("hourly", HOURLY_FIELDS),
                ("past_days", "1"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WeatherError::ForecastStatus(response.status()));
        }
        let weather: Forecast = response
            .json()
            .await
            .map_err(|_| WeatherError::InvalidForecast)?;

        Ok(WeatherReport {
            city: city_data,
            weather,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{Json, Router, http::StatusCode, routing::get};
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn berlin() -> Value {
        json!({
            "id": 2950159,
            "name": "Berlin",
            "latitude": 52.52437,
            "longitude": 13.41053,
            "country_code": "DE",
            "timezone": "Europe/Berlin",
            "country": "Germany",
        })
    }

    fn forecast() -> Value {
        json!({
            "latitude": 52.52,
            "longitude": 13.419998,
            "generationtime_ms": 0.215,
            "utc_offset_seconds": 0,
            "timezone": "GMT",
            "timezone_abbreviation": "GMT",
            "elevation": 38.0,
            "hourly_units": {
                "time": "iso8601",
                "temperature_2m": "°C",
                "rain": "mm",
                "relative_humidity_2m": "%",
                "visibility": "m",
                "weather_code": "wmo code",
                "precipitation": "mm",
                "precipitation_probability": "%",
                "apparent_temperature": "°C",
                "dew_point_2m": "°C",
            },
            "hourly": {
                "time": ["2025-06-01T00:00"],
                "temperature_2m": [18.4],
                "rain": [0.0],
                "relative_humidity_2m": [61.0],
                "visibility": [24140.0],
                "weather_code": [3.0],
                "precipitation": [0.0],
                "precipitation_probability": [6.0],
                "apparent_temperature": [17.9],
                "dew_point_2m": [10.9],
            },
        })
    }

    /// Serve a canned Open-Meteo lookalike on an ephemeral port.
    async fn stub_server(router: Router, ct: CancellationToken) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move { ct.cancelled().await })
                .await;
        });
        addr
    }

    #[tokio::test]
    async fn fetches_and_combines_both_payloads() {
        let ct = CancellationToken::new();
        let router = Router::new()
            .route(
                "/v1/search",
                get(|| async { Json(json!({ "results": [berlin()] })) }),
            )
            .route("/v1/forecast", get(|| async { Json(forecast()) }));
        let addr = stub_server(router, ct.clone()).await;
        let base = format!("http://{addr}");

        let client = WeatherClient::with_base_urls(&base, &base);
        let report = client.fetch_current("Berlin").await.expect("report");
        assert_eq!(report.city.name, "Berlin");
        assert_eq!(report.weather.hourly.temperature_2m, vec![18.4]);

        ct.cancel();
    }

    #[tokio::test]
    async fn unknown_city_is_a_typed_failure() {
        let ct = CancellationToken::new();
        let router = Router::new().route(
            "/v1/search",
            get(|| async { Json(json!({ "results": [] })) }),
        );
        let addr = stub_server(router, ct.clone()).await;
        let base = format!("http://{addr}");

        let client = WeatherClient::with_base_urls(&base, &base);
        let error = client.fetch_current("Atlantis").await.expect_err("fails");
        assert_eq!(
            error.to_string(),
            "Invalid geocoding data or city not found."
        );

        ct.cancel();
    }

    #[tokio::test]
    async fn geocoding_status_failure_carries_the_status() {
        let ct = CancellationToken::new();
        let router = Router::new().route(
            "/v1/search",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let addr = stub_server(router, ct.clone()).await;
        let base = format!("http://{addr}");

        let client = WeatherClient::with_base_urls(&base, &base);
        let error = client.fetch_current("Berlin").await.expect_err("fails");
        assert!(matches!(error, WeatherError::GeocodingStatus(status) if status == StatusCode::SERVICE_UNAVAILABLE));
        assert!(error.to_string().starts_with("Failed to fetch geocoding data:"));

        ct.cancel();
    }

    #[tokio::test]
    async fn invalid_forecast_payload_is_rejected() {
        let ct = CancellationToken::new();
        let router = Router::new()
            .route(
                "/v1/search",
                get(|| async { Json(json!({ "results": [berlin()] })) }),
            )
            .route(
                "/v1/forecast",
                get(|| async { Json(json!({ "latitude": "not a number" })) }),
            );
        let addr = stub_server(router, ct.clone()).await;
        let base = format!("http://{addr}");

        let client = WeatherClient::with_base_urls(&base, &base);
        let error = client.fetch_current("Berlin").await.expect_err("fails");
        assert_eq!(error.to_string(), "Invalid weather data.");

        ct.cancel();
    }
}
