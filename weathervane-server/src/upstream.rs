// weathervane-server/src/upstream.rs
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use weathervane_common::{FeatureRow, ServiceError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the third-party weather API. The response schema is fixed
/// by the provider; only the fields the service consumes are modeled.
#[derive(Clone)]
pub struct WeatherApi {
    client: reqwest::Client,
    base: String,
    key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub localtime: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub humidity: f64,
    pub wind_kph: f64,
    pub pressure_mb: f64,
    pub precip_mm: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub location: Location,
    pub current: Current,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub avgtemp_c: f64,
    pub maxwind_kph: f64,
    pub totalprecip_mm: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub day: DaySummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub location: Location,
    pub forecast: Forecast,
}

impl WeatherApi {
    pub fn new(base: &str, key: &str) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Unexpected(format!("cannot build HTTP client: {}", e)))?;
        Ok(WeatherApi {
            client,
            base: base.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    /// Current conditions for a city.
    pub async fn current(&self, city: &str) -> Result<CurrentResponse, ServiceError> {
        info!("Fetching current weather for {}", city);
        self.get_json("current.json", city, &[]).await
    }

    /// Day-level forecast for a city.
    pub async fn forecast(&self, city: &str, days: u8) -> Result<ForecastResponse, ServiceError> {
        info!("Fetching {}-day forecast for {}", days, city);
        let days = days.to_string();
        self.get_json("forecast.json", city, &[("days", days.as_str())]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        city: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{}", self.base, endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.key.as_str()), ("q", city), ("aqi", "no")])
            .query(extra)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::UpstreamTimeout
                } else {
                    ServiceError::UpstreamHttp {
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| String::new());
            return Err(ServiceError::UpstreamHttp {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::Unexpected(format!("invalid weather API response: {}", e))
        })
    }
}

impl CurrentResponse {
    /// Shape the observation for the feature store. The provider's local
    /// timestamp string is display-only; storage rows are stamped on
    /// arrival.
    pub fn to_feature_row(&self) -> FeatureRow {
        FeatureRow {
            recorded_at: Utc::now(),
            temperature_c: self.current.temp_c,
            humidity_percent: self.current.humidity,
            wind_speed_kmh: self.current.wind_kph,
            pressure_hpa: self.current.pressure_mb,
            precipitation_mm: self.current.precip_mm,
        }
    }
}
