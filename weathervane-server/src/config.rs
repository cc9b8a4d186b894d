// weathervane-server/src/config.rs
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

// Defaults mirror the prototype deployment.
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CITY: &str = "Nairobi";
const DEFAULT_API_BASE: &str = "http://api.weatherapi.com/v1";
const DEFAULT_CACHE_TTL_SECS: u64 = 1800;
const DEFAULT_HISTORY_LIMIT: i64 = 30;
const DEFAULT_COUNTER_FILE: &str = "api_counter.json";
const DEFAULT_MONTHLY_LIMIT: u32 = 999_999;
const DEFAULT_SEQUENCE_BUNDLE: &str = "models/sequence_model.json";
const DEFAULT_TABULAR_BUNDLE: &str = "models/tabular_model.json";

/// Service configuration, collected once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub weather_api_key: String,
    pub weather_api_base: String,
    pub default_city: String,
    pub database_url: String,
    pub sequence_bundle: PathBuf,
    pub tabular_bundle: PathBuf,
    pub cache_ttl: Duration,
    pub history_limit: i64,
    pub counter_file: PathBuf,
    pub monthly_call_limit: u32,
    pub persist_observations: bool,
}

impl Config {
    /// Read configuration from environment variables. The API key and the
    /// database URL have no sensible defaults and are required.
    pub fn from_env() -> Result<Self, Box<dyn Error + Send + Sync>> {
        let weather_api_key = env::var("WEATHER_API_KEY")
            .map_err(|_| "WEATHER_API_KEY is not set")?;
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set")?;

        Ok(Config {
            port: parse_var("PORT", DEFAULT_PORT)?,
            weather_api_key,
            weather_api_base: env::var("WEATHER_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            default_city: env::var("DEFAULT_CITY").unwrap_or_else(|_| DEFAULT_CITY.to_string()),
            database_url,
            sequence_bundle: env::var("SEQUENCE_MODEL_PATH")
                .unwrap_or_else(|_| DEFAULT_SEQUENCE_BUNDLE.to_string())
                .into(),
            tabular_bundle: env::var("TABULAR_MODEL_PATH")
                .unwrap_or_else(|_| DEFAULT_TABULAR_BUNDLE.to_string())
                .into(),
            cache_ttl: Duration::from_secs(parse_var("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?),
            history_limit: parse_var("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            counter_file: env::var("COUNTER_FILE")
                .unwrap_or_else(|_| DEFAULT_COUNTER_FILE.to_string())
                .into(),
            monthly_call_limit: parse_var("MONTHLY_CALL_LIMIT", DEFAULT_MONTHLY_LIMIT)?,
            persist_observations: parse_var("PERSIST_OBSERVATIONS", false)?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, Box<dyn Error + Send + Sync>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| format!("invalid {}: {}", name, e).into()),
        Err(_) => Ok(default),
    }
}
