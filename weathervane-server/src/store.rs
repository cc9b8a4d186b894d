// weathervane-server/src/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use weathervane_common::{FeatureRow, ServiceError};

/// Read (and optionally append to) the historical observation table.
///
/// `latest` returns up to `limit` of the most recent rows, oldest-first;
/// a short read is returned as-is and the caller decides whether that is
/// enough for a window.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn latest(&self, limit: i64) -> Result<Vec<FeatureRow>, ServiceError>;

    async fn insert(&self, city: &str, row: &FeatureRow) -> Result<(), ServiceError>;
}

/// Postgres-backed store over the `weather_data` table.
pub struct PgFeatureStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct WeatherRecord {
    recorded_at: DateTime<Utc>,
    temperature_c: f64,
    humidity_percent: f64,
    wind_speed_kmh: f64,
    pressure_hpa: f64,
    precipitation_mm: f64,
}

impl From<WeatherRecord> for FeatureRow {
    fn from(record: WeatherRecord) -> Self {
        FeatureRow {
            recorded_at: record.recorded_at,
            temperature_c: record.temperature_c,
            humidity_percent: record.humidity_percent,
            wind_speed_kmh: record.wind_speed_kmh,
            pressure_hpa: record.pressure_hpa,
            precipitation_mm: record.precipitation_mm,
        }
    }
}

impl PgFeatureStore {
    pub async fn connect(database_url: &str) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))?;
        info!("Connected to feature store");
        Ok(PgFeatureStore { pool })
    }
}

#[async_trait]
impl FeatureStore for PgFeatureStore {
    async fn latest(&self, limit: i64) -> Result<Vec<FeatureRow>, ServiceError> {
        // Rows with any missing measurement are useless to the models and
        // are filtered at the source, as the training pipeline does.
        let records = sqlx::query_as::<_, WeatherRecord>(
            r#"
            SELECT recorded_at, temperature_c, humidity_percent,
                   wind_speed_kmh, pressure_hpa, precipitation_mm
            FROM weather_data
            WHERE temperature_c IS NOT NULL
              AND humidity_percent IS NOT NULL
              AND wind_speed_kmh IS NOT NULL
              AND pressure_hpa IS NOT NULL
              AND precipitation_mm IS NOT NULL
            ORDER BY recorded_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))?;

        // Fetched newest-first; models consume oldest-first.
        let mut rows: Vec<FeatureRow> = records.into_iter().map(FeatureRow::from).collect();
        rows.reverse();
        Ok(rows)
    }

    async fn insert(&self, city: &str, row: &FeatureRow) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO weather_data (
                city, recorded_at, temperature_c, humidity_percent,
                wind_speed_kmh, pressure_hpa, precipitation_mm
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(city)
        .bind(row.recorded_at)
        .bind(row.temperature_c)
        .bind(row.humidity_percent)
        .bind(row.wind_speed_kmh)
        .bind(row.pressure_hpa)
        .bind(row.precipitation_mm)
        .execute(&self.pool)
        .await
        .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }
}
