// weathervane-common/src/feature.rs
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// The five measurements a model can predict.
///
/// Query values (`temperature`, `humidity`, ...) are what callers put in
/// `?type=`; each kind also knows its storage column and the key it uses
/// in prediction responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Temperature,
    Humidity,
    Wind,
    Pressure,
    Precipitation,
}

impl FeatureKind {
    /// All kinds, in storage column order. This is also the order of
    /// `FeatureRow::values` and of every feature matrix.
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::Temperature,
        FeatureKind::Humidity,
        FeatureKind::Wind,
        FeatureKind::Pressure,
        FeatureKind::Precipitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Temperature => "temperature",
            FeatureKind::Humidity => "humidity",
            FeatureKind::Wind => "wind",
            FeatureKind::Pressure => "pressure",
            FeatureKind::Precipitation => "precipitation",
        }
    }

    /// Column name in the `weather_data` table.
    pub fn column(&self) -> &'static str {
        match self {
            FeatureKind::Temperature => "temperature_c",
            FeatureKind::Humidity => "humidity_percent",
            FeatureKind::Wind => "wind_speed_kmh",
            FeatureKind::Pressure => "pressure_hpa",
            FeatureKind::Precipitation => "precipitation_mm",
        }
    }

    /// Key used for this kind in a prediction response body.
    pub fn response_key(&self) -> String {
        format!("predicted_{}", self.column())
    }

    /// Index of this kind within [`FeatureKind::ALL`].
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    /// The accepted `?type=` values, for error responses.
    pub fn valid_types() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ServiceError::InvalidParameter(format!("unknown prediction type '{}'", s)))
    }
}

/// One observation read from storage. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub recorded_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
    pub pressure_hpa: f64,
    pub precipitation_mm: f64,
}

impl FeatureRow {
    /// Measurements in [`FeatureKind::ALL`] order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.temperature_c,
            self.humidity_percent,
            self.wind_speed_kmh,
            self.pressure_hpa,
            self.precipitation_mm,
        ]
    }

    pub fn value(&self, kind: FeatureKind) -> f64 {
        self.values()[kind.index()]
    }
}

/// One served prediction: predicted value per response key, plus the model
/// that produced it and when. Built fresh per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub predictions: BTreeMap<String, f64>,
}

impl PredictionResult {
    pub fn new(model: impl Into<String>) -> Self {
        PredictionResult {
            model: model.into(),
            generated_at: Utc::now(),
            predictions: BTreeMap::new(),
        }
    }

    pub fn with_prediction(mut self, kind: FeatureKind, value: f64) -> Self {
        self.predictions.insert(kind.response_key(), value);
        self
    }

    pub fn get(&self, kind: FeatureKind) -> Option<f64> {
        self.predictions.get(&kind.response_key()).copied()
    }
}
