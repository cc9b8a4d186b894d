// weathervane-common/src/model.rs
//
// Model artifacts and the backends that score them. Training happens in an
// offline pipeline; everything here loads read-only at startup. A bundle
// carries the scoring weights together with the normalization parameters
// fitted at training time, so inverse-transforms at serving time use the
// exact bounds the model was trained against.
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ServiceError;
use crate::feature::{FeatureKind, PredictionResult};
use crate::normalize::NormalizationParameters;
use crate::window::Window;

/// Identification stamped into every artifact by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Serialized sequence-model artifact.
///
/// `weights[k]` is the flattened affine map for output `k` over a
/// normalized `sequence_length x 5` window, timestep-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceBundle {
    pub metadata: ModelMetadata,
    pub sequence_length: usize,
    pub normalization: NormalizationParameters,
    pub outputs: Vec<FeatureKind>,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

/// Windowed predictor over a pre-trained [`SequenceBundle`].
#[derive(Debug)]
pub struct SequenceModel {
    bundle: SequenceBundle,
}

impl SequenceModel {
    /// Validate artifact shapes once; a malformed bundle should fail at
    /// startup, not on the first request.
    pub fn from_bundle(bundle: SequenceBundle) -> Result<Self, ServiceError> {
        if bundle.sequence_length == 0 {
            return Err(ServiceError::ModelInference(
                "sequence model declares a zero-length window".into(),
            ));
        }
        if bundle.outputs.is_empty() {
            return Err(ServiceError::ModelInference(
                "sequence model declares no outputs".into(),
            ));
        }
        if bundle.weights.len() != bundle.outputs.len() || bundle.bias.len() != bundle.outputs.len() {
            return Err(ServiceError::ModelInference(format!(
                "sequence model declares {} outputs but has {} weight rows and {} biases",
                bundle.outputs.len(),
                bundle.weights.len(),
                bundle.bias.len()
            )));
        }
        let expected = bundle.sequence_length * FeatureKind::ALL.len();
        for (i, row) in bundle.weights.iter().enumerate() {
            if row.len() != expected {
                return Err(ServiceError::ModelInference(format!(
                    "weight row {} has {} values, expected {}",
                    i,
                    row.len(),
                    expected
                )));
            }
        }
        Ok(SequenceModel { bundle })
    }

    /// Load a JSON bundle from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            ServiceError::Unexpected(format!("cannot read model bundle {}: {}", path.display(), e))
        })?;
        let bundle: SequenceBundle = serde_json::from_str(&data).map_err(|e| {
            ServiceError::Unexpected(format!("cannot parse model bundle {}: {}", path.display(), e))
        })?;
        debug!("Read sequence bundle from {}", path.display());
        Self::from_bundle(bundle)
    }

    pub fn id(&self) -> &str {
        &self.bundle.metadata.id
    }

    pub fn sequence_length(&self) -> usize {
        self.bundle.sequence_length
    }

    pub fn outputs(&self) -> &[FeatureKind] {
        &self.bundle.outputs
    }

    pub fn normalization(&self) -> &NormalizationParameters {
        &self.bundle.normalization
    }

    /// Score one window and return raw (inverse-transformed) values, one
    /// per declared output, in declaration order.
    pub fn score(&self, window: &Window<'_>) -> Result<Vec<f64>, ServiceError> {
        if window.len() != self.bundle.sequence_length {
            return Err(ServiceError::ModelInference(format!(
                "window has {} rows, model expects {}",
                window.len(),
                self.bundle.sequence_length
            )));
        }
        let input = self.bundle.normalization.transform_window(window);
        let mut raw = Vec::with_capacity(self.bundle.outputs.len());
        for (k, kind) in self.bundle.outputs.iter().enumerate() {
            let scaled: f64 = self.bundle.weights[k]
                .iter()
                .zip(&input)
                .map(|(w, x)| w * x)
                .sum::<f64>()
                + self.bundle.bias[k];
            raw.push(self.bundle.normalization.inverse(*kind, scaled));
        }
        Ok(raw)
    }

    /// Score one window into a response-ready [`PredictionResult`].
    pub fn predict(&self, window: &Window<'_>) -> Result<PredictionResult, ServiceError> {
        let raw = self.score(window)?;
        let mut result = PredictionResult::new(self.id());
        for (kind, value) in self.bundle.outputs.iter().zip(raw) {
            result = result.with_prediction(*kind, value);
        }
        Ok(result)
    }
}

/// One field the tabular backend expects, in order. Categorical fields
/// carry their full domain so alignment never depends on what happens to
/// be inside the loaded artifact's training frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TabularField {
    Numeric { name: String },
    Categorical { name: String, domain: Vec<String> },
}

impl TabularField {
    pub fn name(&self) -> &str {
        match self {
            TabularField::Numeric { name } => name,
            TabularField::Categorical { name, .. } => name,
        }
    }

    /// Width of this field in the encoded input vector.
    fn width(&self) -> usize {
        match self {
            TabularField::Numeric { .. } => 1,
            TabularField::Categorical { domain, .. } => domain.len(),
        }
    }
}

/// Explicit input schema for the tabular backend: ordered fields plus
/// categorical domains, loaded alongside the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularSchema {
    pub fields: Vec<TabularField>,
}

impl TabularSchema {
    fn encoded_width(&self) -> usize {
        self.fields.iter().map(TabularField::width).sum()
    }

    /// Encode a JSON object of named values into the model's input vector.
    /// Missing fields, non-numeric values, unknown categories, and fields
    /// outside the schema are all client errors.
    pub fn encode(&self, values: &Map<String, Value>) -> Result<Vec<f64>, ServiceError> {
        for key in values.keys() {
            if !self.fields.iter().any(|f| f.name() == key) {
                return Err(ServiceError::InvalidParameter(format!(
                    "unexpected field '{}'",
                    key
                )));
            }
        }
        let mut encoded = Vec::with_capacity(self.encoded_width());
        for field in &self.fields {
            let value = values.get(field.name()).ok_or_else(|| {
                ServiceError::InvalidParameter(format!("missing field '{}'", field.name()))
            })?;
            match field {
                TabularField::Numeric { name } => {
                    let number = value.as_f64().ok_or_else(|| {
                        ServiceError::InvalidParameter(format!("field '{}' must be a number", name))
                    })?;
                    encoded.push(number);
                }
                TabularField::Categorical { name, domain } => {
                    let label = value.as_str().ok_or_else(|| {
                        ServiceError::InvalidParameter(format!("field '{}' must be a string", name))
                    })?;
                    let hit = domain.iter().position(|d| d == label).ok_or_else(|| {
                        ServiceError::InvalidParameter(format!(
                            "field '{}' has unknown category '{}' (expected one of: {})",
                            name,
                            label,
                            domain.join(", ")
                        ))
                    })?;
                    for i in 0..domain.len() {
                        encoded.push(if i == hit { 1.0 } else { 0.0 });
                    }
                }
            }
        }
        Ok(encoded)
    }
}

/// Serialized tabular-model artifact (the AutoML-shaped backend).
/// Predicts its target in raw units, no normalization involved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularBundle {
    pub metadata: ModelMetadata,
    pub target: FeatureKind,
    pub schema: TabularSchema,
    pub weights: Vec<f64>,
    pub bias: f64,
}

pub struct TabularModel {
    bundle: TabularBundle,
}

impl TabularModel {
    pub fn from_bundle(bundle: TabularBundle) -> Result<Self, ServiceError> {
        let expected = bundle.schema.encoded_width();
        if bundle.weights.len() != expected {
            return Err(ServiceError::ModelInference(format!(
                "tabular model has {} weights, schema encodes {} values",
                bundle.weights.len(),
                expected
            )));
        }
        Ok(TabularModel { bundle })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            ServiceError::Unexpected(format!("cannot read model bundle {}: {}", path.display(), e))
        })?;
        let bundle: TabularBundle = serde_json::from_str(&data).map_err(|e| {
            ServiceError::Unexpected(format!("cannot parse model bundle {}: {}", path.display(), e))
        })?;
        debug!("Read tabular bundle from {}", path.display());
        Self::from_bundle(bundle)
    }

    pub fn id(&self) -> &str {
        &self.bundle.metadata.id
    }

    pub fn target(&self) -> FeatureKind {
        self.bundle.target
    }

    pub fn schema(&self) -> &TabularSchema {
        &self.bundle.schema
    }

    /// Score one named-value object into a raw prediction for the target.
    pub fn score(&self, values: &Map<String, Value>) -> Result<f64, ServiceError> {
        let encoded = self.bundle.schema.encode(values)?;
        let prediction = self
            .bundle
            .weights
            .iter()
            .zip(&encoded)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bundle.bias;
        if !prediction.is_finite() {
            return Err(ServiceError::ModelInference(
                "scoring produced a non-finite value".into(),
            ));
        }
        Ok(prediction)
    }

    pub fn predict(&self, values: &Map<String, Value>) -> Result<PredictionResult, ServiceError> {
        let raw = self.score(values)?;
        Ok(PredictionResult::new(self.id()).with_prediction(self.bundle.target, raw))
    }
}
