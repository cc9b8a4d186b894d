// weathervane-common/src/normalize.rs
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::feature::{FeatureKind, FeatureRow};
use crate::window::Window;

/// Per-feature (min, max) bounds for min-max scaling.
///
/// Fitted once from the training batch and persisted inside the model
/// bundle; serving loads the bounds read-only and never re-fits them, so
/// "normalized" means the same thing at training and inference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParameters {
    bounds: [(f64, f64); 5],
}

impl NormalizationParameters {
    /// Compute per-feature bounds from a reference batch.
    pub fn fit(rows: &[FeatureRow]) -> Result<Self, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::InvalidParameter(
                "cannot fit normalization parameters on an empty batch".into(),
            ));
        }
        let mut bounds = [(f64::INFINITY, f64::NEG_INFINITY); 5];
        for row in rows {
            for (i, value) in row.values().iter().enumerate() {
                bounds[i].0 = bounds[i].0.min(*value);
                bounds[i].1 = bounds[i].1.max(*value);
            }
        }
        Ok(NormalizationParameters { bounds })
    }

    pub fn bounds(&self, kind: FeatureKind) -> (f64, f64) {
        self.bounds[kind.index()]
    }

    /// Map one value into [0, 1]. A degenerate feature (max == min) maps
    /// to 0.0, matching the scaler the training pipeline used.
    pub fn scale(&self, kind: FeatureKind, value: f64) -> f64 {
        let (min, max) = self.bounds(kind);
        let range = max - min;
        if range == 0.0 {
            0.0
        } else {
            (value - min) / range
        }
    }

    /// Undo [`scale`](Self::scale) for one output component.
    pub fn inverse(&self, kind: FeatureKind, scaled: f64) -> f64 {
        let (min, max) = self.bounds(kind);
        scaled * (max - min) + min
    }

    /// Scale one row into column-order normalized values.
    pub fn transform_row(&self, row: &FeatureRow) -> [f64; 5] {
        let mut out = [0.0; 5];
        for (i, kind) in FeatureKind::ALL.iter().enumerate() {
            out[i] = self.scale(*kind, row.value(*kind));
        }
        out
    }

    /// Flatten a window into a single normalized input vector,
    /// timestep-major (`len * 5` values).
    pub fn transform_window(&self, window: &Window<'_>) -> Vec<f64> {
        window
            .rows()
            .iter()
            .flat_map(|row| self.transform_row(row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(t: f64, h: f64, w: f64, p: f64, r: f64) -> FeatureRow {
        FeatureRow {
            recorded_at: Utc::now(),
            temperature_c: t,
            humidity_percent: h,
            wind_speed_kmh: w,
            pressure_hpa: p,
            precipitation_mm: r,
        }
    }

    #[test]
    fn fit_rejects_empty_batch() {
        let err = NormalizationParameters::fit(&[]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParameter(_)));
    }

    #[test]
    fn transform_maps_bounds_to_unit_interval() {
        let rows = vec![row(10.0, 40.0, 0.0, 1000.0, 0.0), row(30.0, 80.0, 20.0, 1020.0, 8.0)];
        let params = NormalizationParameters::fit(&rows).unwrap();
        assert_eq!(params.scale(FeatureKind::Temperature, 10.0), 0.0);
        assert_eq!(params.scale(FeatureKind::Temperature, 30.0), 1.0);
        assert!((params.scale(FeatureKind::Temperature, 20.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn inverse_undoes_transform_within_tolerance() {
        let rows = vec![row(-5.0, 30.0, 2.0, 990.0, 0.1), row(35.0, 95.0, 45.0, 1035.0, 12.0)];
        let params = NormalizationParameters::fit(&rows).unwrap();
        let sample = row(17.3, 61.2, 9.8, 1011.4, 3.3);
        for kind in FeatureKind::ALL {
            let raw = sample.value(kind);
            let back = params.inverse(kind, params.scale(kind, raw));
            assert!((back - raw).abs() < 1e-6, "{}: {} != {}", kind, back, raw);
        }
    }

    #[test]
    fn degenerate_feature_scales_to_zero_and_inverts_to_min() {
        let rows = vec![row(20.0, 50.0, 10.0, 1013.0, 0.0), row(25.0, 50.0, 12.0, 1013.0, 0.0)];
        let params = NormalizationParameters::fit(&rows).unwrap();
        assert_eq!(params.scale(FeatureKind::Humidity, 50.0), 0.0);
        assert_eq!(params.inverse(FeatureKind::Humidity, 0.0), 50.0);
    }

    #[test]
    fn parameters_round_trip_through_json() {
        let rows = vec![row(10.0, 40.0, 0.0, 1000.0, 0.0), row(30.0, 80.0, 20.0, 1020.0, 8.0)];
        let params = NormalizationParameters::fit(&rows).unwrap();
        let json = serde_json::to_string(&params).unwrap();
        let restored: NormalizationParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, params);
    }
}
