// weathervane-common/src/lib.rs
//
// Shared core for the weathervane service: the feature data model, the
// window builder, min-max normalization, pre-trained model backends, the
// TTL cache, and the error taxonomy. The server wires these together;
// the client reuses only the wire-facing types.

// Define modules
pub mod cache;
pub mod error;
pub mod feature;
pub mod model;
pub mod normalize;
pub mod window;

// Re-export for convenience
pub use cache::TtlCache;
pub use error::ServiceError;
pub use feature::{FeatureKind, FeatureRow, PredictionResult};
pub use model::{
    ModelMetadata, SequenceBundle, SequenceModel, TabularBundle, TabularField, TabularModel,
    TabularSchema,
};
pub use normalize::NormalizationParameters;
pub use window::{latest_window, windows, Window};

/// Number of measurements per observation.
pub const FEATURE_COUNT: usize = FeatureKind::ALL.len();
