// weathervane-common/src/error.rs
use thiserror::Error;

/// Error taxonomy shared by every component. The serving layer translates
/// these into HTTP statuses; nothing here is retried and nothing is fatal
/// to the running process.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upstream weather API did not answer within its deadline.
    #[error("the weather service did not respond in time")]
    UpstreamTimeout,

    /// The upstream weather API answered with a non-success status.
    #[error("weather service error ({status}): {message}")]
    UpstreamHttp { status: u16, message: String },

    /// The feature store connection could not be established or the query failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Fewer rows exist than a prediction window requires.
    #[error("not enough data to make a prediction ({available} of {required} rows)")]
    InsufficientData { available: usize, required: usize },

    /// The caller sent a parameter or body we cannot use.
    #[error("{0}")]
    InvalidParameter(String),

    /// The monthly upstream call budget is spent.
    #[error("monthly request limit reached ({count}/{limit})")]
    QuotaExceeded { limit: u32, count: u32 },

    /// The model scored but something about the input or artifact is wrong.
    #[error("model inference failed: {0}")]
    ModelInference(String),

    /// Catch-all for failures outside the taxonomy.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    /// True for errors the client caused (400-class at the boundary).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InsufficientData { .. } | ServiceError::InvalidParameter(_)
        )
    }
}
