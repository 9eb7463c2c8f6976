use thiserror::Error;

/// Result type for doubleq operations
pub type Result<T> = std::result::Result<T, DdqnError>;

/// Main error type for the doubleq library
#[derive(Debug, Error)]
pub enum DdqnError {
    /// More records were requested than the replay buffer holds
    #[error("Insufficient data: requested {requested} records, {available} available")]
    InsufficientData { requested: usize, available: usize },

    /// A construction parameter is out of range
    #[error("Invalid configuration '{name}': {reason}")]
    InvalidConfiguration { name: String, reason: String },

    /// A vector, matrix or action index does not fit the configured dimensions
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Non-finite values produced during learning
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Misuse of the training protocol (e.g. backward without forward)
    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for DdqnError {
    fn from(err: bincode::Error) -> Self {
        DdqnError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DdqnError {
    fn from(err: serde_json::Error) -> Self {
        DdqnError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DdqnError {
    fn from(err: ndarray::ShapeError) -> Self {
        DdqnError::ShapeMismatch {
            expected: "compatible array layout".to_string(),
            actual: err.to_string(),
        }
    }
}

// Helper functions for common error patterns
impl DdqnError {
    pub fn invalid_configuration<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        DdqnError::InvalidConfiguration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch<E: ToString, A: ToString>(expected: E, actual: A) -> Self {
        DdqnError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
