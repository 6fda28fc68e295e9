//! Error handling module for selfserve
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Validation failures raised by the wizard live in `wizard::WizardError`; this
//! type covers everything that crosses a storage, catalog or config boundary.

use thiserror::Error;

/// Main error type for selfserve
#[derive(Error, Debug)]
pub enum SelfServeError {
    /// IO errors (state directory, catalog file, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Durable storage unavailable or rejected a key
    #[error("Storage error: {0}")]
    Storage(String),

    /// Catalog feed could not be read or parsed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Wizard step transition errors
    #[error("Step transition error: {0}")]
    Transition(String),

    /// User input rejected by a step validation rule
    #[error("Validation error: {0}")]
    Validation(String),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for selfserve operations
pub type Result<T> = std::result::Result<T, SelfServeError>;

impl SelfServeError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }
}
