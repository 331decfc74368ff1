//! Huginn error types
//!
//! Recording itself is best-effort and never surfaces errors to the caller.
//! These variants cover construction, configuration loading, serving, and
//! the query endpoint's internal failures.

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
