//! services/api/src/error.rs
//!
//! Startup errors for the account service. Request handlers map their own
//! failures to status codes and never produce these.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to PostgreSQL or running migrations failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CORS_ORIGIN '{origin}' is not a valid header value")]
    InvalidCorsOrigin { origin: String },
}
