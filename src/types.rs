//! Error types for Artel
//!
//! Every operation surfaces one of these variants. The first five mirror the
//! API error taxonomy (each maps to a fixed HTTP status in the routes layer);
//! the rest cover infrastructure failures.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ArtelError>;

/// Artel error type
#[derive(Error, Debug)]
pub enum ArtelError {
    /// Request payload failed validation (400)
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer token (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the action (403)
    #[error("{0}")]
    Forbidden(String),

    /// Referenced record does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Operation conflicts with current state (409)
    #[error("{0}")]
    Conflict(String),

    /// MongoDB failure
    #[error("Database error: {0}")]
    Database(String),

    /// Malformed HTTP request (unreadable or oversized body, bad JSON)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<mongodb::error::Error> for ArtelError {
    fn from(e: mongodb::error::Error) -> Self {
        ArtelError::Database(e.to_string())
    }
}

impl From<std::io::Error> for ArtelError {
    fn from(e: std::io::Error) -> Self {
        ArtelError::Internal(format!("IO error: {}", e))
    }
}

impl From<serde_json::Error> for ArtelError {
    fn from(e: serde_json::Error) -> Self {
        ArtelError::Http(format!("Invalid JSON: {}", e))
    }
}
