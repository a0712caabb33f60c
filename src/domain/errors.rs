//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The API layer maps each variant to an HTTP status code.

use std::fmt;

#[derive(Debug)]
pub enum ServiceError {
    /// Referenced record does not exist
    NotFound,
    /// Client-side validation failure (empty field, mismatched passwords, ...)
    Validation(String),
    /// Unique constraint hit (email or phone already registered)
    Duplicate(String),
    /// Bad credentials
    Unauthorized,
    /// Actor is not allowed to perform this transition
    Forbidden(String),
    /// Operation not valid for the record's current status
    InvalidState(String),
    /// Image could not be stored
    Upload(String),
    /// Database/persistence error
    Database(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound => write!(f, "Resource not found"),
            ServiceError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::Duplicate(msg) => write!(f, "Duplicate: {}", msg),
            ServiceError::Unauthorized => write!(f, "Invalid credentials"),
            ServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServiceError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            ServiceError::Upload(msg) => write!(f, "Upload error: {}", msg),
            ServiceError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

// Uniqueness is enforced by the storage layer (UNIQUE columns), so a
// constraint violation surfaces here as a Duplicate rather than a generic
// database failure. SQLite reports the offending column in the message.
impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint failed") {
            if msg.contains("users.email") {
                ServiceError::Duplicate("email already registered".to_string())
            } else if msg.contains("users.phone") {
                ServiceError::Duplicate("phone already registered".to_string())
            } else {
                ServiceError::Duplicate(msg)
            }
        } else {
            ServiceError::Database(msg)
        }
    }
}
