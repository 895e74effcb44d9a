//! # Error Taxonomy
//!
//! The error classes shared across the engine. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! ## Propagation policy
//!
//! - Validation errors are rejected at the boundary and never reach the
//!   engine's mutation paths.
//! - Conflict and not-found errors are surfaced to the caller for retry or
//!   user feedback.
//! - Integrity and upstream errors are logged and surfaced as job failures
//!   (exports) or request failures (reads). The engine never swallows an
//!   error that would leave cached status or the audit trail inconsistent
//!   with the actual evidence.

use thiserror::Error;

/// Top-level error type for AccrediVault.
#[derive(Error, Debug)]
pub enum AvError {
    /// Entity absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent transition collision or duplicate that cannot be merged.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing required fields, invalid date ranges, malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Accessing an export artifact before the job completed.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Content hash mismatch on read — storage corruption.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Blob store or queue unavailable.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// State machine transition rejected.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvError {
    /// Machine-readable error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotReady(_) => "NOT_READY",
            Self::Integrity(_) => "INTEGRITY_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::Canonicalization(_) => "CANONICALIZATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations; they have
    /// non-deterministic JCS serialization edge cases. Use strings or integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
