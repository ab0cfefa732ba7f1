//! Domain-level error types.
//!
//! These errors are transport agnostic: the in-process consumer (an HTTP
//! layer, a CLI, a test) maps the stable code to whatever envelope it
//! speaks. Every mutating operation reports a specific, actionable reason.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::StoreError;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A referenced id does not exist in the targeted collection.
    NotFound,
    /// A required field is missing or out of its declared range.
    Validation,
    /// A uniqueness invariant would be violated.
    Duplicate,
    /// No copies available for checkout.
    CapacityExceeded,
    /// Per-user active-checkout ceiling reached.
    LimitExceeded,
    /// A backing file exists but cannot be parsed.
    StorageCorruption,
    /// The actor's role does not permit the operation.
    Forbidden,
    /// An unexpected failure inside the core.
    Internal,
}

/// Domain error payload: stable code, actionable message, optional
/// structured details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// Stable machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable, actionable message.
    pub message: String,
    /// Supplementary structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Error {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Convenience constructor for [`ErrorCode::Duplicate`].
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Duplicate, message)
    }

    /// Convenience constructor for [`ErrorCode::CapacityExceeded`].
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CapacityExceeded, message)
    }

    /// Convenience constructor for [`ErrorCode::LimitExceeded`].
    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LimitExceeded, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { ref path, .. } => Self::new(
                ErrorCode::StorageCorruption,
                format!("collection store at {} is corrupt", path.display()),
            )
            .with_details(serde_json::json!({ "source": err.to_string() })),
            StoreError::Io { .. } => Self::internal(err.to_string()),
        }
    }
}
