//! # Service Error Type
//!
//! The error every service operation returns.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in QR Desk                                │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► StoreError ──► ServiceError          │
//! │  (bad input)         (rule)        (lookup,        { code, message }    │
//! │                                     uniqueness)                         │
//! │                                                                         │
//! │  try {                                                                  │
//! │    await api.approveRequest(actorId, requestId)                         │
//! │  } catch (e) {                                                          │
//! │    // e.code    = "INSUFFICIENT_INVENTORY"                              │
//! │    // e.message = "Only 12 unallocated QR codes available, 25 requested"│
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is scoped to the one call that raised it.

use std::path::PathBuf;

use qrdesk_core::{CoreError, ValidationError};
use qrdesk_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Error returned from every service operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "QrCode not found: 3f2a..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown id
    NotFound,

    /// Input failed validation
    ValidationError,

    /// Role, branch scope or inactive account refused the call
    Forbidden,

    /// Entity state or uniqueness conflict
    Conflict,

    /// Pool too small for an allocation
    InsufficientInventory,

    /// Any other business rule refusal
    BusinessRule,

    /// Unexpected failure
    Internal,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InvalidTransition { .. } | CoreError::KycAlreadyPending { .. } => {
                ErrorCode::Conflict
            }
            CoreError::InsufficientInventory { .. } => ErrorCode::InsufficientInventory,
            CoreError::KycNotVerified { .. } | CoreError::BranchMismatch { .. } => {
                ErrorCode::BusinessRule
            }
            CoreError::PermissionDenied { .. }
            | CoreError::OutOfScope { .. }
            | CoreError::InactiveUser(_)
            | CoreError::NotRequester { .. } => ErrorCode::Forbidden,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ServiceError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::validation(err.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServiceError::new(ErrorCode::NotFound, err.to_string()),
            StoreError::Duplicate { .. } => ServiceError::new(ErrorCode::Conflict, err.to_string()),
            StoreError::Snapshot(msg) => {
                // Log the cause, hand the caller a generic message
                tracing::error!("Store snapshot failed: {}", msg);
                ServiceError::internal("Store snapshot failed")
            }
            StoreError::Core(core) => core.into(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Config Error
// =============================================================================

/// Failures while loading [`crate::ServiceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
