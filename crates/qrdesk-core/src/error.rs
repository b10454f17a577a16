//! # Error Types
//!
//! Domain-specific error types for qrdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  qrdesk-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  qrdesk-store errors (separate crate)                                  │
//! │  └── StoreError       - Lookup / uniqueness / snapshot failures        │
//! │                                                                         │
//! │  qrdesk-service errors                                                 │
//! │  └── ServiceError     - What callers see ({ code, message })           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → ServiceError         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::policy::Permission;
use crate::types::Role;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The entity is not in a state that allows the requested action.
    ///
    /// ## When This Occurs
    /// - Issuing a QR code that is already issued
    /// - Approving a request that was already rejected
    /// - Returning a QR code that was never issued
    #[error("{entity} {id} is {from}, cannot {action}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        action: String,
    },

    /// Not enough unallocated QR codes to satisfy an allocation.
    ///
    /// ## User Workflow
    /// ```text
    /// Approve request (qty: 50)
    ///      │
    ///      ▼
    /// Check pool: unallocated=30
    ///      │
    ///      ▼
    /// InsufficientInventory { available: 30, requested: 50 }
    ///      │
    ///      ▼
    /// Request stays pending, no QR code changes
    /// ```
    #[error("Only {available} unallocated QR codes available, {requested} requested")]
    InsufficientInventory { available: usize, requested: usize },

    /// A merchant already has an undecided KYC request.
    #[error("A KYC request is already pending for this merchant ({merchant_id})")]
    KycAlreadyPending { merchant_id: String },

    /// QR issuance to a merchant whose KYC is not verified.
    #[error("Merchant {merchant_id} KYC status is {status}, QR codes can only be issued to verified merchants")]
    KycNotVerified { merchant_id: String, status: String },

    /// Two entities that must share a branch do not.
    #[error("{entity} {id} belongs to branch {actual}, expected {expected}")]
    BranchMismatch {
        entity: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    /// The acting role does not hold the permission.
    #[error("Role {role} is not permitted to {permission}")]
    PermissionDenied { role: Role, permission: Permission },

    /// A branch-scoped user tried to touch another branch.
    #[error("User {user_id} cannot act on branch {branch_id}")]
    OutOfScope { user_id: String, branch_id: String },

    /// Someone other than the initiator tried to edit or cancel a request.
    #[error("Only the requester can change {entity} {id}")]
    NotRequester { entity: &'static str, id: String },

    /// The acting user is deactivated.
    #[error("User {0} is inactive")]
    InactiveUser(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidTransition error.
    pub fn invalid_transition(
        entity: &'static str,
        id: impl Into<String>,
        from: impl ToString,
        action: impl ToString,
    ) -> Self {
        CoreError::InvalidTransition {
            entity,
            id: id.into(),
            from: from.to_string(),
            action: action.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business rules run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad email, bad branch code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., the same QR value twice in one upload).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
