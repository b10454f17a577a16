//! # QR Lifecycle Rules
//!
//! The transition table for QR codes and the mutations that apply it.
//!
//! ## Transition Table
//! ```text
//! ┌──────────────┬──────────────────────────────────────┬──────────────┐
//! │ Action       │ From                                 │ To           │
//! ├──────────────┼──────────────────────────────────────┼──────────────┤
//! │ Allocate     │ unallocated                          │ allocated    │
//! │ AssignUser   │ allocated                            │ allocated    │
//! │ Issue        │ allocated                            │ issued       │
//! │ Return       │ issued                               │ returned     │
//! │ Block        │ unallocated, allocated, issued,      │ blocked      │
//! │              │ returned                             │              │
//! │ Revoke       │ issued                               │ allocated    │
//! │ Retire       │ unallocated, returned, blocked       │ retired      │
//! └──────────────┴──────────────────────────────────────┴──────────────┘
//! ```
//!
//! Anything not in the table is refused with [`CoreError::InvalidTransition`]
//! before a single field is touched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{KycStatus, Merchant, QrCode, QrStatus, QrType, ReturnCondition, User};
use crate::validation::{validate_reason, ValidationResult};

/// Operations that move a QR code through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrAction {
    Allocate,
    AssignUser,
    Issue,
    Return,
    Block,
    Revoke,
    Retire,
}

impl QrAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QrAction::Allocate => "allocate",
            QrAction::AssignUser => "assign to user",
            QrAction::Issue => "issue",
            QrAction::Return => "return",
            QrAction::Block => "block",
            QrAction::Revoke => "revoke",
            QrAction::Retire => "retire",
        }
    }
}

impl std::fmt::Display for QrAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up the transition table.
///
/// Returns the status the code ends up in, or `None` if the action is not
/// allowed from `from`.
pub const fn next_status(from: QrStatus, action: QrAction) -> Option<QrStatus> {
    use QrStatus::*;

    match (action, from) {
        (QrAction::Allocate, Unallocated) => Some(Allocated),
        (QrAction::AssignUser, Allocated) => Some(Allocated),
        (QrAction::Issue, Allocated) => Some(Issued),
        (QrAction::Return, Issued) => Some(Returned),
        (QrAction::Block, Unallocated | Allocated | Issued | Returned) => Some(Blocked),
        (QrAction::Revoke, Issued) => Some(Allocated),
        (QrAction::Retire, Unallocated | Returned | Blocked) => Some(Retired),
        _ => None,
    }
}

/// Checks whether `action` is allowed for a code in `from`.
pub const fn can_apply(from: QrStatus, action: QrAction) -> bool {
    next_status(from, action).is_some()
}

impl QrCode {
    /// Validates the transition and returns the target status.
    fn check(&self, action: QrAction) -> CoreResult<QrStatus> {
        next_status(self.status, action)
            .ok_or_else(|| CoreError::invalid_transition("QR code", &self.id, self.status, action))
    }

    /// Moves an unallocated code into a branch's inventory.
    pub fn allocate(&mut self, branch_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let next = self.check(QrAction::Allocate)?;
        self.status = next;
        self.allocated_branch_id = Some(branch_id.to_string());
        self.allocated_to_user_id = None;
        self.allocated_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Hands an allocated code to a user of the same branch.
    pub fn assign_to_user(&mut self, user: &User, now: DateTime<Utc>) -> CoreResult<()> {
        let next = self.check(QrAction::AssignUser)?;
        if !user.is_active {
            return Err(CoreError::InactiveUser(user.id.clone()));
        }
        self.ensure_same_branch("User", &user.id, user.branch_id.as_deref())?;

        self.status = next;
        self.allocated_to_user_id = Some(user.id.clone());
        self.updated_at = now;
        Ok(())
    }

    /// Issues an allocated code to a merchant.
    ///
    /// ## Preconditions
    /// - Code is `allocated` and sits in a branch
    /// - Merchant KYC is `verified` (when `require_verified_kyc`)
    /// - A merchant attached to a branch can only get that branch's codes
    pub fn issue(
        &mut self,
        merchant: &Merchant,
        issued_by: &str,
        require_verified_kyc: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let next = self.check(QrAction::Issue)?;

        let branch_id = self.allocated_branch_id.clone().ok_or_else(|| {
            CoreError::invalid_transition("QR code", &self.id, "not in any branch", QrAction::Issue)
        })?;

        if require_verified_kyc && merchant.kyc_status != KycStatus::Verified {
            return Err(CoreError::KycNotVerified {
                merchant_id: merchant.id.clone(),
                status: merchant.kyc_status.to_string(),
            });
        }

        if let Some(merchant_branch) = merchant.branch_id.as_deref() {
            if merchant_branch != branch_id {
                return Err(CoreError::BranchMismatch {
                    entity: "Merchant",
                    id: merchant.id.clone(),
                    expected: branch_id,
                    actual: merchant_branch.to_string(),
                });
            }
        }

        self.status = next;
        self.issued_to_merchant_id = Some(merchant.id.clone());
        self.issued_by = Some(issued_by.to_string());
        self.issued_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records a merchant handing the code back.
    pub fn mark_returned(
        &mut self,
        reason: &str,
        condition: ReturnCondition,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let next = self.check(QrAction::Return)?;
        validate_reason("return reason", reason)?;

        self.status = next;
        self.return_reason = Some(reason.trim().to_string());
        self.return_condition = Some(condition);
        self.returned_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Blocks the code. Allowed from any live status.
    pub fn block(&mut self, reason: &str, blocked_by: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let next = self.check(QrAction::Block)?;
        validate_reason("block reason", reason)?;

        self.status = next;
        self.blocked_reason = Some(reason.trim().to_string());
        self.blocked_by = Some(blocked_by.to_string());
        self.blocked_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Pulls an issued code back into its branch's inventory.
    ///
    /// Used when the user who handled the issuance is no longer valid.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        let next = self.check(QrAction::Revoke)?;

        self.status = next;
        self.issued_to_merchant_id = None;
        self.issued_by = None;
        self.issued_at = None;
        self.allocated_to_user_id = None;
        self.updated_at = now;
        Ok(())
    }

    /// Takes the code out of circulation for good.
    pub fn retire(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        let next = self.check(QrAction::Retire)?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Clears a user assignment without changing status.
    pub fn clear_user(&mut self, now: DateTime<Utc>) {
        self.allocated_to_user_id = None;
        self.updated_at = now;
    }

    fn ensure_same_branch(
        &self,
        entity: &'static str,
        id: &str,
        other_branch: Option<&str>,
    ) -> CoreResult<()> {
        let expected = self.allocated_branch_id.as_deref().unwrap_or_default();
        match other_branch {
            Some(branch) if branch == expected => Ok(()),
            other => Err(CoreError::BranchMismatch {
                entity,
                id: id.to_string(),
                expected: expected.to_string(),
                actual: other.unwrap_or("none").to_string(),
            }),
        }
    }
}

/// Builds a generated QR value: `{prefix}-{S|D}-{YYYYMMDD}-{seq:06}`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use qrdesk_core::lifecycle::format_qr_value;
/// use qrdesk_core::QrType;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// assert_eq!(format_qr_value("BNK", QrType::Dynamic, date, 42), "BNK-D-20240309-000042");
/// ```
pub fn format_qr_value(prefix: &str, qr_type: QrType, date: NaiveDate, seq: u32) -> String {
    format!("{}-{}-{}-{:06}", prefix, qr_type.code(), date.format("%Y%m%d"), seq)
}

/// The part of a generated value before the sequence number, used to find
/// the next free sequence for a day.
pub fn qr_value_stem(prefix: &str, qr_type: QrType, date: NaiveDate) -> String {
    format!("{}-{}-{}-", prefix, qr_type.code(), date.format("%Y%m%d"))
}

/// Highest sequence a generated value can carry (six digits).
pub const MAX_QR_SEQUENCE: u32 = 999_999;

/// Sequences for the next `count` generated codes after `last`.
///
/// Fails when the day's six-digit sequence space cannot hold the batch.
///
/// ```rust
/// use qrdesk_core::lifecycle::next_sequences;
///
/// assert_eq!(next_sequences(226, 4).unwrap(), 227..=230);
/// assert!(next_sequences(999_998, 2).is_err());
/// ```
pub fn next_sequences(last: u32, count: u32) -> ValidationResult<std::ops::RangeInclusive<u32>> {
    let end = last
        .checked_add(count)
        .filter(|end| *end <= MAX_QR_SEQUENCE)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "sequence".to_string(),
            min: 1,
            max: i64::from(MAX_QR_SEQUENCE),
        })?;
    Ok(last + 1..=end)
}

/// Decides whether a QR code's user assignment is still valid.
///
/// An assignment is stale when the user is gone, inactive, or has moved to
/// another branch.
pub fn assignment_is_stale(qr: &QrCode, user: Option<&User>) -> bool {
    if qr.allocated_to_user_id.is_none() {
        return false;
    }
    match user {
        None => true,
        Some(user) => !user.is_active || user.branch_id != qr.allocated_branch_id,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
