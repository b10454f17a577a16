//! # Approval Workflows
//!
//! State machines for allocation requests, merchant requests and KYC
//! requests.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            ┌──── update ────┐                                          │
//! │            ▼                │                                          │
//! │  submit ─► PENDING ── return ──► RETURNED_FOR_CORRECTION               │
//! │            │    │                       │                              │
//! │      approve    reject             cancel                              │
//! │            │    │                       │                              │
//! │            ▼    ▼                       ▼                              │
//! │       APPROVED  REJECTED            CANCELLED ◄── cancel (pending)     │
//! │                                                                         │
//! │  Decided requests (approved / rejected / cancelled) never move again.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Approving a request only flips its state here. The bulk allocation that
//! comes with approval runs in the store, inside the same transaction.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    AllocationRequest, KycRequest, KycRequestStatus, KycStatus, Merchant, MerchantRequest,
    RequestNote, RequestStatus, Review, ReviewAction,
};
use crate::validation::validate_reason;

// =============================================================================
// Request State Machine
// =============================================================================

/// Looks up the request transition table.
pub const fn next_request_status(from: RequestStatus, action: ReviewAction) -> Option<RequestStatus> {
    use RequestStatus::*;

    match (action, from) {
        (ReviewAction::Approved, Pending) => Some(Approved),
        (ReviewAction::Rejected, Pending) => Some(Rejected),
        (ReviewAction::ReturnedForCorrection, Pending) => Some(ReturnedForCorrection),
        (ReviewAction::Updated, Pending | ReturnedForCorrection) => Some(Pending),
        (ReviewAction::Cancelled, Pending | ReturnedForCorrection) => Some(Cancelled),
        _ => None,
    }
}

fn action_verb(action: ReviewAction) -> &'static str {
    match action {
        ReviewAction::Submitted => "submit",
        ReviewAction::Updated => "update",
        ReviewAction::Approved => "approve",
        ReviewAction::Rejected => "reject",
        ReviewAction::ReturnedForCorrection => "return for correction",
        ReviewAction::Cancelled => "cancel",
    }
}

/// Anything that goes through the single-approver review flow.
pub trait Reviewable {
    /// Entity name used in errors and audit logs.
    const KIND: &'static str;

    fn request_id(&self) -> &str;
    fn branch_id(&self) -> &str;
    fn requested_by(&self) -> &str;
    fn review(&self) -> &Review;
    fn review_mut(&mut self) -> &mut Review;
    fn touch(&mut self, now: DateTime<Utc>);

    fn status(&self) -> RequestStatus {
        self.review().status
    }
}

impl Reviewable for AllocationRequest {
    const KIND: &'static str = "AllocationRequest";

    fn request_id(&self) -> &str {
        &self.id
    }
    fn branch_id(&self) -> &str {
        &self.branch_id
    }
    fn requested_by(&self) -> &str {
        &self.requested_by
    }
    fn review(&self) -> &Review {
        &self.review
    }
    fn review_mut(&mut self) -> &mut Review {
        &mut self.review
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Reviewable for MerchantRequest {
    const KIND: &'static str = "MerchantRequest";

    fn request_id(&self) -> &str {
        &self.id
    }
    fn branch_id(&self) -> &str {
        &self.branch_id
    }
    fn requested_by(&self) -> &str {
        &self.requested_by
    }
    fn review(&self) -> &Review {
        &self.review
    }
    fn review_mut(&mut self) -> &mut Review {
        &mut self.review
    }
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Only the user who raised a request may edit or cancel it.
pub fn ensure_requester<R: Reviewable>(request: &R, user_id: &str) -> CoreResult<()> {
    if request.requested_by() != user_id {
        return Err(CoreError::NotRequester {
            entity: R::KIND,
            id: request.request_id().to_string(),
        });
    }
    Ok(())
}

/// Checks a transition without applying it.
pub fn ensure_transition<R: Reviewable>(request: &R, action: ReviewAction) -> CoreResult<RequestStatus> {
    next_request_status(request.status(), action).ok_or_else(|| {
        CoreError::invalid_transition(
            R::KIND,
            request.request_id(),
            request.status(),
            action_verb(action),
        )
    })
}

fn apply<R: Reviewable>(
    request: &mut R,
    action: ReviewAction,
    author_id: &str,
    text: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let next = ensure_transition(request, action)?;
    let decided = matches!(action, ReviewAction::Approved | ReviewAction::Rejected);

    let review = request.review_mut();
    review.status = next;
    if decided {
        review.approver_id = Some(author_id.to_string());
        review.decided_at = Some(now);
    }
    review.history.push(RequestNote {
        author_id: author_id.to_string(),
        action,
        text: text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        at: now,
    });
    request.touch(now);
    Ok(())
}

/// Approves a pending request. Notes are optional.
pub fn approve<R: Reviewable>(
    request: &mut R,
    approver_id: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    apply(request, ReviewAction::Approved, approver_id, notes, now)
}

/// Rejects a pending request. A reason is required.
pub fn reject<R: Reviewable>(
    request: &mut R,
    approver_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    validate_reason("rejection reason", reason)?;
    apply(request, ReviewAction::Rejected, approver_id, Some(reason.to_string()), now)
}

/// Sends a pending request back to its initiator. Notes are required so the
/// initiator knows what to fix.
pub fn return_for_correction<R: Reviewable>(
    request: &mut R,
    approver_id: &str,
    notes: &str,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    validate_reason("correction notes", notes)?;
    apply(
        request,
        ReviewAction::ReturnedForCorrection,
        approver_id,
        Some(notes.to_string()),
        now,
    )
}

/// Records an initiator's edit and puts the request back to pending.
pub fn resubmit<R: Reviewable>(
    request: &mut R,
    author_id: &str,
    note: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    apply(request, ReviewAction::Updated, author_id, note, now)
}

/// Withdraws an open request.
pub fn cancel<R: Reviewable>(
    request: &mut R,
    author_id: &str,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    apply(request, ReviewAction::Cancelled, author_id, reason, now)
}

// =============================================================================
// KYC
// =============================================================================

/// Refuses a new submission while the merchant has one pending.
pub fn ensure_no_pending_kyc<'a>(
    existing: impl IntoIterator<Item = &'a KycRequest>,
    merchant_id: &str,
) -> CoreResult<()> {
    let pending = existing
        .into_iter()
        .any(|req| req.merchant_id == merchant_id && req.status == KycRequestStatus::Pending);

    if pending {
        return Err(CoreError::KycAlreadyPending {
            merchant_id: merchant_id.to_string(),
        });
    }
    Ok(())
}

impl KycRequest {
    fn ensure_pending(&self, action: &str) -> CoreResult<()> {
        if self.status != KycRequestStatus::Pending {
            return Err(CoreError::invalid_transition(
                "KYC request",
                &self.id,
                self.status,
                action,
            ));
        }
        Ok(())
    }

    /// Approves the request and marks the merchant verified.
    ///
    /// Only the merchant row changes; QR codes are never touched here.
    pub fn approve(
        &mut self,
        merchant: &mut Merchant,
        reviewer_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_pending("approve")?;
        self.status = KycRequestStatus::Approved;
        self.reviewer_id = Some(reviewer_id.to_string());
        self.review_notes = notes.filter(|n| !n.trim().is_empty());
        self.reviewed_at = Some(now);

        merchant.kyc_status = KycStatus::Verified;
        merchant.updated_at = now;
        Ok(())
    }

    /// Rejects the request and marks the merchant rejected.
    pub fn reject(
        &mut self,
        merchant: &mut Merchant,
        reviewer_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_pending("reject")?;
        validate_reason("rejection reason", reason)?;
        self.status = KycRequestStatus::Rejected;
        self.reviewer_id = Some(reviewer_id.to_string());
        self.rejection_reason = Some(reason.trim().to_string());
        self.reviewed_at = Some(now);

        merchant.kyc_status = KycStatus::Rejected;
        merchant.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
