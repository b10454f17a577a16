//! Review steps shared by allocation requests and merchant requests.
//!
//! Both request kinds move through the same state machine and both end in a
//! bulk allocation from the unallocated pool, so the transaction bodies live
//! here once and the public methods are thin wrappers.

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::workflow::{self, Reviewable};
use qrdesk_core::{
    AllocationRequest, AuditAction, MerchantRequest, QrType, RequestStatus, ReviewAction,
};
use qrdesk_store::{Entity, StoreResult, Table, Tables};
use serde_json::json;
use tracing::info;

use super::{authorize_in, record};

/// A request kind that is stored in its own table and reviewed by one
/// approver.
pub(crate) trait ReviewedRequest: Reviewable + Entity {
    /// Who may approve, reject or return it.
    const REVIEW_PERMISSION: Permission;
    /// Who may raise, edit or cancel it.
    const CREATE_PERMISSION: Permission;

    fn table(t: &Tables) -> &Table<Self>;
    fn table_mut(t: &mut Tables) -> &mut Table<Self>;
    fn quantity(&self) -> u32;
    fn qr_type(&self) -> QrType;
    fn record_allocation(&mut self, qr_ids: Vec<String>);
}

impl ReviewedRequest for AllocationRequest {
    const REVIEW_PERMISSION: Permission = Permission::ReviewAllocationRequests;
    const CREATE_PERMISSION: Permission = Permission::CreateAllocationRequests;

    fn table(t: &Tables) -> &Table<Self> {
        &t.allocation_requests
    }
    fn table_mut(t: &mut Tables) -> &mut Table<Self> {
        &mut t.allocation_requests
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
    fn qr_type(&self) -> QrType {
        self.qr_type
    }
    fn record_allocation(&mut self, qr_ids: Vec<String>) {
        self.allocated_qr_ids = qr_ids;
    }
}

impl ReviewedRequest for MerchantRequest {
    const REVIEW_PERMISSION: Permission = Permission::ReviewMerchantRequests;
    const CREATE_PERMISSION: Permission = Permission::CreateMerchantRequests;

    fn table(t: &Tables) -> &Table<Self> {
        &t.merchant_requests
    }
    fn table_mut(t: &mut Tables) -> &mut Table<Self> {
        &mut t.merchant_requests
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
    fn qr_type(&self) -> QrType {
        self.qr_type
    }
    fn record_allocation(&mut self, qr_ids: Vec<String>) {
        self.allocated_qr_ids = qr_ids;
    }
}

fn store_back<R: ReviewedRequest>(t: &mut Tables, request: &R) -> StoreResult<()> {
    *R::table_mut(t).get_mut(request.request_id())? = request.clone();
    Ok(())
}

/// Approves a pending request and allocates its codes from the pool.
///
/// A short pool fails the whole transaction, so the request stays pending.
pub(crate) fn approve_in<R: ReviewedRequest>(
    t: &mut Tables,
    actor_id: &str,
    request_id: &str,
    notes: Option<String>,
) -> StoreResult<R> {
    let now = Utc::now();
    let mut request = R::table(t).get(request_id)?.clone();
    authorize_in(t, actor_id, R::REVIEW_PERMISSION, Some(request.branch_id()))?;

    workflow::approve(&mut request, actor_id, notes, now)?;
    let qr_ids = t.allocate_from_pool(
        request.branch_id(),
        request.quantity() as usize,
        request.qr_type(),
        now,
    )?;

    record(
        t,
        actor_id,
        AuditAction::RequestApproved,
        R::KIND,
        request_id,
        json!({ "branchId": request.branch_id(), "quantity": request.quantity() }),
        now,
    )?;
    record(
        t,
        actor_id,
        AuditAction::QrAllocated,
        "Branch",
        request.branch_id(),
        json!({ "requestId": request_id, "count": qr_ids.len(), "qrIds": &qr_ids }),
        now,
    )?;

    info!(
        kind = R::KIND,
        request_id = %request_id,
        branch_id = %request.branch_id(),
        allocated = qr_ids.len(),
        "Request approved"
    );

    request.record_allocation(qr_ids);
    store_back(t, &request)?;
    Ok(request)
}

/// Rejects a pending request. A reason is required.
pub(crate) fn reject_in<R: ReviewedRequest>(
    t: &mut Tables,
    actor_id: &str,
    request_id: &str,
    reason: &str,
) -> StoreResult<R> {
    let now = Utc::now();
    let mut request = R::table(t).get(request_id)?.clone();
    authorize_in(t, actor_id, R::REVIEW_PERMISSION, Some(request.branch_id()))?;

    workflow::reject(&mut request, actor_id, reason, now)?;
    store_back(t, &request)?;
    record(
        t,
        actor_id,
        AuditAction::RequestRejected,
        R::KIND,
        request_id,
        json!({ "reason": reason.trim() }),
        now,
    )?;

    info!(kind = R::KIND, request_id = %request_id, "Request rejected");
    Ok(request)
}

/// Sends a pending request back to its initiator for edits.
pub(crate) fn return_in<R: ReviewedRequest>(
    t: &mut Tables,
    actor_id: &str,
    request_id: &str,
    notes: &str,
) -> StoreResult<R> {
    let now = Utc::now();
    let mut request = R::table(t).get(request_id)?.clone();
    authorize_in(t, actor_id, R::REVIEW_PERMISSION, Some(request.branch_id()))?;

    workflow::return_for_correction(&mut request, actor_id, notes, now)?;
    store_back(t, &request)?;
    record(
        t,
        actor_id,
        AuditAction::RequestReturned,
        R::KIND,
        request_id,
        json!({ "notes": notes.trim() }),
        now,
    )?;

    info!(kind = R::KIND, request_id = %request_id, "Request returned for correction");
    Ok(request)
}

/// Applies the initiator's edit and puts the request back to pending.
pub(crate) fn update_in<R, F>(
    t: &mut Tables,
    actor_id: &str,
    request_id: &str,
    note: Option<String>,
    edit: F,
) -> StoreResult<R>
where
    R: ReviewedRequest,
    F: FnOnce(&Tables, &mut R) -> StoreResult<serde_json::Value>,
{
    let now = Utc::now();
    let mut request = R::table(t).get(request_id)?.clone();
    authorize_in(t, actor_id, R::CREATE_PERMISSION, Some(request.branch_id()))?;
    workflow::ensure_requester(&request, actor_id)?;
    workflow::ensure_transition(&request, ReviewAction::Updated)?;

    let was_returned = request.status() == RequestStatus::ReturnedForCorrection;
    let changes = edit(t, &mut request)?;
    workflow::resubmit(&mut request, actor_id, note, now)?;
    store_back(t, &request)?;
    record(
        t,
        actor_id,
        AuditAction::RequestUpdated,
        R::KIND,
        request_id,
        json!({ "changes": changes, "resubmitted": was_returned }),
        now,
    )?;

    info!(kind = R::KIND, request_id = %request_id, "Request updated");
    Ok(request)
}

/// Withdraws an open request. Only its initiator may do so.
pub(crate) fn cancel_in<R: ReviewedRequest>(
    t: &mut Tables,
    actor_id: &str,
    request_id: &str,
    reason: Option<String>,
) -> StoreResult<R> {
    let now = Utc::now();
    let mut request = R::table(t).get(request_id)?.clone();
    authorize_in(t, actor_id, R::CREATE_PERMISSION, Some(request.branch_id()))?;
    workflow::ensure_requester(&request, actor_id)?;

    workflow::cancel(&mut request, actor_id, reason.clone(), now)?;
    store_back(t, &request)?;
    record(
        t,
        actor_id,
        AuditAction::RequestCancelled,
        R::KIND,
        request_id,
        json!({ "reason": reason }),
        now,
    )?;

    info!(kind = R::KIND, request_id = %request_id, "Request cancelled");
    Ok(request)
}

/// Records a freshly raised request.
pub(crate) fn insert_in<R: ReviewedRequest>(
    t: &mut Tables,
    actor_id: &str,
    request: R,
) -> StoreResult<R> {
    R::table_mut(t).insert(request.clone())?;
    record(
        t,
        actor_id,
        AuditAction::RequestCreated,
        R::KIND,
        request.request_id(),
        json!({
            "branchId": request.branch_id(),
            "quantity": request.quantity(),
            "qrType": request.qr_type(),
        }),
        request.review().history.first().map_or_else(Utc::now, |note| note.at),
    )?;

    info!(
        kind = R::KIND,
        request_id = %request.request_id(),
        branch_id = %request.branch_id(),
        quantity = request.quantity(),
        "Request created"
    );
    Ok(request)
}
