//! # Allocation Requests
//!
//! A branch manager asks for QR stock; a department approver or system
//! admin signs off, and approval moves that many codes out of the pool.
//!
//! ```text
//! branch_manager                      department_approver / system_admin
//!      │                                        │
//!      │ create_allocation_request(25, static)  │
//!      ├───────────────► PENDING ◄──────────────┤ approve_request
//!      │                    │                   │   └─ 25 codes: unallocated ─► allocated(branch)
//!      │ update_...         │ return_...        │ reject_request
//!      ◄──── RETURNED_FOR_CORRECTION ◄──────────┤
//! ```

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::validation::{validate_quantity, validate_text};
use qrdesk_core::{AllocationRequest, QrType, Review, ValidationError, MAX_REASON_LENGTH};
use qrdesk_store::RequestFilter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use ts_rs::TS;

use super::review;
use super::{authorize_in, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

/// Input for [`QrDeskService::create_allocation_request`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewAllocationRequest {
    /// Defaults to the requester's own branch.
    pub branch_id: Option<String>,
    pub quantity: u32,
    pub qr_type: QrType,
    pub purpose: String,
}

/// Fields the requester may change while the request is open.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequestUpdate {
    pub quantity: Option<u32>,
    pub qr_type: Option<QrType>,
    pub purpose: Option<String>,
    /// Note shown to the approver.
    pub note: Option<String>,
}

impl QrDeskService {
    /// Raises an allocation request for a branch.
    pub async fn create_allocation_request(
        &self,
        actor_id: &str,
        input: NewAllocationRequest,
    ) -> ServiceResult<AllocationRequest> {
        let max_quantity = self.config().workflow.max_request_quantity;

        let request = self
            .store()
            .transaction(|t| {
                let actor = t.users.get(actor_id)?;
                let branch_id = input
                    .branch_id
                    .clone()
                    .or_else(|| actor.branch_id.clone())
                    .ok_or_else(|| ValidationError::Required {
                        field: "branch_id".to_string(),
                    })?;

                authorize_in(t, actor_id, Permission::CreateAllocationRequests, Some(&branch_id))?;
                t.branches.get(&branch_id)?;
                validate_quantity(input.quantity, max_quantity)?;
                validate_text("purpose", &input.purpose, MAX_REASON_LENGTH)?;

                let now = Utc::now();
                review::insert_in(
                    t,
                    actor_id,
                    AllocationRequest {
                        id: qrdesk_core::new_id(),
                        branch_id,
                        requested_by: actor_id.to_string(),
                        quantity: input.quantity,
                        qr_type: input.qr_type,
                        purpose: input.purpose.trim().to_string(),
                        review: Review::submitted(actor_id, None, now),
                        allocated_qr_ids: Vec::new(),
                        created_at: now,
                        updated_at: now,
                    },
                )
            })
            .await?;

        Ok(request)
    }

    /// Edits an open request and resubmits it.
    pub async fn update_allocation_request(
        &self,
        actor_id: &str,
        request_id: &str,
        update: AllocationRequestUpdate,
    ) -> ServiceResult<AllocationRequest> {
        let max_quantity = self.config().workflow.max_request_quantity;
        let note = update.note.clone();

        let request = self
            .store()
            .transaction(|t| {
                review::update_in(t, actor_id, request_id, note, |_, req: &mut AllocationRequest| {
                    if let Some(quantity) = update.quantity {
                        validate_quantity(quantity, max_quantity)?;
                        req.quantity = quantity;
                    }
                    if let Some(qr_type) = update.qr_type {
                        req.qr_type = qr_type;
                    }
                    if let Some(purpose) = update.purpose.as_deref() {
                        validate_text("purpose", purpose, MAX_REASON_LENGTH)?;
                        req.purpose = purpose.trim().to_string();
                    }
                    Ok(json!({
                        "quantity": update.quantity,
                        "qrType": update.qr_type,
                        "purpose": update.purpose,
                    }))
                })
            })
            .await?;

        Ok(request)
    }

    /// Approves an allocation request and allocates its codes to the
    /// branch in one step.
    ///
    /// ## Errors
    /// - `INSUFFICIENT_INVENTORY` when the pool is short; the request stays
    ///   pending and no QR code changes
    /// - `CONFLICT` when the request is no longer pending
    pub async fn approve_request(
        &self,
        actor_id: &str,
        request_id: &str,
        notes: Option<String>,
    ) -> ServiceResult<AllocationRequest> {
        let request = self
            .store()
            .transaction(|t| review::approve_in(t, actor_id, request_id, notes))
            .await?;
        Ok(request)
    }

    /// Rejects an allocation request. A reason is required.
    pub async fn reject_request(
        &self,
        actor_id: &str,
        request_id: &str,
        reason: &str,
    ) -> ServiceResult<AllocationRequest> {
        let request = self
            .store()
            .transaction(|t| review::reject_in(t, actor_id, request_id, reason))
            .await?;
        Ok(request)
    }

    /// Sends an allocation request back to the branch for edits.
    pub async fn return_request_for_correction(
        &self,
        actor_id: &str,
        request_id: &str,
        notes: &str,
    ) -> ServiceResult<AllocationRequest> {
        let request = self
            .store()
            .transaction(|t| review::return_in(t, actor_id, request_id, notes))
            .await?;
        Ok(request)
    }

    /// Withdraws an open allocation request.
    pub async fn cancel_allocation_request(
        &self,
        actor_id: &str,
        request_id: &str,
        reason: Option<String>,
    ) -> ServiceResult<AllocationRequest> {
        let request = self
            .store()
            .transaction(|t| review::cancel_in(t, actor_id, request_id, reason))
            .await?;
        Ok(request)
    }

    /// Allocation requests, newest first. Branch-scoped users only see
    /// their own branch.
    pub async fn get_allocation_requests(
        &self,
        actor_id: &str,
        filter: RequestFilter,
    ) -> ServiceResult<Vec<AllocationRequest>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, filter.branch_id.as_deref()))
            .await?;

        let filter = RequestFilter {
            branch_id: scope,
            ..filter
        };
        let requests = self.store().requests().list_allocation(&filter).await;
        debug!(actor_id, count = requests.len(), "Listed allocation requests");
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use qrdesk_core::{AuditAction, QrStatus, RequestStatus};
    use qrdesk_store::fixtures::{
        ADMIN_ID, BRANCH_APPROVER_1_ID, DEMO_POOL_SIZE, DEPARTMENT_APPROVER_ID, MANAGER_1_ID,
        MANAGER_2_ID,
    };
    use qrdesk_store::{AuditLogFilter, QrCodeFilter};

    fn request_for_branch_1(quantity: u32) -> NewAllocationRequest {
        NewAllocationRequest {
            branch_id: None,
            quantity,
            qr_type: QrType::Static,
            purpose: "New market stalls".to_string(),
        }
    }

    #[tokio::test]
    async fn test_approval_moves_codes_from_pool() {
        let service = QrDeskService::demo().unwrap();
        let request = service
            .create_allocation_request(MANAGER_1_ID, request_for_branch_1(10))
            .await
            .unwrap();
        assert_eq!(request.branch_id, "1");
        assert_eq!(request.review.status, RequestStatus::Pending);

        let approved = service
            .approve_request(DEPARTMENT_APPROVER_ID, &request.id, Some("ok".to_string()))
            .await
            .unwrap();

        assert_eq!(approved.review.status, RequestStatus::Approved);
        assert_eq!(approved.review.approver_id.as_deref(), Some(DEPARTMENT_APPROVER_ID));
        assert_eq!(approved.allocated_qr_ids.len(), 10);

        let qr_codes = service.store().qr_codes();
        assert_eq!(
            qr_codes.count_by_status(QrStatus::Unallocated).await,
            DEMO_POOL_SIZE as usize - 10
        );
        assert_eq!(qr_codes.count(&QrCodeFilter::default().branch("1")).await, 30);
        for id in &approved.allocated_qr_ids {
            let qr = qr_codes.get(id).await.unwrap();
            assert_eq!(qr.status, QrStatus::Allocated);
            assert_eq!(qr.allocated_branch_id.as_deref(), Some("1"));
        }

        let audit = service.store().audit();
        assert_eq!(
            audit.count_logs(&AuditLogFilter::action(AuditAction::RequestApproved)).await,
            1
        );
    }

    #[tokio::test]
    async fn test_short_pool_leaves_request_pending() {
        let service = QrDeskService::demo().unwrap();
        let request = service
            .create_allocation_request(MANAGER_1_ID, request_for_branch_1(DEMO_POOL_SIZE + 1))
            .await
            .unwrap();

        let err = service
            .approve_request(ADMIN_ID, &request.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientInventory);
        assert!(err.message.contains("Only 200 unallocated QR codes available"));

        let stored = service.store().requests().get_allocation(&request.id).await.unwrap();
        assert_eq!(stored.review.status, RequestStatus::Pending);
        assert!(stored.allocated_qr_ids.is_empty());
        assert_eq!(
            service.store().qr_codes().count_by_status(QrStatus::Unallocated).await,
            DEMO_POOL_SIZE as usize
        );
        assert_eq!(
            service
                .store()
                .audit()
                .count_logs(&AuditLogFilter::action(AuditAction::RequestApproved))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_second_approval_conflicts() {
        let service = QrDeskService::demo().unwrap();
        service.approve_request(ADMIN_ID, "ar-demo-1", None).await.unwrap();

        let err = service
            .approve_request(DEPARTMENT_APPROVER_ID, "ar-demo-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(
            service.store().qr_codes().count_by_status(QrStatus::Unallocated).await,
            DEMO_POOL_SIZE as usize - 25
        );
    }

    #[tokio::test]
    async fn test_return_update_then_approve() {
        let service = QrDeskService::demo().unwrap();
        let returned = service
            .return_request_for_correction(DEPARTMENT_APPROVER_ID, "ar-demo-1", "Quantity too high")
            .await
            .unwrap();
        assert_eq!(returned.review.status, RequestStatus::ReturnedForCorrection);

        let updated = service
            .update_allocation_request(
                MANAGER_2_ID,
                "ar-demo-1",
                AllocationRequestUpdate {
                    quantity: Some(15),
                    note: Some("Reduced to 15".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.review.status, RequestStatus::Pending);
        assert_eq!(updated.quantity, 15);

        let approved = service.approve_request(ADMIN_ID, "ar-demo-1", None).await.unwrap();
        assert_eq!(approved.allocated_qr_ids.len(), 15);
    }

    #[tokio::test]
    async fn test_review_and_edit_permissions() {
        let service = QrDeskService::demo().unwrap();

        let err = service
            .approve_request(BRANCH_APPROVER_1_ID, "ar-demo-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = service
            .create_allocation_request(ADMIN_ID, request_for_branch_1(5))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = service
            .cancel_allocation_request(MANAGER_1_ID, "ar-demo-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let cancelled = service
            .cancel_allocation_request(MANAGER_2_ID, "ar-demo-1", Some("Season postponed".to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.review.status, RequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_listing_is_branch_scoped() {
        let service = QrDeskService::demo().unwrap();
        service
            .create_allocation_request(MANAGER_1_ID, request_for_branch_1(5))
            .await
            .unwrap();

        let all = service
            .get_allocation_requests(ADMIN_ID, RequestFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let own = service
            .get_allocation_requests(MANAGER_1_ID, RequestFilter::default())
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].branch_id, "1");

        let err = service
            .get_allocation_requests(
                MANAGER_1_ID,
                RequestFilter {
                    branch_id: Some("2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
