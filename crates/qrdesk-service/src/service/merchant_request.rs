//! # Merchant QR Requests
//!
//! Branch staff ask for codes on behalf of a merchant. A branch approver of
//! the same branch, a department approver or a system admin signs off, and
//! approval allocates the codes to the request's branch.

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::validation::{validate_quantity, validate_text};
use qrdesk_core::{MerchantRequest, QrType, Review, ValidationError, MAX_REASON_LENGTH};
use qrdesk_store::RequestFilter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use ts_rs::TS;

use super::review;
use super::{authorize_in, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

/// Input for [`QrDeskService::create_merchant_request`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewMerchantRequest {
    pub merchant_id: String,
    pub quantity: u32,
    pub qr_type: QrType,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRequestUpdate {
    pub quantity: Option<u32>,
    pub qr_type: Option<QrType>,
    pub reason: Option<String>,
    pub note: Option<String>,
}

impl QrDeskService {
    /// Raises a QR request for a merchant.
    ///
    /// The request belongs to the merchant's branch, or to the requester's
    /// branch for a merchant without one.
    pub async fn create_merchant_request(
        &self,
        actor_id: &str,
        input: NewMerchantRequest,
    ) -> ServiceResult<MerchantRequest> {
        let max_quantity = self.config().workflow.max_request_quantity;

        let request = self
            .store()
            .transaction(|t| {
                let merchant = t.merchants.get(&input.merchant_id)?;
                let branch_id = merchant
                    .branch_id
                    .clone()
                    .or_else(|| t.users.find(actor_id).and_then(|u| u.branch_id.clone()))
                    .ok_or_else(|| ValidationError::Required {
                        field: "branch_id".to_string(),
                    })?;

                authorize_in(t, actor_id, Permission::CreateMerchantRequests, Some(&branch_id))?;
                validate_quantity(input.quantity, max_quantity)?;
                validate_text("reason", &input.reason, MAX_REASON_LENGTH)?;

                let now = Utc::now();
                review::insert_in(
                    t,
                    actor_id,
                    MerchantRequest {
                        id: qrdesk_core::new_id(),
                        merchant_id: input.merchant_id.clone(),
                        branch_id,
                        requested_by: actor_id.to_string(),
                        quantity: input.quantity,
                        qr_type: input.qr_type,
                        reason: input.reason.trim().to_string(),
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

    /// Edits an open merchant request and resubmits it.
    pub async fn update_merchant_request(
        &self,
        actor_id: &str,
        request_id: &str,
        update: MerchantRequestUpdate,
    ) -> ServiceResult<MerchantRequest> {
        let max_quantity = self.config().workflow.max_request_quantity;
        let note = update.note.clone();

        let request = self
            .store()
            .transaction(|t| {
                review::update_in(t, actor_id, request_id, note, |_, req: &mut MerchantRequest| {
                    if let Some(quantity) = update.quantity {
                        validate_quantity(quantity, max_quantity)?;
                        req.quantity = quantity;
                    }
                    if let Some(qr_type) = update.qr_type {
                        req.qr_type = qr_type;
                    }
                    if let Some(reason) = update.reason.as_deref() {
                        validate_text("reason", reason, MAX_REASON_LENGTH)?;
                        req.reason = reason.trim().to_string();
                    }
                    Ok(json!({
                        "quantity": update.quantity,
                        "qrType": update.qr_type,
                        "reason": update.reason,
                    }))
                })
            })
            .await?;

        Ok(request)
    }

    /// Approves a merchant request and allocates its codes to the branch.
    pub async fn approve_merchant_request(
        &self,
        actor_id: &str,
        request_id: &str,
        notes: Option<String>,
    ) -> ServiceResult<MerchantRequest> {
        let request = self
            .store()
            .transaction(|t| review::approve_in(t, actor_id, request_id, notes))
            .await?;
        Ok(request)
    }

    pub async fn reject_merchant_request(
        &self,
        actor_id: &str,
        request_id: &str,
        reason: &str,
    ) -> ServiceResult<MerchantRequest> {
        let request = self
            .store()
            .transaction(|t| review::reject_in(t, actor_id, request_id, reason))
            .await?;
        Ok(request)
    }

    pub async fn return_merchant_request_for_correction(
        &self,
        actor_id: &str,
        request_id: &str,
        notes: &str,
    ) -> ServiceResult<MerchantRequest> {
        let request = self
            .store()
            .transaction(|t| review::return_in(t, actor_id, request_id, notes))
            .await?;
        Ok(request)
    }

    pub async fn cancel_merchant_request(
        &self,
        actor_id: &str,
        request_id: &str,
        reason: Option<String>,
    ) -> ServiceResult<MerchantRequest> {
        let request = self
            .store()
            .transaction(|t| review::cancel_in(t, actor_id, request_id, reason))
            .await?;
        Ok(request)
    }

    /// Merchant requests, newest first, optionally for one merchant.
    pub async fn get_merchant_requests(
        &self,
        actor_id: &str,
        filter: RequestFilter,
        merchant_id: Option<&str>,
    ) -> ServiceResult<Vec<MerchantRequest>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, filter.branch_id.as_deref()))
            .await?;

        let filter = RequestFilter {
            branch_id: scope,
            ..filter
        };
        let requests = self.store().requests().list_merchant(&filter, merchant_id).await;
        debug!(actor_id, count = requests.len(), "Listed merchant requests");
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use qrdesk_core::{QrStatus, RequestStatus};
    use qrdesk_store::fixtures::{
        BRANCH_APPROVER_1_ID, DEMO_POOL_SIZE, MANAGER_1_ID, SALES_1_ID, SALES_2_ID,
        VERIFIED_MERCHANT_1_ID, VERIFIED_MERCHANT_2_ID,
    };

    #[tokio::test]
    async fn test_branch_approver_approves_own_branch() {
        let service = QrDeskService::demo().unwrap();
        let approved = service
            .approve_merchant_request(BRANCH_APPROVER_1_ID, "mr-demo-1", None)
            .await
            .unwrap();

        assert_eq!(approved.review.status, RequestStatus::Approved);
        assert_eq!(approved.allocated_qr_ids.len(), 3);
        assert_eq!(
            service.store().qr_codes().count_by_status(QrStatus::Unallocated).await,
            DEMO_POOL_SIZE as usize - 3
        );
    }

    #[tokio::test]
    async fn test_request_follows_merchant_branch() {
        let service = QrDeskService::demo().unwrap();
        let request = service
            .create_merchant_request(
                SALES_2_ID,
                NewMerchantRequest {
                    merchant_id: VERIFIED_MERCHANT_2_ID.to_string(),
                    quantity: 2,
                    qr_type: QrType::Dynamic,
                    reason: "Delivery counter".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(request.branch_id, "2");

        // Branch 1 approver cannot decide a branch 2 request
        let err = service
            .approve_merchant_request(BRANCH_APPROVER_1_ID, &request.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = service
            .create_merchant_request(
                SALES_1_ID,
                NewMerchantRequest {
                    merchant_id: VERIFIED_MERCHANT_2_ID.to_string(),
                    quantity: 2,
                    qr_type: QrType::Static,
                    reason: "Wrong branch".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_only_requester_edits() {
        let service = QrDeskService::demo().unwrap();

        let err = service
            .update_merchant_request(
                MANAGER_1_ID,
                "mr-demo-1",
                MerchantRequestUpdate {
                    quantity: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let updated = service
            .update_merchant_request(
                SALES_1_ID,
                "mr-demo-1",
                MerchantRequestUpdate {
                    quantity: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.review.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let service = QrDeskService::demo().unwrap();
        let err = service
            .reject_merchant_request(BRANCH_APPROVER_1_ID, "mr-demo-1", "  ")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let rejected = service
            .reject_merchant_request(BRANCH_APPROVER_1_ID, "mr-demo-1", "Existing stock is enough")
            .await
            .unwrap();
        assert_eq!(rejected.review.status, RequestStatus::Rejected);

        let listed = service
            .get_merchant_requests(SALES_1_ID, RequestFilter::default(), Some(VERIFIED_MERCHANT_1_ID))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }
}
