//! # KYC Requests
//!
//! ```text
//! submit_kyc_request ──► PENDING ──┬── approve ──► APPROVED   merchant ─► verified
//!      ▲                           └── reject  ──► REJECTED   merchant ─► rejected
//!      │                                              │
//!      └──────────── resubmit after rejection ◄───────┘
//! ```
//!
//! One pending request per merchant. Submitting leaves the merchant's status
//! alone; it always reflects the latest decision. QR codes are never touched.

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::validation::validate_text;
use qrdesk_core::workflow::ensure_no_pending_kyc;
use qrdesk_core::{AuditAction, KycDocument, KycRequest, KycRequestStatus, ValidationError};
use tracing::{debug, info};

use super::{authorize_in, record, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

impl QrDeskService {
    /// Submits KYC documents for a merchant.
    ///
    /// ## Errors
    /// - `CONFLICT` ("A KYC request is already pending for this merchant")
    /// - `VALIDATION_ERROR` for an empty document list or blank reference
    pub async fn submit_kyc_request(
        &self,
        actor_id: &str,
        merchant_id: &str,
        documents: Vec<KycDocument>,
    ) -> ServiceResult<KycRequest> {
        let request = self
            .store()
            .transaction(|t| {
                let merchant = t.merchants.get(merchant_id)?.clone();
                authorize_in(t, actor_id, Permission::SubmitKyc, merchant.branch_id.as_deref())?;

                if documents.is_empty() {
                    return Err(ValidationError::Required {
                        field: "documents".to_string(),
                    }
                    .into());
                }
                for document in &documents {
                    validate_text("document reference", &document.reference, 100)?;
                }
                ensure_no_pending_kyc(t.kyc_requests.iter(), merchant_id)?;

                let now = Utc::now();
                let request = KycRequest {
                    id: qrdesk_core::new_id(),
                    merchant_id: merchant_id.to_string(),
                    branch_id: merchant.branch_id.clone(),
                    submitted_by: actor_id.to_string(),
                    documents: documents
                        .iter()
                        .map(|d| KycDocument {
                            doc_type: d.doc_type,
                            reference: d.reference.trim().to_string(),
                        })
                        .collect(),
                    status: KycRequestStatus::Pending,
                    reviewer_id: None,
                    review_notes: None,
                    rejection_reason: None,
                    submitted_at: now,
                    reviewed_at: None,
                };
                t.kyc_requests.insert(request.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::KycSubmitted,
                    "KycRequest",
                    &request.id,
                    serde_json::json!({ "merchantId": merchant_id, "documents": request.documents.len() }),
                    now,
                )?;
                Ok(request)
            })
            .await?;

        info!(kyc_id = %request.id, merchant_id = %merchant_id, "KYC request submitted");
        Ok(request)
    }

    /// Approves a pending KYC request; the merchant becomes `verified`.
    pub async fn approve_kyc_request(
        &self,
        actor_id: &str,
        request_id: &str,
        notes: Option<String>,
    ) -> ServiceResult<KycRequest> {
        let request = self
            .store()
            .transaction(|t| {
                let mut request = t.kyc_requests.get(request_id)?.clone();
                authorize_in(t, actor_id, Permission::ReviewKyc, request.branch_id.as_deref())?;
                let mut merchant = t.merchants.get(&request.merchant_id)?.clone();

                let now = Utc::now();
                request.approve(&mut merchant, actor_id, notes, now)?;
                *t.kyc_requests.get_mut(request_id)? = request.clone();
                *t.merchants.get_mut(&request.merchant_id)? = merchant;

                record(
                    t,
                    actor_id,
                    AuditAction::KycApproved,
                    "KycRequest",
                    request_id,
                    serde_json::json!({ "merchantId": request.merchant_id }),
                    now,
                )?;
                Ok(request)
            })
            .await?;

        info!(kyc_id = %request_id, merchant_id = %request.merchant_id, "KYC approved");
        Ok(request)
    }

    /// Rejects a pending KYC request; the merchant becomes `rejected`.
    pub async fn reject_kyc_request(
        &self,
        actor_id: &str,
        request_id: &str,
        reason: &str,
    ) -> ServiceResult<KycRequest> {
        let request = self
            .store()
            .transaction(|t| {
                let mut request = t.kyc_requests.get(request_id)?.clone();
                authorize_in(t, actor_id, Permission::ReviewKyc, request.branch_id.as_deref())?;
                let mut merchant = t.merchants.get(&request.merchant_id)?.clone();

                let now = Utc::now();
                request.reject(&mut merchant, actor_id, reason, now)?;
                *t.kyc_requests.get_mut(request_id)? = request.clone();
                *t.merchants.get_mut(&request.merchant_id)? = merchant;

                record(
                    t,
                    actor_id,
                    AuditAction::KycRejected,
                    "KycRequest",
                    request_id,
                    serde_json::json!({ "merchantId": request.merchant_id, "reason": reason.trim() }),
                    now,
                )?;
                Ok(request)
            })
            .await?;

        info!(kyc_id = %request_id, merchant_id = %request.merchant_id, "KYC rejected");
        Ok(request)
    }

    /// KYC requests, newest first.
    pub async fn get_kyc_requests(
        &self,
        actor_id: &str,
        branch_id: Option<&str>,
        status: Option<KycRequestStatus>,
    ) -> ServiceResult<Vec<KycRequest>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, branch_id))
            .await?;

        let requests = self.store().kyc().list(scope.as_deref(), status).await;
        debug!(actor_id, count = requests.len(), "Listed KYC requests");
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use qrdesk_core::{KycDocumentType, KycStatus};
    use qrdesk_store::fixtures::{ADMIN_ID, BRANCH_APPROVER_1_ID, PENDING_MERCHANT_1_ID, SALES_1_ID};
    use qrdesk_store::QrCodeFilter;

    fn licence() -> Vec<KycDocument> {
        vec![KycDocument {
            doc_type: KycDocumentType::BusinessLicense,
            reference: "REG-2081-9001".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_reject_resubmit_approve() {
        let service = QrDeskService::demo().unwrap();
        let qr_before = service.store().qr_codes().list(&QrCodeFilter::default()).await;

        let rejected = service
            .reject_kyc_request(BRANCH_APPROVER_1_ID, "kyc-demo-1", "Licence expired")
            .await
            .unwrap();
        assert_eq!(rejected.status, KycRequestStatus::Rejected);
        let merchant = service.store().merchants().get(PENDING_MERCHANT_1_ID).await.unwrap();
        assert_eq!(merchant.kyc_status, KycStatus::Rejected);

        let resubmitted = service
            .submit_kyc_request(SALES_1_ID, PENDING_MERCHANT_1_ID, licence())
            .await
            .unwrap();
        assert_eq!(resubmitted.status, KycRequestStatus::Pending);
        // Status keeps the latest decision until the new request is reviewed
        let merchant = service.store().merchants().get(PENDING_MERCHANT_1_ID).await.unwrap();
        assert_eq!(merchant.kyc_status, KycStatus::Rejected);

        let err = service
            .submit_kyc_request(SALES_1_ID, PENDING_MERCHANT_1_ID, licence())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.message.contains("A KYC request is already pending for this merchant"));

        service
            .approve_kyc_request(ADMIN_ID, &resubmitted.id, Some("Documents verified".to_string()))
            .await
            .unwrap();
        let merchant = service.store().merchants().get(PENDING_MERCHANT_1_ID).await.unwrap();
        assert_eq!(merchant.kyc_status, KycStatus::Verified);

        let qr_after = service.store().qr_codes().list(&QrCodeFilter::default()).await;
        assert_eq!(qr_before, qr_after);
    }

    #[tokio::test]
    async fn test_submission_needs_documents() {
        let service = QrDeskService::demo().unwrap();
        service
            .reject_kyc_request(BRANCH_APPROVER_1_ID, "kyc-demo-1", "Blurry scan")
            .await
            .unwrap();

        let err = service
            .submit_kyc_request(SALES_1_ID, PENDING_MERCHANT_1_ID, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_sales_user_cannot_review() {
        let service = QrDeskService::demo().unwrap();
        let err = service
            .approve_kyc_request(SALES_1_ID, "kyc-demo-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let pending = service
            .get_kyc_requests(SALES_1_ID, None, Some(KycRequestStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
