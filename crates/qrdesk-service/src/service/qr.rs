//! # QR Code Operations
//!
//! Generation, upload, allocation and the per-code lifecycle steps.
//!
//! ## Who Does What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  system_admin     generate / import ─► UNALLOCATED pool                │
//! │                   allocate (ids or quantity) ─► ALLOCATED(branch)      │
//! │                   retire, block any code                               │
//! │                                                                         │
//! │  branch_manager   assign to own-branch user, block own-branch code     │
//! │  branch_manager,  issue to KYC-verified merchant ─► ISSUED             │
//! │  sales_user       record merchant return ─► RETURNED                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each step writes exactly one audit entry. Bulk allocations write one
//! entry for the whole batch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use qrdesk_core::lifecycle::{assignment_is_stale, format_qr_value, next_sequences};
use qrdesk_core::policy::Permission;
use qrdesk_core::validation::{validate_qr_batch, validate_quantity};
use qrdesk_core::{AuditAction, QrCode, QrStatus, QrType, ReturnCondition, User};
use qrdesk_store::{QrCodeFilter, StoreResult, Tables};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use ts_rs::TS;

use super::{authorize_in, authorize_on, ensure_visible, record, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

/// What [`QrDeskService::sync_user_assignments`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSync {
    /// Codes whose user assignment was cleared.
    pub cleared: Vec<String>,
    /// Issued codes pulled back to their branch's inventory.
    pub revoked: Vec<String>,
}

/// Clears every stale user assignment and revokes stale issued codes.
///
/// An assignment is stale when the user is gone, inactive, or now belongs
/// to another branch.
pub(crate) fn sync_assignments_in(
    t: &mut Tables,
    actor_id: &str,
    now: DateTime<Utc>,
) -> StoreResult<AssignmentSync> {
    let users: HashMap<String, User> = t.users.iter().map(|u| (u.id.clone(), u.clone())).collect();

    let stale: Vec<(String, Option<String>, bool)> = t
        .qr_codes
        .iter()
        .filter(|qr| {
            let user = qr.allocated_to_user_id.as_deref().and_then(|id| users.get(id));
            assignment_is_stale(qr, user)
        })
        .map(|qr| {
            (
                qr.id.clone(),
                qr.allocated_to_user_id.clone(),
                qr.status == QrStatus::Issued,
            )
        })
        .collect();

    let mut outcome = AssignmentSync::default();
    for (qr_id, previous_user, issued) in stale {
        let qr = t.qr_codes.get_mut(&qr_id)?;
        if issued {
            let merchant_id = qr.issued_to_merchant_id.clone();
            qr.revoke(now)?;
            record(
                t,
                actor_id,
                AuditAction::QrRevoked,
                "QrCode",
                &qr_id,
                json!({ "previousUserId": previous_user, "merchantId": merchant_id }),
                now,
            )?;
            outcome.revoked.push(qr_id);
        } else {
            qr.clear_user(now);
            record(
                t,
                actor_id,
                AuditAction::QrAssigned,
                "QrCode",
                &qr_id,
                json!({ "previousUserId": previous_user, "userId": null }),
                now,
            )?;
            outcome.cleared.push(qr_id);
        }
    }

    Ok(outcome)
}

impl QrDeskService {
    // =========================================================================
    // Stock
    // =========================================================================

    /// Generates `count` unallocated codes in one batch.
    ///
    /// Values follow `{prefix}-{S|D}-{YYYYMMDD}-{seq:06}` and continue from
    /// the day's highest sequence for that type.
    pub async fn generate_qr_codes(
        &self,
        actor_id: &str,
        count: u32,
        qr_type: QrType,
    ) -> ServiceResult<Vec<QrCode>> {
        let prefix = self.config().qr.prefix.clone();
        let max_batch = self.config().qr.max_generation_batch;

        let codes = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::GenerateQrCodes, None)?;
                validate_quantity(count, max_batch)?;

                let now = Utc::now();
                let today = now.date_naive();
                let batch_id = qrdesk_core::new_id();
                let sequences = next_sequences(t.last_sequence(&prefix, qr_type, today), count)?;

                let codes: Vec<QrCode> = sequences
                    .map(|seq| {
                        QrCode::new_unallocated(
                            format_qr_value(&prefix, qr_type, today, seq),
                            qr_type,
                            batch_id.as_str(),
                            now,
                        )
                    })
                    .collect();

                t.insert_qr_codes(codes.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::QrGenerated,
                    "QrBatch",
                    &batch_id,
                    json!({
                        "count": count,
                        "qrType": qr_type,
                        "first": codes.first().map(|qr| qr.qr_value.as_str()),
                        "last": codes.last().map(|qr| qr.qr_value.as_str()),
                    }),
                    now,
                )?;
                Ok(codes)
            })
            .await?;

        info!(count = codes.len(), qr_type = %qr_type, "QR codes generated");
        Ok(codes)
    }

    /// Creates unallocated codes from uploaded values.
    ///
    /// A blank, malformed or repeated value (in the upload or already in
    /// stock) rejects the whole upload.
    pub async fn import_qr_codes(
        &self,
        actor_id: &str,
        values: Vec<String>,
        qr_type: QrType,
    ) -> ServiceResult<Vec<QrCode>> {
        let codes = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::GenerateQrCodes, None)?;
                validate_qr_batch(&values)?;

                let now = Utc::now();
                let batch_id = qrdesk_core::new_id();
                let codes: Vec<QrCode> = values
                    .iter()
                    .map(|value| QrCode::new_unallocated(value.trim(), qr_type, batch_id.as_str(), now))
                    .collect();

                t.insert_qr_codes(codes.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::QrImported,
                    "QrBatch",
                    &batch_id,
                    json!({ "count": codes.len(), "qrType": qr_type }),
                    now,
                )?;
                Ok(codes)
            })
            .await?;

        info!(count = codes.len(), qr_type = %qr_type, "QR codes imported");
        Ok(codes)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists codes. Branch-scoped callers only see their branch's codes;
    /// the unallocated pool is visible to global roles only.
    pub async fn get_qr_codes(&self, actor_id: &str, filter: QrCodeFilter) -> ServiceResult<Vec<QrCode>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, filter.branch_id.as_deref()))
            .await?;

        let filter = QrCodeFilter {
            branch_id: scope,
            ..filter
        };
        let codes = self.store().qr_codes().list(&filter).await;
        debug!(actor_id, count = codes.len(), "Listed QR codes");
        Ok(codes)
    }

    pub async fn get_qr_code(&self, actor_id: &str, qr_id: &str) -> ServiceResult<QrCode> {
        let qr = self
            .store()
            .read(|t| -> StoreResult<QrCode> {
                let user = authorize_in(t, actor_id, Permission::ViewRecords, None)?;
                let qr = t.qr_codes.get(qr_id)?;
                ensure_visible(&user, qr.allocated_branch_id.as_deref())?;
                Ok(qr.clone())
            })
            .await?;
        Ok(qr)
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocates specific unallocated codes to a branch.
    pub async fn allocate_qr_codes(
        &self,
        actor_id: &str,
        branch_id: &str,
        qr_ids: Vec<String>,
    ) -> ServiceResult<Vec<QrCode>> {
        let codes = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::AllocateQrCodes, Some(branch_id))?;
                t.branches.get(branch_id)?;
                if qr_ids.is_empty() {
                    return Err(qrdesk_core::ValidationError::Required {
                        field: "qr_ids".to_string(),
                    }
                    .into());
                }

                let now = Utc::now();
                t.allocate_codes(branch_id, &qr_ids, now)?;
                record(
                    t,
                    actor_id,
                    AuditAction::QrAllocated,
                    "Branch",
                    branch_id,
                    json!({ "count": qr_ids.len(), "qrIds": &qr_ids }),
                    now,
                )?;

                qr_ids
                    .iter()
                    .map(|id| t.qr_codes.get(id).cloned())
                    .collect::<StoreResult<Vec<_>>>()
            })
            .await?;

        info!(branch_id = %branch_id, count = codes.len(), "QR codes allocated");
        Ok(codes)
    }

    /// Allocates `quantity` codes of a type from the pool to a branch.
    ///
    /// Fails with `INSUFFICIENT_INVENTORY` and moves nothing when the pool
    /// is short.
    pub async fn allocate_from_pool(
        &self,
        actor_id: &str,
        branch_id: &str,
        quantity: u32,
        qr_type: QrType,
    ) -> ServiceResult<Vec<String>> {
        let max_quantity = self.config().workflow.max_request_quantity;

        let ids = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::AllocateQrCodes, Some(branch_id))?;
                t.branches.get(branch_id)?;
                validate_quantity(quantity, max_quantity)?;

                let now = Utc::now();
                let ids = t.allocate_from_pool(branch_id, quantity as usize, qr_type, now)?;
                record(
                    t,
                    actor_id,
                    AuditAction::QrAllocated,
                    "Branch",
                    branch_id,
                    json!({ "count": ids.len(), "qrType": qr_type, "qrIds": &ids }),
                    now,
                )?;
                Ok(ids)
            })
            .await?;

        info!(branch_id = %branch_id, count = ids.len(), "QR codes allocated from pool");
        Ok(ids)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Assigns an allocated code to an active user of the same branch.
    pub async fn assign_qr_to_user(
        &self,
        actor_id: &str,
        qr_id: &str,
        user_id: &str,
    ) -> ServiceResult<QrCode> {
        let qr = self
            .store()
            .transaction(|t| {
                let branch = t.qr_codes.get(qr_id)?.allocated_branch_id.clone();
                authorize_on(t, actor_id, Permission::AssignQrCodes, branch.as_deref())?;
                let assignee = t.users.get(user_id)?.clone();

                let now = Utc::now();
                let qr = t.qr_codes.get_mut(qr_id)?;
                qr.assign_to_user(&assignee, now)?;
                let qr = qr.clone();

                record(
                    t,
                    actor_id,
                    AuditAction::QrAssigned,
                    "QrCode",
                    qr_id,
                    json!({ "userId": user_id, "branchId": branch }),
                    now,
                )?;
                Ok(qr)
            })
            .await?;

        info!(qr_id = %qr_id, user_id = %user_id, "QR code assigned");
        Ok(qr)
    }

    /// Issues an allocated code to a merchant.
    ///
    /// ## Errors
    /// - `BUSINESS_RULE` when the merchant's KYC is not verified (unless
    ///   `workflow.enforce_kyc_on_issue` is off) or the merchant belongs to
    ///   another branch
    /// - `CONFLICT` when the code is not `allocated`
    pub async fn issue_qr_code(
        &self,
        actor_id: &str,
        qr_id: &str,
        merchant_id: &str,
    ) -> ServiceResult<QrCode> {
        let enforce_kyc = self.config().workflow.enforce_kyc_on_issue;

        let qr = self
            .store()
            .transaction(|t| {
                let branch = t.qr_codes.get(qr_id)?.allocated_branch_id.clone();
                authorize_on(t, actor_id, Permission::IssueQrCodes, branch.as_deref())?;
                let merchant = t.merchants.get(merchant_id)?.clone();

                let now = Utc::now();
                let qr = t.qr_codes.get_mut(qr_id)?;
                qr.issue(&merchant, actor_id, enforce_kyc, now)?;
                let qr = qr.clone();

                record(
                    t,
                    actor_id,
                    AuditAction::QrIssued,
                    "QrCode",
                    qr_id,
                    json!({ "merchantId": merchant_id, "branchId": branch }),
                    now,
                )?;
                Ok(qr)
            })
            .await?;

        info!(qr_id = %qr_id, merchant_id = %merchant_id, "QR code issued");
        Ok(qr)
    }

    /// Records a merchant handing an issued code back.
    pub async fn return_qr_code(
        &self,
        actor_id: &str,
        qr_id: &str,
        reason: &str,
        condition: ReturnCondition,
    ) -> ServiceResult<QrCode> {
        let qr = self
            .store()
            .transaction(|t| {
                let branch = t.qr_codes.get(qr_id)?.allocated_branch_id.clone();
                authorize_on(t, actor_id, Permission::ReturnQrCodes, branch.as_deref())?;

                let now = Utc::now();
                let qr = t.qr_codes.get_mut(qr_id)?;
                let merchant_id = qr.issued_to_merchant_id.clone();
                qr.mark_returned(reason, condition, now)?;
                let qr = qr.clone();

                record(
                    t,
                    actor_id,
                    AuditAction::QrReturned,
                    "QrCode",
                    qr_id,
                    json!({ "merchantId": merchant_id, "reason": reason.trim(), "condition": condition }),
                    now,
                )?;
                Ok(qr)
            })
            .await?;

        info!(qr_id = %qr_id, condition = %condition, "QR code returned");
        Ok(qr)
    }

    /// Blocks a code. Branch managers may only block their own branch's
    /// codes.
    pub async fn block_qr_code(&self, actor_id: &str, qr_id: &str, reason: &str) -> ServiceResult<QrCode> {
        let qr = self
            .store()
            .transaction(|t| {
                let branch = t.qr_codes.get(qr_id)?.allocated_branch_id.clone();
                authorize_on(t, actor_id, Permission::BlockQrCodes, branch.as_deref())?;

                let now = Utc::now();
                let qr = t.qr_codes.get_mut(qr_id)?;
                let previous = qr.status;
                qr.block(reason, actor_id, now)?;
                let qr = qr.clone();

                record(
                    t,
                    actor_id,
                    AuditAction::QrBlocked,
                    "QrCode",
                    qr_id,
                    json!({ "reason": reason.trim(), "previousStatus": previous }),
                    now,
                )?;
                Ok(qr)
            })
            .await?;

        info!(qr_id = %qr_id, "QR code blocked");
        Ok(qr)
    }

    /// Takes a code out of circulation for good.
    pub async fn retire_qr_code(&self, actor_id: &str, qr_id: &str) -> ServiceResult<QrCode> {
        let qr = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::RetireQrCodes, None)?;

                let now = Utc::now();
                let qr = t.qr_codes.get_mut(qr_id)?;
                let previous = qr.status;
                qr.retire(now)?;
                let qr = qr.clone();

                record(
                    t,
                    actor_id,
                    AuditAction::QrRetired,
                    "QrCode",
                    qr_id,
                    json!({ "previousStatus": previous }),
                    now,
                )?;
                Ok(qr)
            })
            .await?;

        info!(qr_id = %qr_id, "QR code retired");
        Ok(qr)
    }

    /// Releases assignments held by missing, inactive or moved users.
    pub async fn sync_user_assignments(&self, actor_id: &str) -> ServiceResult<AssignmentSync> {
        let outcome = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::ManageUsers, None)?;
                sync_assignments_in(t, actor_id, Utc::now())
            })
            .await?;

        info!(
            cleared = outcome.cleared.len(),
            revoked = outcome.revoked.len(),
            "User assignments synced"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use qrdesk_store::fixtures::{
        ADMIN_ID, MANAGER_1_ID, MANAGER_2_ID, PENDING_MERCHANT_1_ID, SALES_1_ID,
        VERIFIED_MERCHANT_1_ID, VERIFIED_MERCHANT_2_ID,
    };
    use qrdesk_store::AuditLogFilter;

    async fn free_code_in_branch_1(service: &QrDeskService) -> QrCode {
        let codes = service
            .get_qr_codes(MANAGER_1_ID, QrCodeFilter::with_status(QrStatus::Allocated))
            .await
            .unwrap();
        codes
            .into_iter()
            .find(|qr| qr.allocated_to_user_id.is_none())
            .unwrap()
    }

    #[tokio::test]
    async fn test_generation_continues_sequence() {
        let service = QrDeskService::demo().unwrap();
        let first = service
            .generate_qr_codes(ADMIN_ID, 3, QrType::Static)
            .await
            .unwrap();
        let second = service
            .generate_qr_codes(ADMIN_ID, 2, QrType::Static)
            .await
            .unwrap();

        // 226 static codes are seeded
        assert!(first[0].qr_value.ends_with("-000227"));
        assert!(first[2].qr_value.ends_with("-000229"));
        assert!(second[0].qr_value.ends_with("-000230"));
        assert!(second[0].qr_value.starts_with("BNK-S-"));
        assert!(first.iter().all(|qr| qr.status == QrStatus::Unallocated));
        assert_ne!(first[0].batch_id, second[0].batch_id);

        let dynamic = service
            .generate_qr_codes(ADMIN_ID, 1, QrType::Dynamic)
            .await
            .unwrap();
        assert!(dynamic[0].qr_value.starts_with("BNK-D-"));
        assert!(dynamic[0].qr_value.ends_with("-000011"));

        let err = service
            .generate_qr_codes(MANAGER_1_ID, 1, QrType::Static)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_import_rejects_duplicates() {
        let service = QrDeskService::demo().unwrap();
        let existing = service
            .get_qr_codes(ADMIN_ID, QrCodeFilter::with_status(QrStatus::Unallocated))
            .await
            .unwrap()[0]
            .qr_value
            .clone();

        let err = service
            .import_qr_codes(ADMIN_ID, vec!["EXT-0001".to_string(), existing], QrType::Static)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(service.store().qr_codes().find_by_value("EXT-0001").await.is_none());

        let imported = service
            .import_qr_codes(ADMIN_ID, vec!["EXT-0001".to_string()], QrType::Static)
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
    }

    #[tokio::test]
    async fn test_issue_requires_verified_kyc() {
        let service = QrDeskService::demo().unwrap();
        let qr = free_code_in_branch_1(&service).await;

        let err = service
            .issue_qr_code(SALES_1_ID, &qr.id, PENDING_MERCHANT_1_ID)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert_eq!(
            service.store().qr_codes().get(&qr.id).await.unwrap().status,
            QrStatus::Allocated
        );

        let err = service
            .issue_qr_code(SALES_1_ID, &qr.id, VERIFIED_MERCHANT_2_ID)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);

        let issued = service
            .issue_qr_code(SALES_1_ID, &qr.id, VERIFIED_MERCHANT_1_ID)
            .await
            .unwrap();
        assert_eq!(issued.status, QrStatus::Issued);
        assert_eq!(issued.issued_to_merchant_id.as_deref(), Some(VERIFIED_MERCHANT_1_ID));

        let returned = service
            .return_qr_code(SALES_1_ID, &qr.id, "Shop closed", ReturnCondition::Good)
            .await
            .unwrap();
        assert_eq!(returned.status, QrStatus::Returned);
    }

    #[tokio::test]
    async fn test_block_is_branch_scoped() {
        let service = QrDeskService::demo().unwrap();
        let qr = free_code_in_branch_1(&service).await;

        let err = service
            .block_qr_code(MANAGER_2_ID, &qr.id, "Suspected tampering")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let blocked = service
            .block_qr_code(MANAGER_1_ID, &qr.id, "Suspected tampering")
            .await
            .unwrap();
        assert_eq!(blocked.status, QrStatus::Blocked);
        assert_eq!(blocked.blocked_by.as_deref(), Some(MANAGER_1_ID));

        let err = service
            .issue_qr_code(SALES_1_ID, &qr.id, VERIFIED_MERCHANT_1_ID)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_pool_allocation_is_all_or_nothing() {
        let service = QrDeskService::demo().unwrap();

        let err = service
            .allocate_from_pool(ADMIN_ID, "4", 5, QrType::Dynamic)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientInventory);

        let ids = service
            .allocate_from_pool(ADMIN_ID, "4", 5, QrType::Static)
            .await
            .unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(
            service
                .store()
                .qr_codes()
                .count(&QrCodeFilter::default().branch("4"))
                .await,
            5
        );
        assert_eq!(
            service
                .store()
                .audit()
                .count_logs(&AuditLogFilter::action(AuditAction::QrAllocated))
                .await,
            1
        );
    }

    #[tokio::test]
    async fn test_deactivation_releases_assignments() {
        let service = QrDeskService::demo().unwrap();
        service.deactivate_user(ADMIN_ID, SALES_1_ID).await.unwrap();

        let held = service
            .get_qr_codes(
                ADMIN_ID,
                QrCodeFilter {
                    allocated_to_user_id: Some(SALES_1_ID.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(held.is_empty());

        let audit = service.store().audit();
        assert_eq!(audit.count_logs(&AuditLogFilter::action(AuditAction::QrRevoked)).await, 8);
        assert_eq!(
            service
                .store()
                .qr_codes()
                .count(&QrCodeFilter::with_status(QrStatus::Issued).branch("1"))
                .await,
            0
        );

        // Nothing stale is left
        let sync = service.sync_user_assignments(ADMIN_ID).await.unwrap();
        assert_eq!(sync, AssignmentSync::default());
    }

    #[tokio::test]
    async fn test_generation_skips_oversized_uploaded_sequence() {
        use qrdesk_core::lifecycle::qr_value_stem;

        let service = QrDeskService::demo().unwrap();
        let stem = qr_value_stem("BNK", QrType::Static, Utc::now().date_naive());

        service
            .import_qr_codes(ADMIN_ID, vec![format!("{}4294967295", stem)], QrType::Static)
            .await
            .unwrap();
        let generated = service
            .generate_qr_codes(ADMIN_ID, 1, QrType::Static)
            .await
            .unwrap();
        assert_eq!(generated[0].qr_value, format!("{}000227", stem));

        // The day's six-digit space is now full
        service
            .import_qr_codes(ADMIN_ID, vec![format!("{}999999", stem)], QrType::Static)
            .await
            .unwrap();
        let stock_before = service.store().qr_codes().count(&QrCodeFilter::default()).await;
        let err = service
            .generate_qr_codes(ADMIN_ID, 1, QrType::Static)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(
            service.store().qr_codes().count(&QrCodeFilter::default()).await,
            stock_before
        );
    }

    #[tokio::test]
    async fn test_only_admin_retires_returned_code() {
        let service = QrDeskService::demo().unwrap();
        let qr = free_code_in_branch_1(&service).await;
        service
            .issue_qr_code(SALES_1_ID, &qr.id, VERIFIED_MERCHANT_1_ID)
            .await
            .unwrap();
        service
            .return_qr_code(SALES_1_ID, &qr.id, "Sticker faded", ReturnCondition::Damaged)
            .await
            .unwrap();

        let audit = service.store().audit();
        let retired_before = audit.count_logs(&AuditLogFilter::action(AuditAction::QrRetired)).await;

        let err = service.retire_qr_code(MANAGER_1_ID, &qr.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let retired = service.retire_qr_code(ADMIN_ID, &qr.id).await.unwrap();
        assert_eq!(retired.status, QrStatus::Retired);
        assert_eq!(
            audit.count_logs(&AuditLogFilter::action(AuditAction::QrRetired)).await,
            retired_before + 1
        );

        let err = service.retire_qr_code(ADMIN_ID, &qr.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }
}
