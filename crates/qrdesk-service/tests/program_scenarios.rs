//! End-to-end scenarios over the seeded demo bank.
//!
//! Each test builds its own service, so they run independently.

use qrdesk_core::{
    AuditAction, AuditCategory, KycDocument, KycDocumentType, KycRequestStatus, KycStatus, QrStatus,
    QrType,
};
use qrdesk_service::{ErrorCode, NewAllocationRequest, QrDeskService};
use qrdesk_store::fixtures::{
    ADMIN_ID, AUDITOR_ID, BRANCH_APPROVER_1_ID, DEMO_POOL_SIZE, DEPARTMENT_APPROVER_ID,
    MANAGER_1_ID, PENDING_MERCHANT_1_ID, SALES_1_ID,
};
use qrdesk_store::{AuditLogFilter, QrCodeFilter};

fn service() -> QrDeskService {
    QrDeskService::demo().expect("demo service")
}

async fn count(service: &QrDeskService, filter: QrCodeFilter) -> usize {
    service.store().qr_codes().count(&filter).await
}

#[tokio::test]
async fn test_approving_ten_codes_for_branch_one() {
    let service = service();
    assert_eq!(
        count(&service, QrCodeFilter::with_status(QrStatus::Unallocated)).await,
        DEMO_POOL_SIZE as usize
    );
    let allocated_before = count(&service, QrCodeFilter::with_status(QrStatus::Allocated).branch("1")).await;

    let request = service
        .create_allocation_request(
            MANAGER_1_ID,
            NewAllocationRequest {
                branch_id: Some("1".to_string()),
                quantity: 10,
                qr_type: QrType::Static,
                purpose: "Festival season".to_string(),
            },
        )
        .await
        .unwrap();
    service
        .approve_request(DEPARTMENT_APPROVER_ID, &request.id, None)
        .await
        .unwrap();

    assert_eq!(count(&service, QrCodeFilter::with_status(QrStatus::Unallocated)).await, 190);
    assert_eq!(
        count(&service, QrCodeFilter::with_status(QrStatus::Allocated).branch("1")).await,
        allocated_before + 10
    );

    let approvals = service
        .get_audit_logs(AUDITOR_ID, AuditLogFilter::action(AuditAction::RequestApproved))
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].target_id, request.id);
}

#[tokio::test]
async fn test_rejected_kyc_can_be_resubmitted() {
    let service = service();

    service
        .reject_kyc_request(BRANCH_APPROVER_1_ID, "kyc-demo-1", "incomplete")
        .await
        .unwrap();
    let merchant = service.get_merchant(SALES_1_ID, PENDING_MERCHANT_1_ID).await.unwrap();
    assert_eq!(merchant.kyc_status, KycStatus::Rejected);

    let second = service
        .submit_kyc_request(
            SALES_1_ID,
            PENDING_MERCHANT_1_ID,
            vec![KycDocument {
                doc_type: KycDocumentType::NationalId,
                reference: "NID-27-01-77123".to_string(),
            }],
        )
        .await
        .unwrap();
    assert_eq!(second.status, KycRequestStatus::Pending);
}

#[tokio::test]
async fn test_kyc_status_follows_latest_decision() {
    let service = service();
    let qr_events_before = service
        .store()
        .audit()
        .count_logs(&AuditLogFilter {
            target_entity: Some("QrCode".to_string()),
            ..Default::default()
        })
        .await;

    service
        .approve_kyc_request(BRANCH_APPROVER_1_ID, "kyc-demo-1", None)
        .await
        .unwrap();
    let merchant = service.get_merchant(SALES_1_ID, PENDING_MERCHANT_1_ID).await.unwrap();
    assert_eq!(merchant.kyc_status, KycStatus::Verified);

    let err = service
        .approve_kyc_request(BRANCH_APPROVER_1_ID, "kyc-demo-1", None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Conflict);

    let qr_events_after = service
        .store()
        .audit()
        .count_logs(&AuditLogFilter {
            target_entity: Some("QrCode".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(qr_events_before, qr_events_after);
}

#[tokio::test]
async fn test_issue_to_unverified_merchant_fails() {
    let service = service();
    let qr = service
        .get_qr_codes(SALES_1_ID, QrCodeFilter::with_status(QrStatus::Allocated))
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let err = service
        .issue_qr_code(SALES_1_ID, &qr.id, PENDING_MERCHANT_1_ID)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);
    assert!(err.message.contains(PENDING_MERCHANT_1_ID));
}

#[tokio::test]
async fn test_scorecard_is_mean_of_categories() {
    let service = service();
    let scorecard = service.generate_audit_scorecard(AUDITOR_ID, None).await.unwrap();

    assert_eq!(scorecard.categories.len(), AuditCategory::ALL.len());
    let sum: u32 = scorecard.categories.iter().map(|c| u32::from(c.score)).sum();
    let expected = (f64::from(sum) / scorecard.categories.len() as f64).round() as u8;
    assert_eq!(scorecard.overall_score, expected);
}

#[tokio::test]
async fn test_branch_dashboard_matches_branch_slice() {
    let service = service();
    let stats = service.get_dashboard_stats(MANAGER_1_ID, None).await.unwrap();
    let branch_codes = service
        .get_qr_codes(ADMIN_ID, QrCodeFilter::default().branch("1"))
        .await
        .unwrap();

    for status in QrStatus::ALL {
        let listed = branch_codes.iter().filter(|qr| qr.status == status).count();
        assert_eq!(stats.qr_codes.get(status), listed, "status {}", status);
    }
    assert_eq!(stats.qr_codes.total, branch_codes.len());
}

#[tokio::test]
async fn test_racing_approvals_serialize() {
    let service = service();
    let other = service.clone();

    let (first, second) = tokio::join!(
        service.approve_request(ADMIN_ID, "ar-demo-1", None),
        other.approve_request(DEPARTMENT_APPROVER_ID, "ar-demo-1", None),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.code == ErrorCode::Conflict));
    assert_eq!(
        count(&service, QrCodeFilter::with_status(QrStatus::Unallocated)).await,
        DEMO_POOL_SIZE as usize - 25
    );
}
