//! # Demo Data
//!
//! A small bank with four branches, staff for every role, a handful of
//! merchants in different KYC states, and 200 unallocated static QR codes in
//! the central pool.
//!
//! ```text
//! ┌──────┬──────────┬───────────────────┬──────────┬────────────────────────┐
//! │ id   │ code     │ name              │ region   │ stock                  │
//! ├──────┼──────────┼───────────────────┼──────────┼────────────────────────┤
//! │ 1    │ KTM-001  │ Kathmandu Main    │ Bagmati  │ 20 static, 8 issued    │
//! │ 2    │ PKR-001  │ Pokhara Lakeside  │ Gandaki  │ 10 dynamic, 4 issued   │
//! │ 3    │ BRT-001  │ Biratnagar        │ Koshi    │ 6 static, 1 blocked    │
//! │ 4    │ BTL-001  │ Butwal            │ Lumbini  │ none                   │
//! └──────┴──────────┴───────────────────┴──────────┴────────────────────────┘
//! ```
//!
//! Well-known ids (`u-admin`, `u-mgr-1`, `m-verified-1`, ...) are exported so
//! tests and the CLI can act as a particular user.

use chrono::{DateTime, Duration, Utc};
use qrdesk_core::lifecycle::format_qr_value;
use qrdesk_core::{
    AllocationRequest, AuditCategory, AuditItem, Branch, BranchType, ComplianceStatus,
    KycDocument, KycDocumentType, KycRequest, KycRequestStatus, KycStatus, Merchant,
    MerchantRequest, QrCode, QrType, Review, RiskLevel, Role, User,
};

use crate::error::StoreResult;
use crate::store::Tables;

pub const ADMIN_ID: &str = "u-admin";
pub const DEPARTMENT_APPROVER_ID: &str = "u-dept-approver";
pub const AUDITOR_ID: &str = "u-auditor";
pub const MANAGER_1_ID: &str = "u-mgr-1";
pub const BRANCH_APPROVER_1_ID: &str = "u-approver-1";
pub const SALES_1_ID: &str = "u-sales-1";
pub const MANAGER_2_ID: &str = "u-mgr-2";
pub const SALES_2_ID: &str = "u-sales-2";

pub const VERIFIED_MERCHANT_1_ID: &str = "m-verified-1";
pub const PENDING_MERCHANT_1_ID: &str = "m-pending-1";
pub const REJECTED_MERCHANT_2_ID: &str = "m-rejected-2";
pub const VERIFIED_MERCHANT_2_ID: &str = "m-verified-2";

/// Size of the central unallocated pool.
pub const DEMO_POOL_SIZE: u32 = 200;

fn branch(id: &str, code: &str, name: &str, region: &str, manager: Option<&str>, now: DateTime<Utc>) -> Branch {
    Branch {
        id: id.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        region: region.to_string(),
        branch_type: BranchType::Domestic,
        manager_id: manager.map(str::to_string),
        is_active: true,
        created_at: now,
    }
}

fn user(id: &str, username: &str, full_name: &str, role: Role, branch: Option<&str>, now: DateTime<Utc>) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        full_name: full_name.to_string(),
        email: format!("{}@qrdesk.bank", username),
        role,
        branch_id: branch.map(str::to_string),
        is_active: true,
        created_at: now,
    }
}

fn merchant(
    id: &str,
    legal_name: &str,
    shop_name: &str,
    kyc_status: KycStatus,
    branch: &str,
    created_by: &str,
    now: DateTime<Utc>,
) -> Merchant {
    Merchant {
        id: id.to_string(),
        legal_name: legal_name.to_string(),
        shop_name: shop_name.to_string(),
        contact_name: "Owner".to_string(),
        phone: "9801000000".to_string(),
        email: None,
        address: format!("{} Bazaar", shop_name),
        kyc_status,
        branch_id: Some(branch.to_string()),
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[allow(clippy::too_many_arguments)]
fn audit_item(
    title: &str,
    category: AuditCategory,
    risk_level: RiskLevel,
    status: ComplianceStatus,
    score: Option<u8>,
    branch: Option<&str>,
    findings: Option<&str>,
    now: DateTime<Utc>,
) -> AuditItem {
    AuditItem {
        id: qrdesk_core::new_id(),
        title: title.to_string(),
        description: format!("Periodic review: {}", title.to_lowercase()),
        category,
        risk_level,
        status,
        score,
        branch_id: branch.map(str::to_string),
        findings: findings.map(str::to_string),
        created_by: AUDITOR_ID.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Builds the demo tables.
pub fn demo_tables(prefix: &str, now: DateTime<Utc>) -> StoreResult<Tables> {
    let mut t = Tables::default();
    let today = now.date_naive();
    let batch = qrdesk_core::new_id();

    // Directory
    for b in [
        branch("1", "KTM-001", "Kathmandu Main", "Bagmati", Some(MANAGER_1_ID), now),
        branch("2", "PKR-001", "Pokhara Lakeside", "Gandaki", Some(MANAGER_2_ID), now),
        branch("3", "BRT-001", "Biratnagar", "Koshi", None, now),
        branch("4", "BTL-001", "Butwal", "Lumbini", None, now),
    ] {
        t.insert_branch(b)?;
    }

    for u in [
        user(ADMIN_ID, "admin", "System Administrator", Role::SystemAdmin, None, now),
        user(DEPARTMENT_APPROVER_ID, "dept.approver", "Department Approver", Role::DepartmentApprover, None, now),
        user(AUDITOR_ID, "auditor", "Internal Auditor", Role::Auditor, None, now),
        user(MANAGER_1_ID, "ktm.manager", "Ramesh Shrestha", Role::BranchManager, Some("1"), now),
        user(BRANCH_APPROVER_1_ID, "ktm.approver", "Sunita Karki", Role::BranchApprover, Some("1"), now),
        user(SALES_1_ID, "ktm.sales", "Bikash Thapa", Role::SalesUser, Some("1"), now),
        user(MANAGER_2_ID, "pkr.manager", "Anita Gurung", Role::BranchManager, Some("2"), now),
        user(SALES_2_ID, "pkr.sales", "Suresh Adhikari", Role::SalesUser, Some("2"), now),
    ] {
        t.insert_user(u)?;
    }

    for m in [
        merchant(VERIFIED_MERCHANT_1_ID, "Himalayan Java Pvt Ltd", "Himalayan Java", KycStatus::Verified, "1", SALES_1_ID, now),
        merchant(PENDING_MERCHANT_1_ID, "Thamel Handicrafts", "Thamel Crafts", KycStatus::Pending, "1", SALES_1_ID, now),
        merchant(REJECTED_MERCHANT_2_ID, "Lakeside Rentals", "Lakeside Bikes", KycStatus::Rejected, "2", SALES_2_ID, now),
        merchant(VERIFIED_MERCHANT_2_ID, "Fewa Foods Pvt Ltd", "Fewa Cafe", KycStatus::Verified, "2", SALES_2_ID, now),
    ] {
        t.merchants.insert(m)?;
    }

    // QR stock
    let mut static_seq = 0;
    let mut dynamic_seq = 0;
    let mut next = |qr_type: QrType| {
        let seq = match qr_type {
            QrType::Static => {
                static_seq += 1;
                static_seq
            }
            QrType::Dynamic => {
                dynamic_seq += 1;
                dynamic_seq
            }
        };
        QrCode::new_unallocated(format_qr_value(prefix, qr_type, today, seq), qr_type, batch.as_str(), now)
    };

    let mut codes = Vec::new();
    for _ in 0..DEMO_POOL_SIZE {
        codes.push(next(QrType::Static));
    }

    let merchant_1 = t.merchants.get(VERIFIED_MERCHANT_1_ID)?.clone();
    let merchant_2 = t.merchants.get(VERIFIED_MERCHANT_2_ID)?.clone();
    let sales_1 = t.users.get(SALES_1_ID)?.clone();
    let sales_2 = t.users.get(SALES_2_ID)?.clone();

    for i in 0..20 {
        let mut qr = next(QrType::Static);
        qr.allocate("1", now)?;
        if i < 12 {
            qr.assign_to_user(&sales_1, now)?;
        }
        if i < 8 {
            qr.issue(&merchant_1, SALES_1_ID, true, now)?;
        }
        codes.push(qr);
    }
    for i in 0..10 {
        let mut qr = next(QrType::Dynamic);
        qr.allocate("2", now)?;
        if i < 4 {
            qr.assign_to_user(&sales_2, now)?;
            qr.issue(&merchant_2, SALES_2_ID, true, now)?;
        }
        codes.push(qr);
    }
    for i in 0..6 {
        let mut qr = next(QrType::Static);
        qr.allocate("3", now)?;
        if i == 0 {
            qr.block("Sticker reported tampered", ADMIN_ID, now)?;
        }
        codes.push(qr);
    }
    t.insert_qr_codes(codes)?;

    // Open work
    let submitted = now - Duration::hours(6);
    t.allocation_requests.insert(AllocationRequest {
        id: "ar-demo-1".to_string(),
        branch_id: "2".to_string(),
        requested_by: MANAGER_2_ID.to_string(),
        quantity: 25,
        qr_type: QrType::Static,
        purpose: "Tourist season merchant onboarding".to_string(),
        review: Review::submitted(MANAGER_2_ID, None, submitted),
        allocated_qr_ids: Vec::new(),
        created_at: submitted,
        updated_at: submitted,
    })?;

    t.merchant_requests.insert(MerchantRequest {
        id: "mr-demo-1".to_string(),
        merchant_id: VERIFIED_MERCHANT_1_ID.to_string(),
        branch_id: "1".to_string(),
        requested_by: SALES_1_ID.to_string(),
        quantity: 3,
        qr_type: QrType::Static,
        reason: "Second outlet opening".to_string(),
        review: Review::submitted(SALES_1_ID, None, submitted),
        allocated_qr_ids: Vec::new(),
        created_at: submitted,
        updated_at: submitted,
    })?;

    t.kyc_requests.insert(KycRequest {
        id: "kyc-demo-1".to_string(),
        merchant_id: PENDING_MERCHANT_1_ID.to_string(),
        branch_id: Some("1".to_string()),
        submitted_by: SALES_1_ID.to_string(),
        documents: vec![
            KycDocument {
                doc_type: KycDocumentType::BusinessLicense,
                reference: "REG-2081-4471".to_string(),
            },
            KycDocument {
                doc_type: KycDocumentType::TaxCertificate,
                reference: "PAN-601234567".to_string(),
            },
        ],
        status: KycRequestStatus::Pending,
        reviewer_id: None,
        review_notes: None,
        rejection_reason: None,
        submitted_at: submitted,
        reviewed_at: None,
    })?;

    // Compliance checklist
    for item in [
        audit_item("QR inventory reconciliation", AuditCategory::QrManagement, RiskLevel::High, ComplianceStatus::Compliant, Some(92), Some("1"), None, now),
        audit_item("Blocked sticker follow-up", AuditCategory::QrManagement, RiskLevel::Critical, ComplianceStatus::RequiresAction, Some(55), Some("3"), Some("Tampered sticker not yet retired"), now),
        audit_item("Cash and stock custody", AuditCategory::BranchOperations, RiskLevel::Medium, ComplianceStatus::Compliant, Some(88), Some("2"), None, now),
        audit_item("Dormant account review", AuditCategory::UserAccess, RiskLevel::High, ComplianceStatus::NonCompliant, Some(60), None, Some("Two leavers still active"), now),
        audit_item("Merchant document expiry", AuditCategory::MerchantKyc, RiskLevel::High, ComplianceStatus::UnderReview, None, Some("1"), None, now),
        audit_item("Unusual issuance volume", AuditCategory::TransactionMonitoring, RiskLevel::Medium, ComplianceStatus::Compliant, Some(95), None, None, now),
        audit_item("Backup restore drill", AuditCategory::DataSecurity, RiskLevel::Low, ComplianceStatus::Compliant, Some(100), None, None, now),
    ] {
        t.audit_items.insert(item)?;
    }

    Ok(t)
}
