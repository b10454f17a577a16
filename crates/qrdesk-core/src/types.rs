//! # Domain Types
//!
//! Core domain types used throughout QR Desk.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Branch      │◄──│     QrCode      │──►│    Merchant     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code, region   │   │  qr_value       │   │  kyc_status     │       │
//! │  │  branch_type    │   │  status         │   │  branch_id      │       │
//! │  └────────▲────────┘   └─────────────────┘   └────────▲────────┘       │
//! │           │                                           │                 │
//! │  ┌────────┴────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │ AllocationReq   │   │ MerchantRequest │   │   KycRequest    │       │
//! │  │ (branch → pool) │   │ (merchant → N)  │   │ (documents)     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   AuditItem     │   │    AuditLog     │  append-only trail          │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entities reference each other by id only. Nothing here owns anything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a new entity id (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Forwards `Display` to an enum's `as_str`.
macro_rules! display_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

// =============================================================================
// QR Code
// =============================================================================

/// Static codes encode a fixed merchant account, dynamic codes carry a
/// per-transaction amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QrType {
    Static,
    Dynamic,
}

impl QrType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QrType::Static => "static",
            QrType::Dynamic => "dynamic",
        }
    }

    /// Single-letter code embedded in generated QR values.
    pub const fn code(&self) -> char {
        match self {
            QrType::Static => 'S',
            QrType::Dynamic => 'D',
        }
    }
}

impl Default for QrType {
    fn default() -> Self {
        QrType::Static
    }
}

/// Lifecycle status of a QR code.
///
/// ```text
/// unallocated ──allocate──► allocated ──issue──► issued ──return──► returned
///      │                      ▲   │                │                    │
///      │                      └───┼──revoke────────┘                    │
///      │                          │                                     │
///      └──────────── block (any live status) ──► blocked ──retire──► retired
/// ```
///
/// See [`crate::lifecycle`] for the full transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QrStatus {
    Unallocated,
    Allocated,
    Issued,
    Returned,
    Retired,
    Blocked,
}

impl QrStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [QrStatus; 6] = [
        QrStatus::Unallocated,
        QrStatus::Allocated,
        QrStatus::Issued,
        QrStatus::Returned,
        QrStatus::Retired,
        QrStatus::Blocked,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            QrStatus::Unallocated => "unallocated",
            QrStatus::Allocated => "allocated",
            QrStatus::Issued => "issued",
            QrStatus::Returned => "returned",
            QrStatus::Retired => "retired",
            QrStatus::Blocked => "blocked",
        }
    }
}

impl Default for QrStatus {
    fn default() -> Self {
        QrStatus::Unallocated
    }
}

impl std::str::FromStr for QrStatus {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QrStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| crate::error::ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown QR status '{}'", s),
            })
    }
}

/// Physical condition reported when a merchant hands a QR code back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Good,
    Damaged,
    Lost,
}

impl ReturnCondition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReturnCondition::Good => "good",
            ReturnCondition::Damaged => "damaged",
            ReturnCondition::Lost => "lost",
        }
    }
}

/// A QR code instance.
///
/// Created in bulk by generation or upload, then mutated only through the
/// lifecycle operations in [`crate::lifecycle`]. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The encoded payload printed on the sticker. Unique.
    pub qr_value: String,

    pub qr_type: QrType,

    pub status: QrStatus,

    /// Generation or upload batch this code was created in.
    pub batch_id: String,

    /// Branch holding this code in its inventory.
    pub allocated_branch_id: Option<String>,

    /// Sales user the branch handed this code to.
    pub allocated_to_user_id: Option<String>,

    /// Merchant the code is issued to.
    pub issued_to_merchant_id: Option<String>,

    /// User who performed the issuance.
    pub issued_by: Option<String>,

    #[ts(as = "Option<String>")]
    pub allocated_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub issued_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub returned_at: Option<DateTime<Utc>>,

    pub return_reason: Option<String>,

    pub return_condition: Option<ReturnCondition>,

    pub blocked_reason: Option<String>,

    pub blocked_by: Option<String>,

    #[ts(as = "Option<String>")]
    pub blocked_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl QrCode {
    /// Creates a fresh unallocated code.
    pub fn new_unallocated(
        qr_value: impl Into<String>,
        qr_type: QrType,
        batch_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        QrCode {
            id: new_id(),
            qr_value: qr_value.into(),
            qr_type,
            status: QrStatus::Unallocated,
            batch_id: batch_id.into(),
            allocated_branch_id: None,
            allocated_to_user_id: None,
            issued_to_merchant_id: None,
            issued_by: None,
            allocated_at: None,
            issued_at: None,
            returned_at: None,
            return_reason: None,
            return_condition: None,
            blocked_reason: None,
            blocked_by: None,
            blocked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks whether the code sits in the given branch's inventory.
    pub fn belongs_to_branch(&self, branch_id: &str) -> bool {
        self.allocated_branch_id.as_deref() == Some(branch_id)
    }
}

// =============================================================================
// Branch
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    Domestic,
    International,
}

/// A bank branch. Owns QR codes via `QrCode::allocated_branch_id` and users
/// via `User::branch_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    /// Business identifier, e.g. "KTM-001". Unique.
    pub code: String,
    pub name: String,
    pub region: String,
    pub branch_type: BranchType,
    pub manager_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// The six user roles.
///
/// The first three see the whole program; the last three are branch-scoped
/// and only ever see their own branch. Permissions live in
/// [`crate::policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    DepartmentApprover,
    Auditor,
    BranchManager,
    BranchApprover,
    SalesUser,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SystemAdmin,
        Role::DepartmentApprover,
        Role::Auditor,
        Role::BranchManager,
        Role::BranchApprover,
        Role::SalesUser,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::DepartmentApprover => "department_approver",
            Role::Auditor => "auditor",
            Role::BranchManager => "branch_manager",
            Role::BranchApprover => "branch_approver",
            Role::SalesUser => "sales_user",
        }
    }

    /// Branch-scoped roles only see and act on their own branch.
    pub const fn is_branch_scoped(&self) -> bool {
        matches!(
            self,
            Role::BranchManager | Role::BranchApprover | Role::SalesUser
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Login name. Unique.
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    /// Required for branch-scoped roles.
    pub branch_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Merchant
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl Default for KycStatus {
    fn default() -> Self {
        KycStatus::Pending
    }
}

/// A merchant receiving QR codes. `kyc_status` gates issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub legal_name: String,
    pub shop_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub kyc_status: KycStatus,
    pub branch_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// Status shared by allocation and merchant requests.
///
/// `ReturnedForCorrection` means an approver sent the request back; the
/// initiator can edit it, which puts it back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    ReturnedForCorrection,
    Cancelled,
}

impl RequestStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::ReturnedForCorrection => "returned_for_correction",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Open requests still need somebody to act on them.
    pub const fn is_open(&self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::ReturnedForCorrection
        )
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "returned_for_correction" | "returned" => Ok(RequestStatus::ReturnedForCorrection),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown request status '{}'", other),
            }),
        }
    }
}

/// What happened in a request's history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submitted,
    Updated,
    Approved,
    Rejected,
    ReturnedForCorrection,
    Cancelled,
}

/// One line of a request's review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RequestNote {
    pub author_id: String,
    pub action: ReviewAction,
    pub text: Option<String>,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
}

/// Review state shared by both request kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub status: RequestStatus,
    /// The single approver who decided the request.
    pub approver_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub decided_at: Option<DateTime<Utc>>,
    /// Append-only.
    pub history: Vec<RequestNote>,
}

impl Review {
    /// A freshly submitted review.
    pub fn submitted(author_id: &str, text: Option<String>, now: DateTime<Utc>) -> Self {
        Review {
            status: RequestStatus::Pending,
            approver_id: None,
            decided_at: None,
            history: vec![RequestNote {
                author_id: author_id.to_string(),
                action: ReviewAction::Submitted,
                text,
                at: now,
            }],
        }
    }

    /// Latest note text for a given action, newest first.
    pub fn latest_note(&self, action: ReviewAction) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|note| note.action == action)
            .and_then(|note| note.text.as_deref())
    }
}

/// A branch's request for QR codes from the unallocated pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    pub id: String,
    pub branch_id: String,
    pub requested_by: String,
    pub quantity: u32,
    pub qr_type: QrType,
    pub purpose: String,
    pub review: Review,
    /// QR codes allocated when the request was approved.
    pub allocated_qr_ids: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A merchant's request for additional QR codes, raised through a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRequest {
    pub id: String,
    pub merchant_id: String,
    pub branch_id: String,
    pub requested_by: String,
    pub quantity: u32,
    pub qr_type: QrType,
    pub reason: String,
    pub review: Review,
    pub allocated_qr_ids: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// KYC
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KycRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl KycRequestStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            KycRequestStatus::Pending => "pending",
            KycRequestStatus::Approved => "approved",
            KycRequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KycDocumentType {
    NationalId,
    BusinessLicense,
    TaxCertificate,
    BankStatement,
    ProofOfAddress,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KycDocument {
    pub doc_type: KycDocumentType,
    /// Document number or storage reference.
    pub reference: String,
}

/// A merchant's submitted document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KycRequest {
    pub id: String,
    pub merchant_id: String,
    pub branch_id: Option<String>,
    pub submitted_by: String,
    pub documents: Vec<KycDocument>,
    pub status: KycRequestStatus,
    pub reviewer_id: Option<String>,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
    #[ts(as = "String")]
    pub submitted_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Audit
// =============================================================================

/// The six fixed compliance categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    QrManagement,
    BranchOperations,
    UserAccess,
    MerchantKyc,
    TransactionMonitoring,
    DataSecurity,
}

impl AuditCategory {
    pub const ALL: [AuditCategory; 6] = [
        AuditCategory::QrManagement,
        AuditCategory::BranchOperations,
        AuditCategory::UserAccess,
        AuditCategory::MerchantKyc,
        AuditCategory::TransactionMonitoring,
        AuditCategory::DataSecurity,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::QrManagement => "qr_management",
            AuditCategory::BranchOperations => "branch_operations",
            AuditCategory::UserAccess => "user_access",
            AuditCategory::MerchantKyc => "merchant_kyc",
            AuditCategory::TransactionMonitoring => "transaction_monitoring",
            AuditCategory::DataSecurity => "data_security",
        }
    }

    /// Human-readable label for reports.
    pub const fn label(&self) -> &'static str {
        match self {
            AuditCategory::QrManagement => "QR Code Management",
            AuditCategory::BranchOperations => "Branch Operations",
            AuditCategory::UserAccess => "User Access Control",
            AuditCategory::MerchantKyc => "Merchant KYC",
            AuditCategory::TransactionMonitoring => "Transaction Monitoring",
            AuditCategory::DataSecurity => "Data Security",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub const fn is_high(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    RequiresAction,
    UnderReview,
}

impl ComplianceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::NonCompliant => "non_compliant",
            ComplianceStatus::RequiresAction => "requires_action",
            ComplianceStatus::UnderReview => "under_review",
        }
    }

    /// Open findings: something is wrong and nobody fixed it yet.
    pub const fn is_open_finding(&self) -> bool {
        matches!(
            self,
            ComplianceStatus::NonCompliant | ComplianceStatus::RequiresAction
        )
    }
}

/// A compliance checklist entry maintained by auditors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: AuditCategory,
    pub risk_level: RiskLevel,
    pub status: ComplianceStatus,
    /// 0-100. Missing scores count as 100 in the scorecard.
    pub score: Option<u8>,
    pub branch_id: Option<String>,
    pub findings: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fixed action types recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    QrGenerated,
    QrImported,
    QrAllocated,
    QrAssigned,
    QrIssued,
    QrReturned,
    QrBlocked,
    QrRevoked,
    QrRetired,
    RequestCreated,
    RequestUpdated,
    RequestApproved,
    RequestRejected,
    RequestReturned,
    RequestCancelled,
    KycSubmitted,
    KycApproved,
    KycRejected,
    MerchantCreated,
    MerchantUpdated,
    BranchCreated,
    UserCreated,
    UserDeactivated,
    AuditItemCreated,
    AuditItemUpdated,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::QrGenerated => "QR_GENERATED",
            AuditAction::QrImported => "QR_IMPORTED",
            AuditAction::QrAllocated => "QR_ALLOCATED",
            AuditAction::QrAssigned => "QR_ASSIGNED",
            AuditAction::QrIssued => "QR_ISSUED",
            AuditAction::QrReturned => "QR_RETURNED",
            AuditAction::QrBlocked => "QR_BLOCKED",
            AuditAction::QrRevoked => "QR_REVOKED",
            AuditAction::QrRetired => "QR_RETIRED",
            AuditAction::RequestCreated => "REQUEST_CREATED",
            AuditAction::RequestUpdated => "REQUEST_UPDATED",
            AuditAction::RequestApproved => "REQUEST_APPROVED",
            AuditAction::RequestRejected => "REQUEST_REJECTED",
            AuditAction::RequestReturned => "REQUEST_RETURNED",
            AuditAction::RequestCancelled => "REQUEST_CANCELLED",
            AuditAction::KycSubmitted => "KYC_SUBMITTED",
            AuditAction::KycApproved => "KYC_APPROVED",
            AuditAction::KycRejected => "KYC_REJECTED",
            AuditAction::MerchantCreated => "MERCHANT_CREATED",
            AuditAction::MerchantUpdated => "MERCHANT_UPDATED",
            AuditAction::BranchCreated => "BRANCH_CREATED",
            AuditAction::UserCreated => "USER_CREATED",
            AuditAction::UserDeactivated => "USER_DEACTIVATED",
            AuditAction::AuditItemCreated => "AUDIT_ITEM_CREATED",
            AuditAction::AuditItemUpdated => "AUDIT_ITEM_UPDATED",
        }
    }
}

/// One append-only audit trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub actor_user_id: String,
    pub action_type: AuditAction,
    /// Entity kind, e.g. "QrCode", "AllocationRequest".
    pub target_entity: String,
    pub target_id: String,
    /// JSON snapshot of the ids involved.
    pub payload: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        actor_user_id: &str,
        action_type: AuditAction,
        target_entity: &str,
        target_id: &str,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        AuditLog {
            id: new_id(),
            actor_user_id: actor_user_id.to_string(),
            action_type,
            target_entity: target_entity.to_string(),
            target_id: target_id.to_string(),
            payload: payload.to_string(),
            timestamp: now,
        }
    }
}

display_as_str!(
    QrType,
    QrStatus,
    ReturnCondition,
    Role,
    KycStatus,
    RequestStatus,
    KycRequestStatus,
    AuditCategory,
    RiskLevel,
    ComplianceStatus,
    AuditAction,
);

// =============================================================================
// Unit Tests
// =============================================================================
