//! # Dashboard Aggregation
//!
//! Counters and top-N rankings, recomputed from the records on every call.
//!
//! ```text
//! records ──► narrow to branch (if any) ──► count by status
//!                                       └─► issued QR codes ──► rank branches
//!                                                           ├─► rank sellers (issued_by)
//!                                                           └─► rank regions
//! ```
//!
//! A branch view is literally the global records filtered to that branch,
//! so a branch's numbers always equal the matching slice of the global ones.
//! Unallocated stock belongs to no branch and only shows up globally.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{
    AllocationRequest, Branch, KycRequest, KycRequestStatus, KycStatus, Merchant,
    MerchantRequest, QrCode, QrStatus, RequestStatus, User,
};

// =============================================================================
// Counters
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QrStatusCounts {
    pub unallocated: usize,
    pub allocated: usize,
    pub issued: usize,
    pub returned: usize,
    pub retired: usize,
    pub blocked: usize,
    pub total: usize,
}

impl QrStatusCounts {
    pub fn add(&mut self, status: QrStatus) {
        match status {
            QrStatus::Unallocated => self.unallocated += 1,
            QrStatus::Allocated => self.allocated += 1,
            QrStatus::Issued => self.issued += 1,
            QrStatus::Returned => self.returned += 1,
            QrStatus::Retired => self.retired += 1,
            QrStatus::Blocked => self.blocked += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, status: QrStatus) -> usize {
        match status {
            QrStatus::Unallocated => self.unallocated,
            QrStatus::Allocated => self.allocated,
            QrStatus::Issued => self.issued,
            QrStatus::Returned => self.returned,
            QrStatus::Retired => self.retired,
            QrStatus::Blocked => self.blocked,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RequestCounts {
    pub pending: usize,
    pub returned_for_correction: usize,
    pub approved: usize,
    pub rejected: usize,
    pub cancelled: usize,
    pub total: usize,
}

impl RequestCounts {
    pub fn add(&mut self, status: RequestStatus) {
        match status {
            RequestStatus::Pending => self.pending += 1,
            RequestStatus::ReturnedForCorrection => self.returned_for_correction += 1,
            RequestStatus::Approved => self.approved += 1,
            RequestStatus::Rejected => self.rejected += 1,
            RequestStatus::Cancelled => self.cancelled += 1,
        }
        self.total += 1;
    }

    /// Requests still waiting on someone.
    pub fn open(&self) -> usize {
        self.pending + self.returned_for_correction
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KycCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MerchantKycCounts {
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
    pub total: usize,
}

/// One line of a top-N list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub id: String,
    pub name: String,
    pub issued_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// `None` for the program-wide view.
    pub branch_id: Option<String>,
    pub qr_codes: QrStatusCounts,
    pub allocation_requests: RequestCounts,
    pub merchant_requests: RequestCounts,
    pub kyc_requests: KycCounts,
    pub merchants: MerchantKycCounts,
    pub top_branches: Vec<RankedEntry>,
    pub top_sellers: Vec<RankedEntry>,
    pub top_regions: Vec<RankedEntry>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
}

/// Borrowed view of the tables the dashboard reads.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInput<'a> {
    pub qr_codes: &'a [QrCode],
    pub branches: &'a [Branch],
    pub users: &'a [User],
    pub merchants: &'a [Merchant],
    pub allocation_requests: &'a [AllocationRequest],
    pub merchant_requests: &'a [MerchantRequest],
    pub kyc_requests: &'a [KycRequest],
}

// =============================================================================
// Aggregation
// =============================================================================

fn in_branch(filter: Option<&str>, branch_id: Option<&str>) -> bool {
    filter.map_or(true, |wanted| branch_id == Some(wanted))
}

/// Sorts by count (desc), then name, and keeps the first `top_n`.
fn rank(counts: HashMap<String, usize>, name_of: impl Fn(&str) -> String, top_n: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = counts
        .into_iter()
        .map(|(id, issued_count)| RankedEntry {
            name: name_of(&id),
            id,
            issued_count,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.issued_count
            .cmp(&a.issued_count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(top_n);
    entries
}

/// Computes dashboard stats, optionally narrowed to one branch.
pub fn compute_dashboard(
    input: &DashboardInput<'_>,
    branch_id: Option<&str>,
    top_n: usize,
    now: DateTime<Utc>,
) -> DashboardStats {
    let branches: HashMap<&str, &Branch> = input.branches.iter().map(|b| (b.id.as_str(), b)).collect();
    let users: HashMap<&str, &User> = input.users.iter().map(|u| (u.id.as_str(), u)).collect();

    let mut qr_codes = QrStatusCounts::default();
    let mut by_branch: HashMap<String, usize> = HashMap::new();
    let mut by_seller: HashMap<String, usize> = HashMap::new();
    let mut by_region: HashMap<String, usize> = HashMap::new();

    for qr in input
        .qr_codes
        .iter()
        .filter(|qr| in_branch(branch_id, qr.allocated_branch_id.as_deref()))
    {
        qr_codes.add(qr.status);

        if qr.status != QrStatus::Issued {
            continue;
        }
        if let Some(branch) = qr.allocated_branch_id.as_deref() {
            *by_branch.entry(branch.to_string()).or_default() += 1;
            if let Some(b) = branches.get(branch) {
                *by_region.entry(b.region.clone()).or_default() += 1;
            }
        }
        if let Some(seller) = qr.issued_by.as_deref() {
            *by_seller.entry(seller.to_string()).or_default() += 1;
        }
    }

    let mut allocation_requests = RequestCounts::default();
    for req in input
        .allocation_requests
        .iter()
        .filter(|r| in_branch(branch_id, Some(r.branch_id.as_str())))
    {
        allocation_requests.add(req.review.status);
    }

    let mut merchant_requests = RequestCounts::default();
    for req in input
        .merchant_requests
        .iter()
        .filter(|r| in_branch(branch_id, Some(r.branch_id.as_str())))
    {
        merchant_requests.add(req.review.status);
    }

    let mut kyc_requests = KycCounts::default();
    for req in input
        .kyc_requests
        .iter()
        .filter(|r| in_branch(branch_id, r.branch_id.as_deref()))
    {
        match req.status {
            KycRequestStatus::Pending => kyc_requests.pending += 1,
            KycRequestStatus::Approved => kyc_requests.approved += 1,
            KycRequestStatus::Rejected => kyc_requests.rejected += 1,
        }
        kyc_requests.total += 1;
    }

    let mut merchants = MerchantKycCounts::default();
    for merchant in input
        .merchants
        .iter()
        .filter(|m| in_branch(branch_id, m.branch_id.as_deref()))
    {
        match merchant.kyc_status {
            KycStatus::Pending => merchants.pending += 1,
            KycStatus::Verified => merchants.verified += 1,
            KycStatus::Rejected => merchants.rejected += 1,
        }
        merchants.total += 1;
    }

    let top_branches = rank(
        by_branch,
        |id| branches.get(id).map_or_else(|| id.to_string(), |b| b.name.clone()),
        top_n,
    );
    let top_sellers = rank(
        by_seller,
        |id| users.get(id).map_or_else(|| id.to_string(), |u| u.full_name.clone()),
        top_n,
    );
    let top_regions = rank(by_region, str::to_string, top_n);

    DashboardStats {
        branch_id: branch_id.map(str::to_string),
        qr_codes,
        allocation_requests,
        merchant_requests,
        kyc_requests,
        merchants,
        top_branches,
        top_sellers,
        top_regions,
        generated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchType, QrType};

    fn branch(id: &str, region: &str) -> Branch {
        Branch {
            id: id.into(),
            code: format!("BR-{}", id),
            name: format!("Branch {}", id),
            region: region.into(),
            branch_type: BranchType::Domestic,
            manager_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn qr(branch: Option<&str>, status: QrStatus, seller: Option<&str>) -> QrCode {
        let mut code = QrCode::new_unallocated(crate::types::new_id(), QrType::Static, "batch", Utc::now());
        code.allocated_branch_id = branch.map(str::to_string);
        code.status = status;
        code.issued_by = seller.map(str::to_string);
        code
    }

    fn codes() -> Vec<QrCode> {
        vec![
            qr(None, QrStatus::Unallocated, None),
            qr(None, QrStatus::Unallocated, None),
            qr(Some("1"), QrStatus::Allocated, None),
            qr(Some("1"), QrStatus::Issued, Some("u-a")),
            qr(Some("1"), QrStatus::Issued, Some("u-a")),
            qr(Some("1"), QrStatus::Blocked, None),
            qr(Some("2"), QrStatus::Issued, Some("u-b")),
            qr(Some("3"), QrStatus::Issued, Some("u-c")),
        ]
    }

    fn input<'a>(codes: &'a [QrCode], branches: &'a [Branch]) -> DashboardInput<'a> {
        DashboardInput {
            qr_codes: codes,
            branches,
            users: &[],
            merchants: &[],
            allocation_requests: &[],
            merchant_requests: &[],
            kyc_requests: &[],
        }
    }

    #[test]
    fn test_global_counts() {
        let codes = codes();
        let branches = vec![branch("1", "Bagmati"), branch("2", "Gandaki"), branch("3", "Bagmati")];
        let stats = compute_dashboard(&input(&codes, &branches), None, 5, Utc::now());

        assert_eq!(stats.qr_codes.total, 8);
        assert_eq!(stats.qr_codes.unallocated, 2);
        assert_eq!(stats.qr_codes.issued, 4);
        assert_eq!(stats.top_branches[0].id, "1");
        assert_eq!(stats.top_branches[0].issued_count, 2);
        assert_eq!(stats.top_regions[0].name, "Bagmati");
        assert_eq!(stats.top_regions[0].issued_count, 3);
        assert_eq!(stats.top_sellers[0].id, "u-a");
    }

    #[test]
    fn test_branch_view_equals_global_slice() {
        let codes = codes();
        let branches = vec![branch("1", "Bagmati"), branch("2", "Gandaki"), branch("3", "Bagmati")];
        let data = input(&codes, &branches);
        let scoped = compute_dashboard(&data, Some("1"), 5, Utc::now());

        for status in QrStatus::ALL {
            let slice = codes
                .iter()
                .filter(|qr| qr.allocated_branch_id.as_deref() == Some("1") && qr.status == status)
                .count();
            assert_eq!(scoped.qr_codes.get(status), slice, "status {}", status);
        }
        assert_eq!(scoped.qr_codes.total, 4);
        assert_eq!(scoped.top_branches.len(), 1);
    }

    #[test]
    fn test_top_n_truncates() {
        let codes = codes();
        let branches = vec![branch("1", "Bagmati"), branch("2", "Gandaki"), branch("3", "Bagmati")];
        let stats = compute_dashboard(&input(&codes, &branches), None, 2, Utc::now());
        assert_eq!(stats.top_branches.len(), 2);
        // Ties broken by name
        assert_eq!(stats.top_branches[1].name, "Branch 2");
    }

    #[test]
    fn test_request_counts_open() {
        let mut counts = RequestCounts::default();
        counts.add(RequestStatus::Pending);
        counts.add(RequestStatus::ReturnedForCorrection);
        counts.add(RequestStatus::Approved);
        assert_eq!(counts.open(), 2);
        assert_eq!(counts.total, 3);
    }
}
