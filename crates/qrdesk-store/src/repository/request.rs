//! # Request Repository
//!
//! Allocation requests and merchant requests share one filter and one
//! repository; both go through the same review flow.

use qrdesk_core::workflow::Reviewable;
use qrdesk_core::{AllocationRequest, MerchantRequest, RequestStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::Store;

/// Criteria for listing requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub branch_id: Option<String>,
    pub requested_by: Option<String>,
    /// Only open requests (pending or returned for correction).
    pub open_only: bool,
}

impl RequestFilter {
    pub fn matches<R: Reviewable>(&self, request: &R) -> bool {
        self.status.map_or(true, |s| request.status() == s)
            && self
                .branch_id
                .as_deref()
                .map_or(true, |b| request.branch_id() == b)
            && self
                .requested_by
                .as_deref()
                .map_or(true, |u| request.requested_by() == u)
            && (!self.open_only || request.status().is_open())
    }
}

#[derive(Debug, Clone)]
pub struct RequestRepository {
    store: Store,
}

impl RequestRepository {
    pub fn new(store: Store) -> Self {
        RequestRepository { store }
    }

    /// Allocation requests, newest first.
    pub async fn list_allocation(&self, filter: &RequestFilter) -> Vec<AllocationRequest> {
        let mut requests = self
            .store
            .read(|t| t.allocation_requests.select(|r| filter.matches(r)))
            .await;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = requests.len(), "Listed allocation requests");
        requests
    }

    pub async fn get_allocation(&self, id: &str) -> StoreResult<AllocationRequest> {
        self.store
            .read(|t| t.allocation_requests.get(id).cloned())
            .await
    }

    /// Merchant requests, newest first. `merchant_id` narrows to one merchant.
    pub async fn list_merchant(
        &self,
        filter: &RequestFilter,
        merchant_id: Option<&str>,
    ) -> Vec<MerchantRequest> {
        let mut requests = self
            .store
            .read(|t| {
                t.merchant_requests.select(|r| {
                    filter.matches(r) && merchant_id.map_or(true, |m| r.merchant_id == m)
                })
            })
            .await;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = requests.len(), "Listed merchant requests");
        requests
    }

    pub async fn get_merchant(&self, id: &str) -> StoreResult<MerchantRequest> {
        self.store.read(|t| t.merchant_requests.get(id).cloned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qrdesk_core::{QrType, Review};

    fn request(branch: &str) -> AllocationRequest {
        AllocationRequest {
            id: qrdesk_core::new_id(),
            branch_id: branch.into(),
            requested_by: "u-mgr".into(),
            quantity: 5,
            qr_type: QrType::Static,
            purpose: "restock".into(),
            review: Review::submitted("u-mgr", None, Utc::now()),
            allocated_qr_ids: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_only_includes_returned() {
        let mut returned = request("b-1");
        returned.review.status = RequestStatus::ReturnedForCorrection;
        let mut approved = request("b-1");
        approved.review.status = RequestStatus::Approved;

        let filter = RequestFilter {
            open_only: true,
            ..Default::default()
        };
        assert!(filter.matches(&request("b-1")));
        assert!(filter.matches(&returned));
        assert!(!filter.matches(&approved));
    }

    #[test]
    fn test_branch_filter() {
        let filter = RequestFilter {
            branch_id: Some("b-2".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&request("b-1")));
        assert!(filter.matches(&request("b-2")));
    }
}
