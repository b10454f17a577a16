//! # KYC Repository

use qrdesk_core::{KycRequest, KycRequestStatus};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct KycRepository {
    store: Store,
}

impl KycRepository {
    pub fn new(store: Store) -> Self {
        KycRepository { store }
    }

    /// KYC requests, newest first, optionally for one branch and/or status.
    pub async fn list(
        &self,
        branch_id: Option<&str>,
        status: Option<KycRequestStatus>,
    ) -> Vec<KycRequest> {
        let mut requests = self
            .store
            .read(|t| {
                t.kyc_requests.select(|r| {
                    branch_id.map_or(true, |b| r.branch_id.as_deref() == Some(b))
                        && status.map_or(true, |s| r.status == s)
                })
            })
            .await;
        requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        debug!(count = requests.len(), "Listed KYC requests");
        requests
    }

    pub async fn get(&self, id: &str) -> StoreResult<KycRequest> {
        self.store.read(|t| t.kyc_requests.get(id).cloned()).await
    }

    /// Every request ever submitted for a merchant, oldest first.
    pub async fn history(&self, merchant_id: &str) -> Vec<KycRequest> {
        self.store
            .read(|t| t.kyc_requests.select(|r| r.merchant_id == merchant_id))
            .await
    }
}
