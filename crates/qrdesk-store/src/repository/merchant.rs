//! # Merchant Repository

use qrdesk_core::{KycStatus, Merchant};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::Store;

/// Criteria for listing merchants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MerchantFilter {
    pub branch_id: Option<String>,
    pub kyc_status: Option<KycStatus>,
    /// Substring of legal or shop name.
    pub search: Option<String>,
}

impl MerchantFilter {
    pub fn matches(&self, merchant: &Merchant) -> bool {
        let search = self.search.as_deref().map(str::to_lowercase);

        self.branch_id
            .as_deref()
            .map_or(true, |b| merchant.branch_id.as_deref() == Some(b))
            && self.kyc_status.map_or(true, |s| merchant.kyc_status == s)
            && search.map_or(true, |s| {
                merchant.legal_name.to_lowercase().contains(&s)
                    || merchant.shop_name.to_lowercase().contains(&s)
            })
    }
}

#[derive(Debug, Clone)]
pub struct MerchantRepository {
    store: Store,
}

impl MerchantRepository {
    pub fn new(store: Store) -> Self {
        MerchantRepository { store }
    }

    pub async fn list(&self, filter: &MerchantFilter) -> Vec<Merchant> {
        let merchants = self
            .store
            .read(|t| t.merchants.select(|m| filter.matches(m)))
            .await;
        debug!(count = merchants.len(), "Listed merchants");
        merchants
    }

    pub async fn get(&self, id: &str) -> StoreResult<Merchant> {
        self.store.read(|t| t.merchants.get(id).cloned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_filter_by_name_and_status() {
        let merchant = Merchant {
            id: "m-1".into(),
            legal_name: "Annapurna Traders".into(),
            shop_name: "Annapurna Store".into(),
            contact_name: "Hari".into(),
            phone: "9800000002".into(),
            email: None,
            address: "Baneshwor".into(),
            kyc_status: KycStatus::Verified,
            branch_id: Some("b-1".into()),
            created_by: "u-1".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let by_name = MerchantFilter {
            search: Some("traders".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&merchant));

        let pending = MerchantFilter {
            kyc_status: Some(KycStatus::Pending),
            ..Default::default()
        };
        assert!(!pending.matches(&merchant));
    }
}
