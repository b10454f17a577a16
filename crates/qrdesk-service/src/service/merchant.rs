//! # Merchants
//!
//! Branch staff onboard and maintain merchants. A new merchant starts with
//! KYC `pending`; only the KYC workflow changes that status.

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::validation::{validate_email, validate_phone, validate_text};
use qrdesk_core::{AuditAction, KycStatus, Merchant};
use qrdesk_store::{MerchantFilter, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use ts_rs::TS;

use super::{authorize_in, ensure_visible, record, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

/// Input for [`QrDeskService::create_merchant`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewMerchant {
    pub legal_name: String,
    pub shop_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    /// Defaults to the creator's branch.
    pub branch_id: Option<String>,
}

/// Contact details that may change after onboarding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MerchantUpdate {
    pub legal_name: Option<String>,
    pub shop_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

fn validate_new_merchant(input: &NewMerchant) -> StoreResult<()> {
    validate_text("legal_name", &input.legal_name, 150)?;
    validate_text("shop_name", &input.shop_name, 150)?;
    validate_text("contact_name", &input.contact_name, 100)?;
    validate_phone(&input.phone)?;
    if let Some(email) = input.email.as_deref() {
        validate_email(email)?;
    }
    validate_text("address", &input.address, 250)?;
    Ok(())
}

impl QrDeskService {
    /// Onboards a merchant with KYC `pending`.
    pub async fn create_merchant(&self, actor_id: &str, input: NewMerchant) -> ServiceResult<Merchant> {
        let merchant = self
            .store()
            .transaction(|t| {
                let branch_id = input
                    .branch_id
                    .clone()
                    .or_else(|| t.users.find(actor_id).and_then(|u| u.branch_id.clone()));
                authorize_in(t, actor_id, Permission::ManageMerchants, branch_id.as_deref())?;
                if let Some(branch_id) = branch_id.as_deref() {
                    t.branches.get(branch_id)?;
                }
                validate_new_merchant(&input)?;

                let now = Utc::now();
                let merchant = Merchant {
                    id: qrdesk_core::new_id(),
                    legal_name: input.legal_name.trim().to_string(),
                    shop_name: input.shop_name.trim().to_string(),
                    contact_name: input.contact_name.trim().to_string(),
                    phone: input.phone.trim().to_string(),
                    email: input.email.as_deref().map(|e| e.trim().to_string()),
                    address: input.address.trim().to_string(),
                    kyc_status: KycStatus::Pending,
                    branch_id,
                    created_by: actor_id.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                t.merchants.insert(merchant.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::MerchantCreated,
                    "Merchant",
                    &merchant.id,
                    json!({ "shopName": merchant.shop_name, "branchId": merchant.branch_id }),
                    now,
                )?;
                Ok(merchant)
            })
            .await?;

        info!(merchant_id = %merchant.id, "Merchant created");
        Ok(merchant)
    }

    /// Changes a merchant's contact details.
    pub async fn update_merchant(
        &self,
        actor_id: &str,
        merchant_id: &str,
        update: MerchantUpdate,
    ) -> ServiceResult<Merchant> {
        let merchant = self
            .store()
            .transaction(|t| {
                let mut merchant = t.merchants.get(merchant_id)?.clone();
                authorize_in(t, actor_id, Permission::ManageMerchants, merchant.branch_id.as_deref())?;

                let mut changed = Vec::new();
                if let Some(v) = update.legal_name.as_deref() {
                    validate_text("legal_name", v, 150)?;
                    merchant.legal_name = v.trim().to_string();
                    changed.push("legalName");
                }
                if let Some(v) = update.shop_name.as_deref() {
                    validate_text("shop_name", v, 150)?;
                    merchant.shop_name = v.trim().to_string();
                    changed.push("shopName");
                }
                if let Some(v) = update.contact_name.as_deref() {
                    validate_text("contact_name", v, 100)?;
                    merchant.contact_name = v.trim().to_string();
                    changed.push("contactName");
                }
                if let Some(v) = update.phone.as_deref() {
                    validate_phone(v)?;
                    merchant.phone = v.trim().to_string();
                    changed.push("phone");
                }
                if let Some(v) = update.email.as_deref() {
                    validate_email(v)?;
                    merchant.email = Some(v.trim().to_string());
                    changed.push("email");
                }
                if let Some(v) = update.address.as_deref() {
                    validate_text("address", v, 250)?;
                    merchant.address = v.trim().to_string();
                    changed.push("address");
                }

                let now = Utc::now();
                merchant.updated_at = now;
                *t.merchants.get_mut(merchant_id)? = merchant.clone();
                record(
                    t,
                    actor_id,
                    AuditAction::MerchantUpdated,
                    "Merchant",
                    merchant_id,
                    json!({ "fields": changed }),
                    now,
                )?;
                Ok(merchant)
            })
            .await?;

        info!(merchant_id = %merchant_id, "Merchant updated");
        Ok(merchant)
    }

    /// Merchants matching `filter`. Branch-scoped callers only see their
    /// own branch.
    pub async fn get_merchants(&self, actor_id: &str, filter: MerchantFilter) -> ServiceResult<Vec<Merchant>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, filter.branch_id.as_deref()))
            .await?;

        let filter = MerchantFilter {
            branch_id: scope,
            ..filter
        };
        let merchants = self.store().merchants().list(&filter).await;
        debug!(actor_id, count = merchants.len(), "Listed merchants");
        Ok(merchants)
    }

    pub async fn get_merchant(&self, actor_id: &str, merchant_id: &str) -> ServiceResult<Merchant> {
        let merchant = self
            .store()
            .read(|t| -> StoreResult<Merchant> {
                let user = authorize_in(t, actor_id, Permission::ViewRecords, None)?;
                let merchant = t.merchants.get(merchant_id)?;
                if merchant.branch_id.is_some() {
                    ensure_visible(&user, merchant.branch_id.as_deref())?;
                }
                Ok(merchant.clone())
            })
            .await?;
        Ok(merchant)
    }
}
