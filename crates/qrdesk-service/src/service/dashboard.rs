//! # Dashboard
//!
//! Headline numbers for the landing screen. Branch-scoped users always get
//! their own branch's slice; global roles may pick a branch or see all.

use chrono::Utc;
use qrdesk_core::dashboard::{compute_dashboard, DashboardInput, DashboardStats};
use qrdesk_core::policy::Permission;
use qrdesk_store::StoreResult;
use tracing::debug;

use super::{view_scope_in, QrDeskService};
use crate::error::ServiceResult;

impl QrDeskService {
    pub async fn get_dashboard_stats(
        &self,
        actor_id: &str,
        branch_id: Option<&str>,
    ) -> ServiceResult<DashboardStats> {
        let top_n = self.config().dashboard.top_n;

        let stats = self
            .store()
            .read(|t| -> StoreResult<DashboardStats> {
                let (_, scope) = view_scope_in(t, actor_id, Permission::ViewDashboard, branch_id)?;
                if let Some(branch_id) = scope.as_deref() {
                    t.branches.get(branch_id)?;
                }

                let input = DashboardInput {
                    qr_codes: t.qr_codes.as_slice(),
                    branches: t.branches.as_slice(),
                    users: t.users.as_slice(),
                    merchants: t.merchants.as_slice(),
                    allocation_requests: t.allocation_requests.as_slice(),
                    merchant_requests: t.merchant_requests.as_slice(),
                    kyc_requests: t.kyc_requests.as_slice(),
                };
                Ok(compute_dashboard(&input, scope.as_deref(), top_n, Utc::now()))
            })
            .await?;

        debug!(
            actor_id,
            branch_id = stats.branch_id.as_deref().unwrap_or("all"),
            total_qr = stats.qr_codes.total,
            "Dashboard stats computed"
        );
        Ok(stats)
    }
}
