//! # Audit
//!
//! Auditors keep a checklist of compliance items per branch. The scorecard
//! and reports aggregate that checklist together with live QR, request and
//! audit trail data.
//!
//! ```text
//! audit_items ──► generate_scorecard ──► AuditScorecard
//!      │
//!      ├─ qr_codes, requests, users ─┐
//!      └─ audit_logs ────────────────┴──► build_report(type, filter) ──► AuditReport
//! ```

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::report::{build_report, AuditReport, ReportFilter, ReportInput, ReportType};
use qrdesk_core::scorecard::{generate_scorecard, AuditScorecard};
use qrdesk_core::validation::{validate_score, validate_text};
use qrdesk_core::{
    AuditAction, AuditCategory, AuditItem, AuditLog, ComplianceStatus, RiskLevel, ValidationError,
};
use qrdesk_store::{AuditItemFilter, AuditLogFilter, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use ts_rs::TS;

use super::{authorize_in, record, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

/// Input for [`QrDeskService::create_audit_item`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditItem {
    pub title: String,
    pub description: String,
    pub category: AuditCategory,
    pub risk_level: RiskLevel,
    pub status: ComplianceStatus,
    pub score: Option<u8>,
    pub branch_id: Option<String>,
    pub findings: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub status: Option<ComplianceStatus>,
    pub score: Option<u8>,
    pub findings: Option<String>,
}

impl QrDeskService {
    // =========================================================================
    // Checklist
    // =========================================================================

    /// Adds an item to the compliance checklist.
    pub async fn create_audit_item(&self, actor_id: &str, input: NewAuditItem) -> ServiceResult<AuditItem> {
        let item = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::ManageAuditItems, input.branch_id.as_deref())?;
                validate_text("title", &input.title, 150)?;
                validate_text("description", &input.description, 1000)?;
                if let Some(score) = input.score {
                    validate_score(score)?;
                }
                if let Some(branch_id) = input.branch_id.as_deref() {
                    t.branches.get(branch_id)?;
                }

                let now = Utc::now();
                let item = AuditItem {
                    id: qrdesk_core::new_id(),
                    title: input.title.trim().to_string(),
                    description: input.description.trim().to_string(),
                    category: input.category,
                    risk_level: input.risk_level,
                    status: input.status,
                    score: input.score,
                    branch_id: input.branch_id.clone(),
                    findings: input.findings.as_deref().map(|f| f.trim().to_string()),
                    created_by: actor_id.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                t.audit_items.insert(item.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::AuditItemCreated,
                    "AuditItem",
                    &item.id,
                    json!({
                        "category": item.category,
                        "riskLevel": item.risk_level,
                        "status": item.status,
                        "branchId": item.branch_id,
                    }),
                    now,
                )?;
                Ok(item)
            })
            .await?;

        info!(item_id = %item.id, category = %item.category, "Audit item created");
        Ok(item)
    }

    pub async fn update_audit_item(
        &self,
        actor_id: &str,
        item_id: &str,
        update: AuditItemUpdate,
    ) -> ServiceResult<AuditItem> {
        let item = self
            .store()
            .transaction(|t| {
                let mut item = t.audit_items.get(item_id)?.clone();
                authorize_in(t, actor_id, Permission::ManageAuditItems, item.branch_id.as_deref())?;

                if let Some(title) = update.title.as_deref() {
                    validate_text("title", title, 150)?;
                    item.title = title.trim().to_string();
                }
                if let Some(description) = update.description.as_deref() {
                    validate_text("description", description, 1000)?;
                    item.description = description.trim().to_string();
                }
                if let Some(score) = update.score {
                    validate_score(score)?;
                    item.score = Some(score);
                }
                if let Some(risk_level) = update.risk_level {
                    item.risk_level = risk_level;
                }
                if let Some(status) = update.status {
                    item.status = status;
                }
                if let Some(findings) = update.findings.as_deref() {
                    item.findings = Some(findings.trim().to_string());
                }

                let now = Utc::now();
                item.updated_at = now;
                *t.audit_items.get_mut(item_id)? = item.clone();
                record(
                    t,
                    actor_id,
                    AuditAction::AuditItemUpdated,
                    "AuditItem",
                    item_id,
                    json!({
                        "status": update.status,
                        "riskLevel": update.risk_level,
                        "score": update.score,
                    }),
                    now,
                )?;
                Ok(item)
            })
            .await?;

        info!(item_id = %item_id, status = %item.status, "Audit item updated");
        Ok(item)
    }

    /// Checklist items matching `filter`. Branch-scoped callers only see
    /// their own branch.
    pub async fn get_audit_items(&self, actor_id: &str, filter: AuditItemFilter) -> ServiceResult<Vec<AuditItem>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, filter.branch_id.as_deref()))
            .await?;

        let filter = AuditItemFilter {
            branch_id: scope,
            ..filter
        };
        let items = self.store().audit().list_items(&filter).await;
        debug!(actor_id, count = items.len(), "Listed audit items");
        Ok(items)
    }

    // =========================================================================
    // Scorecard & Reports
    // =========================================================================

    /// Scores the checklist, for one branch or the whole bank.
    pub async fn generate_audit_scorecard(
        &self,
        actor_id: &str,
        branch_id: Option<&str>,
    ) -> ServiceResult<AuditScorecard> {
        let scorecard = self
            .store()
            .read(|t| -> StoreResult<AuditScorecard> {
                authorize_in(t, actor_id, Permission::ViewAuditReports, None)?;
                if let Some(branch_id) = branch_id {
                    t.branches.get(branch_id)?;
                }
                Ok(generate_scorecard(t.audit_items.as_slice(), branch_id, Utc::now()))
            })
            .await?;

        info!(
            branch_id = branch_id.unwrap_or("all"),
            overall = scorecard.overall_score,
            risk = %scorecard.risk_level,
            "Audit scorecard generated"
        );
        Ok(scorecard)
    }

    /// Builds a report over live data.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` when `from` is after `to`
    /// - `NOT_FOUND` for an unknown branch
    pub async fn generate_audit_report(
        &self,
        actor_id: &str,
        report_type: ReportType,
        filter: ReportFilter,
    ) -> ServiceResult<AuditReport> {
        let report = self
            .store()
            .read(|t| -> StoreResult<AuditReport> {
                authorize_in(t, actor_id, Permission::ViewAuditReports, None)?;
                filter.validate()?;
                if let Some(branch_id) = filter.branch_id.as_deref() {
                    t.branches.get(branch_id)?;
                }

                let input = ReportInput {
                    qr_codes: t.qr_codes.as_slice(),
                    branches: t.branches.as_slice(),
                    users: t.users.as_slice(),
                    allocation_requests: t.allocation_requests.as_slice(),
                    merchant_requests: t.merchant_requests.as_slice(),
                    audit_items: t.audit_items.as_slice(),
                    audit_logs: t.audit_logs.as_slice(),
                };
                Ok(build_report(report_type, &input, &filter, Utc::now()))
            })
            .await?;

        info!(
            report_type = %report_type,
            sections = report.sections.len(),
            "Audit report generated"
        );
        Ok(report)
    }

    // =========================================================================
    // Audit Trail
    // =========================================================================

    /// Audit trail entries matching `filter`, newest first.
    pub async fn get_audit_logs(&self, actor_id: &str, filter: AuditLogFilter) -> ServiceResult<Vec<AuditLog>> {
        self.store()
            .read(|t| -> StoreResult<()> {
                authorize_in(t, actor_id, Permission::ViewAuditReports, None)?;
                if let (Some(from), Some(to)) = (filter.from, filter.to) {
                    if from > to {
                        return Err(ValidationError::InvalidFormat {
                            field: "period".to_string(),
                            reason: "from must not be after to".to_string(),
                        }
                        .into());
                    }
                }
                Ok(())
            })
            .await?;

        let logs = self.store().audit().list_logs(&filter).await;
        debug!(actor_id, count = logs.len(), "Listed audit logs");
        Ok(logs)
    }
}
