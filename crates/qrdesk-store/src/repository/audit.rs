//! # Audit Repository
//!
//! Two very different tables live here: the auditors' compliance checklist
//! ([`AuditItem`]) and the append-only trail of every change ([`AuditLog`]).
//!
//! ```text
//! service operation ──► transaction ──► tables.append_log(..) ──► audit_logs
//!                                                                 (never edited,
//!                                                                  never deleted)
//! ```

use chrono::{DateTime, Utc};
use qrdesk_core::{AuditAction, AuditCategory, AuditItem, AuditLog, ComplianceStatus, RiskLevel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::{Store, Tables};

// =============================================================================
// Filters
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditItemFilter {
    pub category: Option<AuditCategory>,
    pub status: Option<ComplianceStatus>,
    pub risk_level: Option<RiskLevel>,
    pub branch_id: Option<String>,
}

impl AuditItemFilter {
    pub fn matches(&self, item: &AuditItem) -> bool {
        self.category.map_or(true, |c| item.category == c)
            && self.status.map_or(true, |s| item.status == s)
            && self.risk_level.map_or(true, |r| item.risk_level == r)
            && self
                .branch_id
                .as_deref()
                .map_or(true, |b| item.branch_id.as_deref() == Some(b))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditLogFilter {
    pub actor_user_id: Option<String>,
    pub action_type: Option<AuditAction>,
    pub target_entity: Option<String>,
    pub target_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Newest entries first, at most this many.
    pub limit: Option<usize>,
}

impl AuditLogFilter {
    pub fn action(action_type: AuditAction) -> Self {
        AuditLogFilter {
            action_type: Some(action_type),
            ..Default::default()
        }
    }

    pub fn matches(&self, log: &AuditLog) -> bool {
        self.actor_user_id
            .as_deref()
            .map_or(true, |a| log.actor_user_id == a)
            && self.action_type.map_or(true, |t| log.action_type == t)
            && self
                .target_entity
                .as_deref()
                .map_or(true, |e| log.target_entity == e)
            && self.target_id.as_deref().map_or(true, |id| log.target_id == id)
            && self.from.map_or(true, |from| log.timestamp >= from)
            && self.to.map_or(true, |to| log.timestamp <= to)
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct AuditRepository {
    store: Store,
}

impl AuditRepository {
    pub fn new(store: Store) -> Self {
        AuditRepository { store }
    }

    pub async fn list_items(&self, filter: &AuditItemFilter) -> Vec<AuditItem> {
        let items = self
            .store
            .read(|t| t.audit_items.select(|i| filter.matches(i)))
            .await;
        debug!(count = items.len(), "Listed audit items");
        items
    }

    pub async fn get_item(&self, id: &str) -> StoreResult<AuditItem> {
        self.store.read(|t| t.audit_items.get(id).cloned()).await
    }

    /// Audit trail entries, newest first.
    pub async fn list_logs(&self, filter: &AuditLogFilter) -> Vec<AuditLog> {
        let mut logs = self
            .store
            .read(|t| t.audit_logs.select(|l| filter.matches(l)))
            .await;
        // Stable sort keeps insertion order for equal timestamps, so reverse first
        logs.reverse();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            logs.truncate(limit);
        }
        debug!(count = logs.len(), "Listed audit logs");
        logs
    }

    pub async fn count_logs(&self, filter: &AuditLogFilter) -> usize {
        self.store
            .read(|t| t.audit_logs.iter().filter(|l| filter.matches(l)).count())
            .await
    }
}

impl Tables {
    /// Appends one audit trail entry.
    pub fn append_log(&mut self, entry: AuditLog) -> StoreResult<()> {
        debug!(
            action = %entry.action_type,
            target = %entry.target_id,
            "Audit log appended"
        );
        self.audit_logs.insert(entry)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logs_newest_first_with_limit() {
        let store = Store::in_memory();
        store
            .transaction(|t| {
                for action in [AuditAction::QrGenerated, AuditAction::QrAllocated, AuditAction::QrIssued] {
                    t.append_log(AuditLog::new(
                        "u-1",
                        action,
                        "QrCode",
                        "qr-1",
                        serde_json::json!({}),
                        Utc::now(),
                    ))?;
                }
                Ok(())
            })
            .await
            .unwrap();

        let audit = store.audit();
        let all = audit.list_logs(&AuditLogFilter::default()).await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action_type, AuditAction::QrIssued);

        let limited = audit
            .list_logs(&AuditLogFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await;
        assert_eq!(limited.len(), 1);

        assert_eq!(
            audit
                .count_logs(&AuditLogFilter::action(AuditAction::QrAllocated))
                .await,
            1
        );
    }
}
