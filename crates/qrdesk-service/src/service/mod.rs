//! # QR Desk Service
//!
//! [`QrDeskService`] is the single entry point for every operation. Each
//! method takes the acting user's id first.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  service.issue_qr_code(actor_id, qr_id, merchant_id)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.transaction(|t| {                                               │
//! │       │                                                                 │
//! │       ├── authorize_on(t, actor_id, IssueQrCodes, qr branch)           │
//! │       │      └── inactive / role / branch scope ──► FORBIDDEN          │
//! │       │                                                                 │
//! │       ├── qr.issue(&merchant, ...)        (qrdesk-core lifecycle)      │
//! │       │      └── wrong status / KYC / branch ──► CONFLICT, BUSINESS_RULE│
//! │       │                                                                 │
//! │       └── record(t, QR_ISSUED, ...)       (audit trail, same commit)   │
//! │  })                                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ok(updated QrCode)  or  Err(ServiceError) with nothing changed        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads take the store's read lock, resolve the caller's branch scope and
//! hand back owned copies.
//!
//! ## Modules
//! - [`directory`] - Branches and users
//! - [`merchant`] - Merchants
//! - [`qr`] - QR generation, allocation and lifecycle
//! - [`allocation`] - Branch allocation requests
//! - [`merchant_request`] - Merchant QR requests
//! - [`kyc`] - KYC requests
//! - [`audit`] - Audit items, scorecard, reports, audit trail
//! - [`dashboard`] - Dashboard statistics

pub mod allocation;
pub mod audit;
pub mod dashboard;
pub mod directory;
pub mod kyc;
pub mod merchant;
pub mod merchant_request;
pub mod qr;
mod review;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use qrdesk_core::policy::{self, Permission};
use qrdesk_core::{AuditAction, AuditLog, CoreError, CoreResult, User};
use qrdesk_store::{Store, StoreResult, Tables};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceResult;

// =============================================================================
// Service Handle
// =============================================================================

/// The QR Desk API. Cheap to clone.
///
/// ## Usage
/// ```rust,ignore
/// let service = QrDeskService::new(ServiceConfig::load_or_default(None))?;
///
/// let request = service
///     .approve_request(ADMIN_ID, "ar-demo-1", Some("Approved for Q3".into()))
///     .await?;
/// assert_eq!(request.allocated_qr_ids.len(), 25);
/// ```
#[derive(Debug, Clone)]
pub struct QrDeskService {
    store: Store,
    config: Arc<ServiceConfig>,
}

impl QrDeskService {
    /// Builds the store described by `config` and wraps it.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let store = Store::new(config.to_store_config())?;
        Ok(QrDeskService::with_store(store, config))
    }

    /// Wraps an existing store.
    pub fn with_store(store: Store, config: ServiceConfig) -> Self {
        info!(
            prefix = %config.qr.prefix,
            enforce_kyc = config.workflow.enforce_kyc_on_issue,
            "QR Desk service ready"
        );
        QrDeskService {
            store,
            config: Arc::new(config),
        }
    }

    /// A service over the demo bank with default settings.
    pub fn demo() -> ServiceResult<Self> {
        QrDeskService::new(ServiceConfig::default())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads the actor and checks the policy table.
///
/// `target_branch` of `None` means the target carries no branch.
pub(crate) fn authorize_in(
    t: &Tables,
    actor_id: &str,
    permission: Permission,
    target_branch: Option<&str>,
) -> StoreResult<User> {
    let user = t.users.get(actor_id)?.clone();
    refuse_logged(&user, permission, policy::authorize(&user, permission, target_branch))?;
    Ok(user)
}

/// Like [`authorize_in`], but a branch-scoped user may not touch a target
/// outside their branch, including one that has no branch.
pub(crate) fn authorize_on(
    t: &Tables,
    actor_id: &str,
    permission: Permission,
    target_branch: Option<&str>,
) -> StoreResult<User> {
    let user = authorize_in(t, actor_id, permission, target_branch)?;
    refuse_logged(&user, permission, ensure_visible(&user, target_branch))?;
    Ok(user)
}

/// Authorizes a read and works out which branch it is narrowed to.
pub(crate) fn view_scope_in(
    t: &Tables,
    actor_id: &str,
    permission: Permission,
    requested_branch: Option<&str>,
) -> StoreResult<(User, Option<String>)> {
    let user = authorize_in(t, actor_id, permission, None)?;
    let scope = refuse_logged(
        &user,
        permission,
        policy::resolve_view_scope(&user, requested_branch),
    )?;
    Ok((user, scope))
}

/// Branch-scoped users only see entities of their own branch.
pub(crate) fn ensure_visible(user: &User, branch_id: Option<&str>) -> CoreResult<()> {
    if user.role.is_branch_scoped() && branch_id != user.branch_id.as_deref() {
        return Err(CoreError::OutOfScope {
            user_id: user.id.clone(),
            branch_id: branch_id.unwrap_or("unassigned").to_string(),
        });
    }
    Ok(())
}

fn refuse_logged<T>(user: &User, permission: Permission, outcome: CoreResult<T>) -> CoreResult<T> {
    if let Err(err) = &outcome {
        warn!(
            actor_id = %user.id,
            role = %user.role,
            permission = %permission,
            error = %err,
            "Operation refused"
        );
    }
    outcome
}

/// Appends one audit trail entry inside the current transaction.
pub(crate) fn record(
    t: &mut Tables,
    actor_id: &str,
    action: AuditAction,
    target_entity: &str,
    target_id: &str,
    payload: serde_json::Value,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    t.append_log(AuditLog::new(actor_id, action, target_entity, target_id, payload, now))
}
