//! # Store Handle
//!
//! The [`Store`] owns every table behind one async read/write lock.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Store                                           │
//! │                                                                         │
//! │  StoreConfig::default() ← snapshot path, demo seeding                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Store::new(config) ← load snapshot / seed demo data / start empty     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────── Arc<RwLock<Tables>> ───────────────────┐    │
//! │  │ qr_codes │ branches │ users │ merchants │ requests │ kyc │ ... │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                   │                             │
//! │   read lock                           write lock                        │
//! │       │                                   │                             │
//! │  store.qr_codes().list(..)      store.transaction(|t| { ... })          │
//! │  (many readers at once)         (one writer, all-or-nothing)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//! The closure runs against a working copy of the tables while the write
//! lock is held. The copy replaces the live tables only if the closure
//! returns `Ok`, so a failed approval leaves every QR code untouched and two
//! racing approvals run one after the other. The append-only audit trail
//! stays out of the copy and is truncated back on rollback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use qrdesk_core::{
    AllocationRequest, AuditItem, AuditLog, Branch, KycRequest, Merchant, MerchantRequest,
    QrCode, User,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::fixtures;
use crate::repository::{
    AuditRepository, BranchRepository, KycRepository, MerchantRepository, QrCodeRepository,
    RequestRepository, UserRepository,
};
use crate::table::Table;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust
/// use qrdesk_store::StoreConfig;
///
/// let config = StoreConfig::default()
///     .seed_demo_data(false)
///     .snapshot_path("./qrdesk.json");
/// assert!(!config.seed_demo_data);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// JSON snapshot to load at startup, if the file exists.
    pub snapshot_path: Option<PathBuf>,

    /// Seed demo data when no snapshot was loaded.
    /// Default: true
    pub seed_demo_data: bool,

    /// Prefix used for seeded QR values.
    /// Default: "BNK"
    pub qr_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            snapshot_path: None,
            seed_demo_data: true,
            qr_prefix: "BNK".to_string(),
        }
    }
}

impl StoreConfig {
    /// An empty store with nothing loaded (for tests).
    pub fn in_memory() -> Self {
        StoreConfig {
            seed_demo_data: false,
            ..Default::default()
        }
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn seed_demo_data(mut self, seed: bool) -> Self {
        self.seed_demo_data = seed;
        self
    }

    pub fn qr_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.qr_prefix = prefix.into();
        self
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Every table. Also the snapshot file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tables {
    pub branches: Table<Branch>,
    pub users: Table<User>,
    pub merchants: Table<Merchant>,
    pub qr_codes: Table<QrCode>,
    pub allocation_requests: Table<AllocationRequest>,
    pub merchant_requests: Table<MerchantRequest>,
    pub kyc_requests: Table<KycRequest>,
    pub audit_items: Table<AuditItem>,
    pub audit_logs: Table<AuditLog>,
}

impl Tables {
    /// Reads a snapshot file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes a snapshot file, replacing any existing one.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// Shared handle to the tables. Cheap to clone.
///
/// ## Usage
/// ```rust,ignore
/// let store = Store::new(StoreConfig::default())?;
///
/// // Reads go through repositories
/// let unallocated = store.qr_codes().count_by_status(QrStatus::Unallocated).await;
///
/// // Writes go through a transaction
/// store.transaction(|t| {
///     t.qr_codes.get_mut(&qr_id)?.block("stolen", &actor_id, Utc::now())?;
///     Ok(())
/// }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    tables: Arc<RwLock<Tables>>,
}

impl Store {
    /// Creates a store.
    ///
    /// ## What This Does
    /// 1. Loads `snapshot_path` if configured and present
    /// 2. Otherwise seeds demo data if `seed_demo_data`
    /// 3. Otherwise starts empty
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let tables = match config.snapshot_path.as_deref() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading store snapshot");
                Tables::load(path)?
            }
            Some(path) if !config.seed_demo_data => {
                warn!(path = %path.display(), "Snapshot not found, starting empty");
                Tables::default()
            }
            _ if config.seed_demo_data => {
                info!("Seeding demo data");
                fixtures::demo_tables(&config.qr_prefix, Utc::now())?
            }
            _ => Tables::default(),
        };

        info!(
            qr_codes = tables.qr_codes.len(),
            branches = tables.branches.len(),
            users = tables.users.len(),
            "Store ready"
        );

        Ok(Store::from_tables(tables))
    }

    /// An empty store (for tests).
    pub fn in_memory() -> Self {
        Store::from_tables(Tables::default())
    }

    pub fn from_tables(tables: Tables) -> Self {
        Store {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Runs `f` under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let guard = self.tables.read().await;
        f(&guard)
    }

    /// Runs `f` as one all-or-nothing change.
    ///
    /// The working copy leaves out the audit trail: `f` appends to the live
    /// log, and a rollback truncates it back. Only appends are undone, so
    /// `f` must never edit existing log rows. Write cost follows the entity
    /// tables, not the length of the history.
    ///
    /// ## Returns
    /// * `Ok(R)` - `f` succeeded and its changes are live
    /// * `Err(StoreError)` - `f` failed and nothing changed
    pub async fn transaction<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Tables) -> StoreResult<R>,
    {
        let mut guard = self.tables.write().await;
        let logs = std::mem::take(&mut guard.audit_logs);
        let logged = logs.len();

        let mut working = guard.clone();
        working.audit_logs = logs;

        match f(&mut working) {
            Ok(out) => {
                *guard = working;
                Ok(out)
            }
            Err(err) => {
                working.audit_logs.truncate(logged);
                guard.audit_logs = std::mem::take(&mut working.audit_logs);
                debug!(error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }

    /// Clones every table.
    pub async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }

    /// Writes the current tables to a JSON file.
    pub async fn save_snapshot(&self, path: &Path) -> StoreResult<()> {
        let tables = self.snapshot().await;
        tables.save(path)?;
        info!(path = %path.display(), "Store snapshot written");
        Ok(())
    }

    pub fn qr_codes(&self) -> QrCodeRepository {
        QrCodeRepository::new(self.clone())
    }

    pub fn branches(&self) -> BranchRepository {
        BranchRepository::new(self.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.clone())
    }

    pub fn merchants(&self) -> MerchantRepository {
        MerchantRepository::new(self.clone())
    }

    pub fn requests(&self) -> RequestRepository {
        RequestRepository::new(self.clone())
    }

    pub fn kyc(&self) -> KycRepository {
        KycRepository::new(self.clone())
    }

    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use qrdesk_core::{AuditAction, QrStatus, QrType};

    fn qr(value: &str) -> QrCode {
        QrCode::new_unallocated(value, QrType::Static, "batch", Utc::now())
    }

    #[tokio::test]
    async fn test_transaction_commits() {
        let store = Store::in_memory();
        store
            .transaction(|t| {
                t.qr_codes.insert(qr("A-1"))?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.read(|t| t.qr_codes.len()).await, 1);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_error() {
        let store = Store::in_memory();
        store
            .transaction(|t| {
                t.qr_codes.insert(qr("A-1"))?;
                Ok(())
            })
            .await
            .unwrap();

        let result: StoreResult<()> = store
            .transaction(|t| {
                for code in t.qr_codes.iter_mut() {
                    code.allocate("b-1", Utc::now())?;
                }
                t.qr_codes.insert(qr("A-2"))?;
                Err(StoreError::not_found("Branch", "b-1"))
            })
            .await;

        assert!(result.is_err());
        let tables = store.snapshot().await;
        assert_eq!(tables.qr_codes.len(), 1);
        assert!(tables.qr_codes.iter().all(|q| q.status == QrStatus::Unallocated));
    }

    #[tokio::test]
    async fn test_rollback_keeps_history_and_drops_new_entries() {
        let store = Store::in_memory();
        let entry = |target: &str| {
            AuditLog::new("u-1", AuditAction::QrGenerated, "QrBatch", target, serde_json::json!({}), Utc::now())
        };

        store
            .transaction(|t| t.append_log(entry("batch-1")))
            .await
            .unwrap();

        let result: StoreResult<()> = store
            .transaction(|t| {
                t.append_log(entry("batch-2"))?;
                assert_eq!(t.audit_logs.len(), 2);
                Err(StoreError::not_found("Branch", "b-1"))
            })
            .await;
        assert!(result.is_err());

        let logs = store.read(|t| t.audit_logs.select(|_| true)).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].target_id, "batch-1");
    }

    #[tokio::test]
    async fn test_demo_store_is_seeded() {
        let store = Store::new(StoreConfig::default()).unwrap();
        let tables = store.snapshot().await;
        assert!(tables.branches.len() > 1);
        assert!(tables.qr_codes.len() >= 200);
    }

    #[tokio::test]
    async fn test_empty_store_config() {
        let store = Store::new(StoreConfig::in_memory()).unwrap();
        assert_eq!(store.read(|t| t.users.len()).await, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::default()
            .seed_demo_data(false)
            .qr_prefix("NBL")
            .snapshot_path("/tmp/qrdesk.json");

        assert!(!config.seed_demo_data);
        assert_eq!(config.qr_prefix, "NBL");
        assert!(config.snapshot_path.is_some());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("qrdesk-{}.json", qrdesk_core::new_id()));
        let store = Store::new(StoreConfig::default()).unwrap();
        store.save_snapshot(&path).await.unwrap();

        let loaded = Store::new(StoreConfig::in_memory().snapshot_path(&path)).unwrap();
        assert_eq!(
            loaded.read(|t| t.qr_codes.len()).await,
            store.read(|t| t.qr_codes.len()).await
        );
        let _ = std::fs::remove_file(&path);
    }
}
