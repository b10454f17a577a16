//! # qrdesk-store: Entity Store for QR Desk
//!
//! Holds every QR code, branch, user, merchant, request and audit record in
//! memory, behind one async read/write lock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        QR Desk Data Flow                                │
//! │                                                                         │
//! │  QrDeskService::approve_request                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  qrdesk-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │     Store     │    │  Repositories │    │   Fixtures   │  │   │
//! │  │   │  (store.rs)   │    │ (qr_code.rs)  │    │ (demo bank)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ RwLock<Tables>│◄───│ QrCodeRepo    │    │ 4 branches   │  │   │
//! │  │   │ transaction() │    │ RequestRepo   │    │ 8 users      │  │   │
//! │  │   │ snapshots     │    │ AuditRepo ... │    │ 236 QR codes │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼ (optional, dev only)                                            │
//! │  qrdesk.json snapshot                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Store handle, configuration, transactions, snapshots
//! - [`table`] - Generic id-keyed table
//! - [`repository`] - Per-entity reads and transaction helpers
//! - [`fixtures`] - Demo data
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qrdesk_store::{Store, StoreConfig};
//!
//! let store = Store::new(StoreConfig::default())?;
//! let pool = store.qr_codes().count_by_status(QrStatus::Unallocated).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fixtures;
pub mod repository;
pub mod store;
pub mod table;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use store::{Store, StoreConfig, Tables};
pub use table::{Entity, Table};

pub use repository::{
    AuditItemFilter, AuditLogFilter, AuditRepository, BranchRepository, KycRepository,
    MerchantFilter, MerchantRepository, QrCodeFilter, QrCodeRepository, RequestFilter,
    RequestRepository, UserRepository,
};
