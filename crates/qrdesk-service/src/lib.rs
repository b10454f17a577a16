//! # qrdesk-service: In-Process API for QR Desk
//!
//! Every front end (the CLI today, a dashboard shell later) talks to QR Desk
//! through [`QrDeskService`]. Each call names the acting user, is checked
//! against the role policy, and either commits all of its changes together
//! with its audit trail entries or changes nothing.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   qrdesk-cli ──────────┐                                               │
//! │   integration tests ───┼──► qrdesk-service (THIS CRATE)                │
//! │                        │        │   QrDeskService, ServiceConfig,      │
//! │                        │        │   ServiceError { code, message }     │
//! │                        │        ▼                                      │
//! │                        │    qrdesk-store   (tables, transactions)      │
//! │                        │        │                                      │
//! │                        │        ▼                                      │
//! │                        └──► qrdesk-core    (rules, policy, reports)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - The [`QrDeskService`] operations, one module per area
//! - [`config`] - Settings file, environment overrides, validation
//! - [`error`] - [`ServiceError`] with stable [`ErrorCode`]s
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qrdesk_service::{QrDeskService, ServiceConfig};
//! use qrdesk_store::fixtures::ADMIN_ID;
//!
//! let service = QrDeskService::new(ServiceConfig::load_or_default(None))?;
//! let stats = service.get_dashboard_stats(ADMIN_ID, None).await?;
//! println!("{} codes in the pool", stats.qr_codes.unallocated);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ServiceConfig;
pub use error::{ConfigError, ConfigResult, ErrorCode, ServiceError, ServiceResult};
pub use service::QrDeskService;

pub use service::allocation::{AllocationRequestUpdate, NewAllocationRequest};
pub use service::audit::{AuditItemUpdate, NewAuditItem};
pub use service::directory::{NewBranch, NewUser};
pub use service::merchant::{MerchantUpdate, NewMerchant};
pub use service::merchant_request::{MerchantRequestUpdate, NewMerchantRequest};
pub use service::qr::AssignmentSync;

pub use qrdesk_core as core;
pub use qrdesk_store as store;
