//! # Repository Module
//!
//! Read access to the store, one repository per entity family, plus the
//! table helpers that write inside a transaction.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Service operation                                                     │
//! │       │                                                                 │
//! │       │  store.qr_codes().list(&filter)          (read lock)           │
//! │       │  store.transaction(|t| t.allocate_from_pool(..))  (write lock) │
//! │       ▼                                                                 │
//! │  QrCodeRepository / Tables helpers                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Tables (in memory)                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`QrCodeRepository`] - QR listing, lookup, bulk allocation
//! - [`BranchRepository`] / [`UserRepository`] - Directory
//! - [`MerchantRepository`] - Merchants
//! - [`RequestRepository`] - Allocation and merchant requests
//! - [`KycRepository`] - KYC requests
//! - [`AuditRepository`] - Audit items and the audit trail

pub mod audit;
pub mod branch;
pub mod kyc;
pub mod merchant;
pub mod qr_code;
pub mod request;
pub mod user;

pub use audit::{AuditItemFilter, AuditLogFilter, AuditRepository};
pub use branch::BranchRepository;
pub use kyc::KycRepository;
pub use merchant::{MerchantFilter, MerchantRepository};
pub use qr_code::{QrCodeFilter, QrCodeRepository};
pub use request::{RequestFilter, RequestRepository};
pub use user::UserRepository;
