//! # qrdesk-core: Pure Business Logic for QR Desk
//!
//! QR Desk tracks merchant payment QR codes for a bank: generation, bulk
//! allocation to branches, issuance to KYC-verified merchants, returns and
//! blocking, plus the approval workflows and compliance scoring around them.
//!
//! This crate holds the rules. It never touches storage, clocks or the
//! network; every function takes `now` and the entities it needs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        QR Desk Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 qrdesk-cli / dashboard callers                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    qrdesk-service                               │   │
//! │  │   policy check ─► store transaction ─► audit log ─► response    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ qrdesk-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐           │   │
//! │  │  │lifecycle │ │ workflow │ │  policy  │ │scorecard │           │   │
//! │  │  │ QR table │ │ requests │ │  roles   │ │ reports  │           │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └──────────┘           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO CLOCK • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                qrdesk-store (in-memory tables)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (QrCode, Branch, Merchant, requests, audit)
//! - [`lifecycle`] - QR code transition table
//! - [`workflow`] - Request and KYC state machines
//! - [`policy`] - Role permissions and branch scoping
//! - [`scorecard`] - Compliance scorecard
//! - [`report`] - Audit report aggregation
//! - [`dashboard`] - Dashboard counters and rankings
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use qrdesk_core::{QrCode, QrStatus, QrType};
//!
//! let mut qr = QrCode::new_unallocated("BNK-S-20240101-000001", QrType::Static, "batch-1", Utc::now());
//! qr.allocate("branch-1", Utc::now()).unwrap();
//! assert_eq!(qr.status, QrStatus::Allocated);
//!
//! // Allocating twice is refused
//! assert!(qr.allocate("branch-2", Utc::now()).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dashboard;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod report;
pub mod scorecard;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use policy::Permission;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Highest audit score.
pub const MAX_SCORE: u8 = 100;

/// Score used for an item without a score and for an empty category.
pub const DEFAULT_SCORE: u8 = MAX_SCORE;

/// Maximum length of a reason, note or finding.
pub const MAX_REASON_LENGTH: usize = 500;

/// Default number of entries in each dashboard ranking.
pub const DEFAULT_TOP_N: usize = 5;

/// More open high-risk findings than this rate the scorecard `high`.
pub const HIGH_RISK_THRESHOLD: usize = 2;
