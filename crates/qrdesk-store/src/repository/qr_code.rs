//! # QR Code Repository
//!
//! Listing, lookup and bulk operations on QR codes.
//!
//! ## Bulk Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate_from_pool(branch "1", quantity 10, static)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  count unallocated static codes ── fewer than 10? ──► InsufficientInv. │
//! │       │                                               (nothing moved)  │
//! │       ▼                                                                 │
//! │  take the 10 oldest, allocate each to branch "1"                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  return their ids (for the request and the audit log)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table helpers in this module run inside [`Store::transaction`], so a
//! failure halfway through a bulk operation is rolled back with everything
//! else.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use qrdesk_core::lifecycle::{qr_value_stem, MAX_QR_SEQUENCE};
use qrdesk_core::{CoreError, QrCode, QrStatus, QrType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{Store, Tables};

// =============================================================================
// Filter
// =============================================================================

/// Criteria for listing QR codes. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrCodeFilter {
    pub status: Option<QrStatus>,
    pub qr_type: Option<QrType>,
    pub branch_id: Option<String>,
    pub allocated_to_user_id: Option<String>,
    pub merchant_id: Option<String>,
    pub batch_id: Option<String>,
    /// Substring of the QR value.
    pub search: Option<String>,
}

impl QrCodeFilter {
    pub fn with_status(status: QrStatus) -> Self {
        QrCodeFilter {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn matches(&self, qr: &QrCode) -> bool {
        self.status.map_or(true, |s| qr.status == s)
            && self.qr_type.map_or(true, |t| qr.qr_type == t)
            && self
                .branch_id
                .as_deref()
                .map_or(true, |b| qr.belongs_to_branch(b))
            && self
                .allocated_to_user_id
                .as_deref()
                .map_or(true, |u| qr.allocated_to_user_id.as_deref() == Some(u))
            && self
                .merchant_id
                .as_deref()
                .map_or(true, |m| qr.issued_to_merchant_id.as_deref() == Some(m))
            && self.batch_id.as_deref().map_or(true, |b| qr.batch_id == b)
            && self
                .search
                .as_deref()
                .map_or(true, |s| qr.qr_value.to_lowercase().contains(&s.to_lowercase()))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to QR codes.
#[derive(Debug, Clone)]
pub struct QrCodeRepository {
    store: Store,
}

impl QrCodeRepository {
    pub fn new(store: Store) -> Self {
        QrCodeRepository { store }
    }

    /// Lists codes matching `filter`, in creation order.
    pub async fn list(&self, filter: &QrCodeFilter) -> Vec<QrCode> {
        let codes = self
            .store
            .read(|t| t.qr_codes.select(|qr| filter.matches(qr)))
            .await;
        debug!(count = codes.len(), "Listed QR codes");
        codes
    }

    pub async fn get(&self, id: &str) -> StoreResult<QrCode> {
        self.store.read(|t| t.qr_codes.get(id).cloned()).await
    }

    pub async fn find_by_value(&self, value: &str) -> Option<QrCode> {
        self.store
            .read(|t| t.qr_codes.iter().find(|qr| qr.qr_value == value).cloned())
            .await
    }

    pub async fn count(&self, filter: &QrCodeFilter) -> usize {
        self.store
            .read(|t| t.qr_codes.iter().filter(|qr| filter.matches(qr)).count())
            .await
    }

    pub async fn count_by_status(&self, status: QrStatus) -> usize {
        self.count(&QrCodeFilter::with_status(status)).await
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

impl Tables {
    /// Adds freshly created codes. Refuses any value that already exists.
    pub fn insert_qr_codes(&mut self, codes: Vec<QrCode>) -> StoreResult<usize> {
        let existing: HashSet<&str> = self.qr_codes.iter().map(|qr| qr.qr_value.as_str()).collect();
        if let Some(dup) = codes.iter().find(|qr| existing.contains(qr.qr_value.as_str())) {
            return Err(StoreError::duplicate("qr_value", dup.qr_value.clone()));
        }

        let count = codes.len();
        for qr in codes {
            self.qr_codes.insert(qr)?;
        }
        Ok(count)
    }

    /// Highest sequence already used for the day, or 0. Values past the
    /// six-digit range (possible only through upload) are ignored.
    pub fn last_sequence(&self, prefix: &str, qr_type: QrType, date: chrono::NaiveDate) -> u32 {
        let stem = qr_value_stem(prefix, qr_type, date);
        self.qr_codes
            .iter()
            .filter_map(|qr| qr.qr_value.strip_prefix(stem.as_str()))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .filter(|seq| *seq <= MAX_QR_SEQUENCE)
            .max()
            .unwrap_or(0)
    }

    /// Number of unallocated codes of a type.
    pub fn unallocated_count(&self, qr_type: QrType) -> usize {
        self.qr_codes
            .iter()
            .filter(|qr| qr.status == QrStatus::Unallocated && qr.qr_type == qr_type)
            .count()
    }

    /// Allocates `quantity` unallocated codes of `qr_type` to a branch.
    ///
    /// Either every code moves or, when the pool is short, none does.
    pub fn allocate_from_pool(
        &mut self,
        branch_id: &str,
        quantity: usize,
        qr_type: QrType,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<String>> {
        let available = self.unallocated_count(qr_type);
        if available < quantity {
            return Err(CoreError::InsufficientInventory {
                available,
                requested: quantity,
            }
            .into());
        }

        let mut ids = Vec::with_capacity(quantity);
        for qr in self
            .qr_codes
            .iter_mut()
            .filter(|qr| qr.status == QrStatus::Unallocated && qr.qr_type == qr_type)
            .take(quantity)
        {
            qr.allocate(branch_id, now)?;
            ids.push(qr.id.clone());
        }
        Ok(ids)
    }

    /// Allocates specific codes to a branch.
    pub fn allocate_codes(
        &mut self,
        branch_id: &str,
        qr_ids: &[String],
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        for id in qr_ids {
            self.qr_codes.get_mut(id)?.allocate(branch_id, now)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use qrdesk_core::lifecycle::format_qr_value;

    fn tables_with(static_count: usize, dynamic_count: usize) -> Tables {
        let mut tables = Tables::default();
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut codes = Vec::new();
        for i in 0..static_count {
            codes.push(QrCode::new_unallocated(
                format_qr_value("BNK", QrType::Static, date, i as u32 + 1),
                QrType::Static,
                "batch",
                now,
            ));
        }
        for i in 0..dynamic_count {
            codes.push(QrCode::new_unallocated(
                format_qr_value("BNK", QrType::Dynamic, date, i as u32 + 1),
                QrType::Dynamic,
                "batch",
                now,
            ));
        }
        tables.insert_qr_codes(codes).unwrap();
        tables
    }

    #[test]
    fn test_allocate_from_pool_respects_type() {
        let mut tables = tables_with(5, 3);
        let ids = tables
            .allocate_from_pool("b-1", 4, QrType::Static, Utc::now())
            .unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(tables.unallocated_count(QrType::Static), 1);
        assert_eq!(tables.unallocated_count(QrType::Dynamic), 3);
    }

    #[test]
    fn test_allocate_from_short_pool_moves_nothing() {
        let mut tables = tables_with(2, 0);
        let err = tables
            .allocate_from_pool("b-1", 3, QrType::Static, Utc::now())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only 2 unallocated QR codes available, 3 requested"
        );
        assert_eq!(tables.unallocated_count(QrType::Static), 2);
    }

    #[test]
    fn test_insert_rejects_existing_value() {
        let mut tables = tables_with(1, 0);
        let existing = tables.qr_codes.as_slice()[0].qr_value.clone();
        let dup = QrCode::new_unallocated(existing, QrType::Static, "other", Utc::now());
        assert!(matches!(
            tables.insert_qr_codes(vec![dup]),
            Err(StoreError::Duplicate { .. })
        ));
        assert_eq!(tables.qr_codes.len(), 1);
    }

    #[test]
    fn test_last_sequence() {
        let tables = tables_with(12, 0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(tables.last_sequence("BNK", QrType::Static, date), 12);
        assert_eq!(tables.last_sequence("BNK", QrType::Dynamic, date), 0);
    }

    #[test]
    fn test_last_sequence_ignores_uploaded_overflow() {
        let mut tables = tables_with(3, 0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let oversized = QrCode::new_unallocated("BNK-S-20240101-4294967295", QrType::Static, "upload", Utc::now());
        tables.insert_qr_codes(vec![oversized]).unwrap();
        assert_eq!(tables.last_sequence("BNK", QrType::Static, date), 3);
    }

    #[test]
    fn test_filter_matches() {
        let mut tables = tables_with(3, 0);
        let ids = tables
            .allocate_from_pool("b-1", 1, QrType::Static, Utc::now())
            .unwrap();

        let filter = QrCodeFilter::with_status(QrStatus::Allocated).branch("b-1");
        let hits: Vec<&QrCode> = tables.qr_codes.iter().filter(|qr| filter.matches(qr)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ids[0]);

        let search = QrCodeFilter {
            search: Some("bnk-s-20240101-000003".into()),
            ..Default::default()
        };
        assert_eq!(tables.qr_codes.iter().filter(|qr| search.matches(qr)).count(), 1);
    }
}
