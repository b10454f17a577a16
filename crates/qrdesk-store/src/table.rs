//! # Tables
//!
//! A [`Table`] is an insertion-ordered list of one entity type with lookups
//! by id. Ids are unique within a table.

use qrdesk_core::{
    AllocationRequest, AuditItem, AuditLog, Branch, KycRequest, Merchant, MerchantRequest,
    QrCode, User,
};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Anything stored in a [`Table`].
pub trait Entity: Clone {
    /// Entity name used in NotFound errors.
    const NAME: &'static str;

    fn id(&self) -> &str;
}

macro_rules! entity {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl Entity for $ty {
                const NAME: &'static str = $name;

                fn id(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

entity!(
    QrCode => "QrCode",
    Branch => "Branch",
    User => "User",
    Merchant => "Merchant",
    AllocationRequest => "AllocationRequest",
    MerchantRequest => "MerchantRequest",
    KycRequest => "KycRequest",
    AuditItem => "AuditItem",
    AuditLog => "AuditLog",
);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table { rows: Vec::new() }
    }
}

impl<T: Entity> Table<T> {
    pub fn find(&self, id: &str) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == id)
    }

    pub fn get(&self, id: &str) -> StoreResult<&T> {
        self.find(id).ok_or_else(|| StoreError::not_found(T::NAME, id))
    }

    pub fn get_mut(&mut self, id: &str) -> StoreResult<&mut T> {
        self.rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| StoreError::not_found(T::NAME, id))
    }

    /// Appends a row. Refuses an id that is already taken.
    pub fn insert(&mut self, row: T) -> StoreResult<&T> {
        if self.find(row.id()).is_some() {
            return Err(StoreError::duplicate(format!("{} id", T::NAME), row.id()));
        }
        self.rows.push(row);
        let last = self.rows.len() - 1;
        Ok(&self.rows[last])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.rows.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drops rows past `len`. Undoes appends on rollback.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Clones every row matching `predicate`.
    pub fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.iter().filter(|row| predicate(row)).cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a Table<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qrdesk_core::QrType;

    #[test]
    fn test_insert_and_lookup() {
        let mut table: Table<QrCode> = Table::default();
        let qr = QrCode::new_unallocated("BNK-S-1", QrType::Static, "batch", Utc::now());
        let id = qr.id.clone();

        table.insert(qr.clone()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&id).unwrap().qr_value, "BNK-S-1");
        assert!(matches!(table.insert(qr), Err(StoreError::Duplicate { .. })));
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let table: Table<Branch> = Table::default();
        let err = table.get("nope").unwrap_err();
        assert_eq!(err.to_string(), "Branch not found: nope");
    }
}
