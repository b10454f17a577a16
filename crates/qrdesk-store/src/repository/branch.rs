//! # Branch Repository

use qrdesk_core::Branch;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{Store, Tables};

#[derive(Debug, Clone)]
pub struct BranchRepository {
    store: Store,
}

impl BranchRepository {
    pub fn new(store: Store) -> Self {
        BranchRepository { store }
    }

    /// All branches, optionally only active ones.
    pub async fn list(&self, active_only: bool) -> Vec<Branch> {
        let branches = self
            .store
            .read(|t| t.branches.select(|b| !active_only || b.is_active))
            .await;
        debug!(count = branches.len(), "Listed branches");
        branches
    }

    pub async fn get(&self, id: &str) -> StoreResult<Branch> {
        self.store.read(|t| t.branches.get(id).cloned()).await
    }

    pub async fn find_by_code(&self, code: &str) -> Option<Branch> {
        self.store
            .read(|t| t.branches.iter().find(|b| b.code == code).cloned())
            .await
    }
}

impl Tables {
    /// Adds a branch. Branch codes are unique.
    pub fn insert_branch(&mut self, branch: Branch) -> StoreResult<()> {
        if self.branches.iter().any(|b| b.code == branch.code) {
            return Err(StoreError::duplicate("branch code", branch.code));
        }
        self.branches.insert(branch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qrdesk_core::BranchType;

    fn branch(id: &str, code: &str) -> Branch {
        Branch {
            id: id.into(),
            code: code.into(),
            name: "Pokhara".into(),
            region: "Gandaki".into(),
            branch_type: BranchType::Domestic,
            manager_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_branch_code_unique() {
        let mut tables = Tables::default();
        tables.insert_branch(branch("b-1", "PKR-001")).unwrap();
        let err = tables.insert_branch(branch("b-2", "PKR-001")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_list_active_only() {
        let mut tables = Tables::default();
        tables.insert_branch(branch("b-1", "PKR-001")).unwrap();
        let mut closed = branch("b-2", "PKR-002");
        closed.is_active = false;
        tables.insert_branch(closed).unwrap();

        let repo = Store::from_tables(tables).branches();
        assert_eq!(repo.list(true).await.len(), 1);
        assert_eq!(repo.list(false).await.len(), 2);
        assert_eq!(repo.find_by_code("PKR-002").await.unwrap().id, "b-2");
    }
}
