//! # User Repository

use qrdesk_core::{Role, User};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{Store, Tables};

#[derive(Debug, Clone)]
pub struct UserRepository {
    store: Store,
}

impl UserRepository {
    pub fn new(store: Store) -> Self {
        UserRepository { store }
    }

    /// Lists users, optionally narrowed to a branch and/or role.
    pub async fn list(&self, branch_id: Option<&str>, role: Option<Role>) -> Vec<User> {
        let users = self
            .store
            .read(|t| {
                t.users.select(|u| {
                    branch_id.map_or(true, |b| u.branch_id.as_deref() == Some(b))
                        && role.map_or(true, |r| u.role == r)
                })
            })
            .await;
        debug!(count = users.len(), "Listed users");
        users
    }

    pub async fn get(&self, id: &str) -> StoreResult<User> {
        self.store.read(|t| t.users.get(id).cloned()).await
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        self.store
            .read(|t| t.users.iter().find(|u| u.username == username).cloned())
            .await
    }
}

impl Tables {
    /// Adds a user. Usernames are unique and the branch must exist.
    pub fn insert_user(&mut self, user: User) -> StoreResult<()> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::duplicate("username", user.username));
        }
        if let Some(branch_id) = user.branch_id.as_deref() {
            self.branches.get(branch_id)?;
        }
        self.users.insert(user)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, username: &str, branch: Option<&str>) -> User {
        User {
            id: id.into(),
            username: username.into(),
            full_name: "Gita Sharma".into(),
            email: "gita@bank.test".into(),
            role: Role::SalesUser,
            branch_id: branch.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_username_unique() {
        let mut tables = Tables::default();
        tables.insert_user(user("u-1", "gita", None)).unwrap();
        assert!(matches!(
            tables.insert_user(user("u-2", "gita", None)),
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_unknown_branch_refused() {
        let mut tables = Tables::default();
        assert!(matches!(
            tables.insert_user(user("u-1", "gita", Some("missing"))),
            Err(StoreError::NotFound { .. })
        ));
    }
}
