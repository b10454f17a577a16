//! # Directory
//!
//! Branches and users. Only system admins change the directory; everyone
//! may read it.

use chrono::Utc;
use qrdesk_core::policy::Permission;
use qrdesk_core::validation::{validate_branch_code, validate_email, validate_text};
use qrdesk_core::{AuditAction, Branch, BranchType, Role, User, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use ts_rs::TS;

use super::qr::sync_assignments_in;
use super::{authorize_in, record, view_scope_in, QrDeskService};
use crate::error::ServiceResult;

/// Input for [`QrDeskService::create_branch`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewBranch {
    pub code: String,
    pub name: String,
    pub region: String,
    pub branch_type: BranchType,
    pub manager_id: Option<String>,
}

/// Input for [`QrDeskService::create_user`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    /// Required for branch-scoped roles.
    pub branch_id: Option<String>,
}

impl QrDeskService {
    /// Creates a branch. Branch codes are unique.
    pub async fn create_branch(&self, actor_id: &str, input: NewBranch) -> ServiceResult<Branch> {
        let branch = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::ManageBranches, None)?;
                validate_branch_code(&input.code)?;
                validate_text("name", &input.name, 100)?;
                validate_text("region", &input.region, 100)?;
                if let Some(manager_id) = input.manager_id.as_deref() {
                    t.users.get(manager_id)?;
                }

                let now = Utc::now();
                let branch = Branch {
                    id: qrdesk_core::new_id(),
                    code: input.code.trim().to_string(),
                    name: input.name.trim().to_string(),
                    region: input.region.trim().to_string(),
                    branch_type: input.branch_type,
                    manager_id: input.manager_id.clone(),
                    is_active: true,
                    created_at: now,
                };
                t.insert_branch(branch.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::BranchCreated,
                    "Branch",
                    &branch.id,
                    json!({ "code": branch.code, "region": branch.region }),
                    now,
                )?;
                Ok(branch)
            })
            .await?;

        info!(branch_id = %branch.id, code = %branch.code, "Branch created");
        Ok(branch)
    }

    /// All branches, ordered by code.
    pub async fn get_branches(&self, actor_id: &str, active_only: bool) -> ServiceResult<Vec<Branch>> {
        self.store()
            .read(|t| authorize_in(t, actor_id, Permission::ViewRecords, None))
            .await?;
        let mut branches = self.store().branches().list(active_only).await;
        branches.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(branches)
    }

    /// Creates a user. Usernames are unique; branch-scoped roles need a
    /// branch and global roles must not have one.
    pub async fn create_user(&self, actor_id: &str, input: NewUser) -> ServiceResult<User> {
        let user = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::ManageUsers, None)?;
                validate_text("username", &input.username, 50)?;
                validate_text("full_name", &input.full_name, 100)?;
                validate_email(&input.email)?;

                match (input.role.is_branch_scoped(), input.branch_id.is_some()) {
                    (true, false) => {
                        return Err(ValidationError::Required {
                            field: "branch_id".to_string(),
                        }
                        .into())
                    }
                    (false, true) => {
                        return Err(ValidationError::InvalidFormat {
                            field: "branch_id".to_string(),
                            reason: format!("role {} is not tied to a branch", input.role),
                        }
                        .into())
                    }
                    _ => {}
                }

                let now = Utc::now();
                let user = User {
                    id: qrdesk_core::new_id(),
                    username: input.username.trim().to_string(),
                    full_name: input.full_name.trim().to_string(),
                    email: input.email.trim().to_string(),
                    role: input.role,
                    branch_id: input.branch_id.clone(),
                    is_active: true,
                    created_at: now,
                };
                t.insert_user(user.clone())?;
                record(
                    t,
                    actor_id,
                    AuditAction::UserCreated,
                    "User",
                    &user.id,
                    json!({ "role": user.role, "branchId": user.branch_id }),
                    now,
                )?;
                Ok(user)
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Deactivates a user and releases every QR code assignment that is no
    /// longer valid, in the same step.
    pub async fn deactivate_user(&self, actor_id: &str, user_id: &str) -> ServiceResult<User> {
        let (user, sync) = self
            .store()
            .transaction(|t| {
                authorize_in(t, actor_id, Permission::ManageUsers, None)?;
                if actor_id == user_id {
                    return Err(ValidationError::InvalidFormat {
                        field: "user_id".to_string(),
                        reason: "users cannot deactivate themselves".to_string(),
                    }
                    .into());
                }

                let now = Utc::now();
                let user = t.users.get_mut(user_id)?;
                user.is_active = false;
                let user = user.clone();

                record(t, actor_id, AuditAction::UserDeactivated, "User", user_id, json!({}), now)?;
                let sync = sync_assignments_in(t, actor_id, now)?;
                Ok((user, sync))
            })
            .await?;

        info!(
            user_id = %user_id,
            released = sync.cleared.len(),
            revoked = sync.revoked.len(),
            "User deactivated"
        );
        Ok(user)
    }

    /// Users, optionally narrowed to a branch and role. Branch-scoped
    /// callers only see their own branch.
    pub async fn get_users(
        &self,
        actor_id: &str,
        branch_id: Option<&str>,
        role: Option<Role>,
    ) -> ServiceResult<Vec<User>> {
        let (_, scope) = self
            .store()
            .read(|t| view_scope_in(t, actor_id, Permission::ViewRecords, branch_id))
            .await?;

        let users = self.store().users().list(scope.as_deref(), role).await;
        debug!(actor_id, count = users.len(), "Listed users");
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use qrdesk_store::fixtures::{ADMIN_ID, MANAGER_1_ID, SALES_1_ID};

    fn sales_user(branch_id: Option<&str>) -> NewUser {
        NewUser {
            username: "btl.sales".to_string(),
            full_name: "Kiran Rai".to_string(),
            email: "kiran.rai@bank.example".to_string(),
            role: Role::SalesUser,
            branch_id: branch_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_branch_and_user() {
        let service = QrDeskService::demo().unwrap();
        let branch = service
            .create_branch(
                ADMIN_ID,
                NewBranch {
                    code: "DHR-001".to_string(),
                    name: "Dharan".to_string(),
                    region: "Koshi".to_string(),
                    branch_type: BranchType::Domestic,
                    manager_id: None,
                },
            )
            .await
            .unwrap();
        assert!(branch.is_active);

        let user = service
            .create_user(ADMIN_ID, sales_user(Some(&branch.id)))
            .await
            .unwrap();
        assert_eq!(user.branch_id.as_deref(), Some(branch.id.as_str()));

        let err = service
            .create_user(ADMIN_ID, sales_user(Some(&branch.id)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let branches = service.get_branches(SALES_1_ID, true).await.unwrap();
        assert_eq!(branches.len(), 5);
    }

    #[tokio::test]
    async fn test_role_branch_pairing() {
        let service = QrDeskService::demo().unwrap();

        let err = service.create_user(ADMIN_ID, sales_user(None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let auditor = NewUser {
            role: Role::Auditor,
            ..sales_user(Some("1"))
        };
        let err = service.create_user(ADMIN_ID, auditor).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = service
            .create_user(MANAGER_1_ID, sales_user(Some("1")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_deactivated_user_is_refused() {
        let service = QrDeskService::demo().unwrap();

        let err = service.deactivate_user(ADMIN_ID, ADMIN_ID).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let user = service.deactivate_user(ADMIN_ID, MANAGER_1_ID).await.unwrap();
        assert!(!user.is_active);

        let err = service.get_users(MANAGER_1_ID, None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let branch_1 = service.get_users(ADMIN_ID, Some("1"), None).await.unwrap();
        assert_eq!(branch_1.len(), 3);
    }
}
