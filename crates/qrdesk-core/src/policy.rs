//! # Role Policy
//!
//! Which role may do what, and where.
//!
//! ```text
//! authorize(user, permission, target_branch)
//!      │
//!      ├── user inactive?                 ──► InactiveUser
//!      ├── role lacks permission?         ──► PermissionDenied
//!      ├── branch-scoped role and target
//!      │   branch is not the user's own?  ──► OutOfScope
//!      └── Ok(())
//! ```
//!
//! Global roles (`system_admin`, `department_approver`, `auditor`) are never
//! scope-checked. Branch-scoped roles without a branch can only act on
//! targets that carry no branch at all.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Role, User};

/// Everything a service operation can ask permission for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageBranches,
    ManageUsers,
    GenerateQrCodes,
    AllocateQrCodes,
    RetireQrCodes,
    BlockQrCodes,
    AssignQrCodes,
    IssueQrCodes,
    ReturnQrCodes,
    ManageMerchants,
    SubmitKyc,
    CreateMerchantRequests,
    CreateAllocationRequests,
    ReviewAllocationRequests,
    ReviewMerchantRequests,
    ReviewKyc,
    ManageAuditItems,
    ViewAuditReports,
    ViewDashboard,
    ViewRecords,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageBranches => "manage branches",
            Permission::ManageUsers => "manage users",
            Permission::GenerateQrCodes => "generate QR codes",
            Permission::AllocateQrCodes => "allocate QR codes",
            Permission::RetireQrCodes => "retire QR codes",
            Permission::BlockQrCodes => "block QR codes",
            Permission::AssignQrCodes => "assign QR codes",
            Permission::IssueQrCodes => "issue QR codes",
            Permission::ReturnQrCodes => "return QR codes",
            Permission::ManageMerchants => "manage merchants",
            Permission::SubmitKyc => "submit KYC",
            Permission::CreateMerchantRequests => "create merchant requests",
            Permission::CreateAllocationRequests => "create allocation requests",
            Permission::ReviewAllocationRequests => "review allocation requests",
            Permission::ReviewMerchantRequests => "review merchant requests",
            Permission::ReviewKyc => "review KYC",
            Permission::ManageAuditItems => "manage audit items",
            Permission::ViewAuditReports => "view audit reports",
            Permission::ViewDashboard => "view the dashboard",
            Permission::ViewRecords => "view records",
        }
    }

    /// Roles holding this permission.
    pub const fn roles(&self) -> &'static [Role] {
        use Role::*;

        match self {
            Permission::ManageBranches
            | Permission::ManageUsers
            | Permission::GenerateQrCodes
            | Permission::AllocateQrCodes
            | Permission::RetireQrCodes => &[SystemAdmin],
            Permission::BlockQrCodes => &[SystemAdmin, BranchManager],
            Permission::AssignQrCodes => &[BranchManager],
            Permission::IssueQrCodes
            | Permission::ReturnQrCodes
            | Permission::ManageMerchants
            | Permission::SubmitKyc
            | Permission::CreateMerchantRequests => &[BranchManager, SalesUser],
            Permission::CreateAllocationRequests => &[BranchManager],
            Permission::ReviewAllocationRequests => &[SystemAdmin, DepartmentApprover],
            Permission::ReviewMerchantRequests => {
                &[BranchApprover, DepartmentApprover, SystemAdmin]
            }
            Permission::ReviewKyc => &[BranchApprover, SystemAdmin],
            Permission::ManageAuditItems => &[Auditor],
            Permission::ViewAuditReports => &[Auditor, SystemAdmin],
            Permission::ViewDashboard | Permission::ViewRecords => &Role::ALL,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Checks the policy table.
    pub fn has(&self, permission: Permission) -> bool {
        permission.roles().contains(self)
    }
}

/// Authorizes `user` for `permission` on an entity of `target_branch`.
///
/// Pass `None` for targets that have no branch (program-wide listings,
/// unallocated stock, merchants not tied to a branch).
pub fn authorize(user: &User, permission: Permission, target_branch: Option<&str>) -> CoreResult<()> {
    if !user.is_active {
        return Err(CoreError::InactiveUser(user.id.clone()));
    }

    if !user.role.has(permission) {
        return Err(CoreError::PermissionDenied {
            role: user.role,
            permission,
        });
    }

    if let Some(target) = target_branch {
        ensure_in_scope(user, target)?;
    }

    Ok(())
}

/// Refuses branch-scoped users touching another branch.
pub fn ensure_in_scope(user: &User, branch_id: &str) -> CoreResult<()> {
    if user.role.is_branch_scoped() && user.branch_id.as_deref() != Some(branch_id) {
        return Err(CoreError::OutOfScope {
            user_id: user.id.clone(),
            branch_id: branch_id.to_string(),
        });
    }
    Ok(())
}

/// Works out which branch a read should be narrowed to.
///
/// Branch-scoped users always see their own branch; asking for another one
/// is refused. Global users see everything unless they ask for a branch.
pub fn resolve_view_scope(user: &User, requested: Option<&str>) -> CoreResult<Option<String>> {
    if !user.role.is_branch_scoped() {
        return Ok(requested.map(str::to_string));
    }

    let own = user.branch_id.clone().ok_or_else(|| CoreError::OutOfScope {
        user_id: user.id.clone(),
        branch_id: requested.unwrap_or("any").to_string(),
    })?;

    match requested {
        Some(branch) if branch != own => Err(CoreError::OutOfScope {
            user_id: user.id.clone(),
            branch_id: branch.to_string(),
        }),
        _ => Ok(Some(own)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role, branch: Option<&str>) -> User {
        User {
            id: format!("u-{}", role),
            username: role.to_string(),
            full_name: "Test User".into(),
            email: "user@bank.test".into(),
            role,
            branch_id: branch.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_policy_table() {
        assert!(Role::SystemAdmin.has(Permission::GenerateQrCodes));
        assert!(!Role::BranchManager.has(Permission::GenerateQrCodes));
        assert!(Role::DepartmentApprover.has(Permission::ReviewAllocationRequests));
        assert!(!Role::BranchApprover.has(Permission::ReviewAllocationRequests));
        assert!(Role::BranchApprover.has(Permission::ReviewKyc));
        assert!(!Role::SalesUser.has(Permission::ReviewKyc));
        assert!(Role::Auditor.has(Permission::ManageAuditItems));
        assert!(!Role::SystemAdmin.has(Permission::ManageAuditItems));

        for role in Role::ALL {
            assert!(role.has(Permission::ViewDashboard));
            assert!(role.has(Permission::ViewRecords));
        }
    }

    #[test]
    fn test_authorize_scoped_user() {
        let manager = user(Role::BranchManager, Some("b-1"));
        assert!(authorize(&manager, Permission::AssignQrCodes, Some("b-1")).is_ok());
        assert!(matches!(
            authorize(&manager, Permission::AssignQrCodes, Some("b-2")),
            Err(CoreError::OutOfScope { .. })
        ));
        assert!(matches!(
            authorize(&manager, Permission::GenerateQrCodes, None),
            Err(CoreError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_authorize_global_user_any_branch() {
        let admin = user(Role::SystemAdmin, None);
        assert!(authorize(&admin, Permission::BlockQrCodes, Some("b-9")).is_ok());
    }

    #[test]
    fn test_inactive_user_refused() {
        let mut admin = user(Role::SystemAdmin, None);
        admin.is_active = false;
        assert!(matches!(
            authorize(&admin, Permission::ViewRecords, None),
            Err(CoreError::InactiveUser(_))
        ));
    }

    #[test]
    fn test_resolve_view_scope() {
        let sales = user(Role::SalesUser, Some("b-1"));
        assert_eq!(resolve_view_scope(&sales, None).unwrap(), Some("b-1".into()));
        assert_eq!(
            resolve_view_scope(&sales, Some("b-1")).unwrap(),
            Some("b-1".into())
        );
        assert!(resolve_view_scope(&sales, Some("b-2")).is_err());

        let auditor = user(Role::Auditor, None);
        assert_eq!(resolve_view_scope(&auditor, None).unwrap(), None);
        assert_eq!(
            resolve_view_scope(&auditor, Some("b-2")).unwrap(),
            Some("b-2".into())
        );
    }

    #[test]
    fn test_permission_error_message() {
        let sales = user(Role::SalesUser, Some("b-1"));
        let err = authorize(&sales, Permission::ReviewKyc, None).unwrap_err();
        assert_eq!(err.to_string(), "Role sales_user is not permitted to review KYC");
    }
}
