//! Role-based and ownership-based authorization checks.
//!
//! These are pure functions over [`User`] state; persistence of their
//! outcomes (approval stamps, face resets) belongs to the caller.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::types::{Role, User};

/// Administrative action applied to a user account.
///
/// A closed enum rather than an action string so that dispatch is
/// exhaustive: adding a variant forces every match site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminAction {
    Approve,
    Reject,
    Activate,
    Deactivate,
    ResetFace,
}

/// Pure role-set membership check.
pub fn authorize(user: &User, allowed: &[Role]) -> bool {
    allowed.contains(&user.role)
}

/// True if the user owns the resource or holds one of the admin roles.
pub fn authorize_owner_or(user: &User, resource_owner_id: &str, admin_roles: &[Role]) -> bool {
    user.id == resource_owner_id || admin_roles.contains(&user.role)
}

/// Require one of the allowed roles, failing closed.
pub fn require_role(user: &User, allowed: &[Role]) -> ApiResult<()> {
    if authorize(user, allowed) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Gate: the account must be approved before attendance features open up.
pub fn require_approval(user: &User) -> ApiResult<()> {
    if user.is_approved {
        Ok(())
    } else {
        Err(ApiError::NotApproved)
    }
}

/// Gate: the account must be active.
pub fn require_active(user: &User) -> ApiResult<()> {
    if user.is_active {
        Ok(())
    } else {
        Err(ApiError::AccountInactive)
    }
}

/// Gate: the user must have at least one face descriptor enrolled.
pub fn require_face_enrollment(user: &User) -> ApiResult<()> {
    if user.face_enrolled {
        Ok(())
    } else {
        Err(ApiError::forbidden("Face enrollment required"))
    }
}

/// Tenant boundary check: an org-scoped actor may only touch resources of
/// their own organization. Super-admins bypass the check.
pub fn require_same_org(actor: &User, resource_org_id: &str) -> ApiResult<()> {
    if !actor.role.is_org_scoped() {
        return Ok(());
    }

    match &actor.organization_id {
        Some(org_id) if org_id == resource_org_id => Ok(()),
        _ => Err(ApiError::CrossOrganizationAccess),
    }
}

/// Validate that an admin action may be applied by `actor` to `target`.
///
/// Fails `CrossOrganizationAccess` when an org-scoped admin reaches across
/// the tenant boundary, and `SelfActionForbidden` for self-deactivation and
/// self-rejection.
pub fn check_admin_action(actor: &User, target: &User, action: AdminAction) -> ApiResult<()> {
    require_role(actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;

    if let Some(target_org) = &target.organization_id {
        require_same_org(actor, target_org)?;
    } else if actor.role.is_org_scoped() {
        // Target without an organization (a super-admin account) is never
        // administered by an org-scoped admin.
        return Err(ApiError::CrossOrganizationAccess);
    }

    if actor.id == target.id && matches!(action, AdminAction::Deactivate | AdminAction::Reject) {
        return Err(ApiError::SelfActionForbidden);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role, org: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "t@example.com".to_string(),
            employee_id: "E-1".to_string(),
            department: None,
            designation: None,
            phone_number: None,
            password_hash: String::new(),
            role,
            organization_id: org.map(|s| s.to_string()),
            is_active: true,
            is_approved: true,
            approved_by: None,
            approved_at: None,
            face_descriptors: Vec::new(),
            face_images: Vec::new(),
            face_enrolled: false,
            enrollment_attempts: 0,
            national_id: None,
            national_id_verified: false,
            national_id_verified_at: None,
            failed_logins: 0,
            lock_until: None,
            reset_token_hash: None,
            reset_token_expires: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_membership() {
        let admin = user(Role::Admin, Some("org-a"));
        assert!(authorize(&admin, &[Role::Admin, Role::Hr]));
        assert!(!authorize(&admin, &[Role::SuperAdmin]));
    }

    #[test]
    fn owner_or_admin() {
        let employee = user(Role::Employee, Some("org-a"));
        assert!(authorize_owner_or(&employee, &employee.id, Role::ORG_ADMINS));
        assert!(!authorize_owner_or(&employee, "someone-else", Role::ORG_ADMINS));

        let hr = user(Role::Hr, Some("org-a"));
        assert!(authorize_owner_or(&hr, "someone-else", Role::ORG_ADMINS));
    }

    #[test]
    fn cross_org_is_rejected_for_scoped_admin() {
        let admin_a = user(Role::Admin, Some("org-a"));
        assert!(require_same_org(&admin_a, "org-a").is_ok());
        assert!(matches!(
            require_same_org(&admin_a, "org-b"),
            Err(ApiError::CrossOrganizationAccess)
        ));
    }

    #[test]
    fn super_admin_bypasses_org_scope() {
        let root = user(Role::SuperAdmin, None);
        assert!(require_same_org(&root, "org-anything").is_ok());
    }

    #[test]
    fn self_deactivate_is_forbidden() {
        let mut admin = user(Role::Admin, Some("org-a"));
        admin.id = "admin-1".to_string();
        let same = admin.clone();

        assert!(matches!(
            check_admin_action(&admin, &same, AdminAction::Deactivate),
            Err(ApiError::SelfActionForbidden)
        ));
        assert!(matches!(
            check_admin_action(&admin, &same, AdminAction::Reject),
            Err(ApiError::SelfActionForbidden)
        ));
        // Self-approve is allowed (idempotent no-op in practice).
        assert!(check_admin_action(&admin, &same, AdminAction::Approve).is_ok());
    }

    #[test]
    fn cross_org_admin_action_is_rejected() {
        let admin_a = user(Role::Admin, Some("org-a"));
        let target_b = user(Role::Employee, Some("org-b"));
        assert!(matches!(
            check_admin_action(&admin_a, &target_b, AdminAction::Approve),
            Err(ApiError::CrossOrganizationAccess)
        ));
    }

    #[test]
    fn approval_and_activity_gates() {
        let mut u = user(Role::Employee, Some("org-a"));
        u.is_approved = false;
        assert!(matches!(require_approval(&u), Err(ApiError::NotApproved)));

        u.is_approved = true;
        u.is_active = false;
        assert!(matches!(require_active(&u), Err(ApiError::AccountInactive)));
    }
}
