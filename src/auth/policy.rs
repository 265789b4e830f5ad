//! Role model and the business rules that gate user administration.
//!
//! The rules live here as named predicates instead of inline role-string
//! comparisons so they can be unit tested without a request in flight.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SuperAdmin",
            Role::Admin => "Admin",
            Role::Moderator => "Moderator",
            Role::User => "User",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "SuperAdmin" => Some(Role::SuperAdmin),
            "Admin" => Some(Role::Admin),
            "Moderator" => Some(Role::Moderator),
            "User" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowlist check. SuperAdmin passes every gate.
pub fn is_allowed(role: Role, allowed: &[Role]) -> bool {
    role == Role::SuperAdmin || allowed.contains(&role)
}

/// Whether `actor` may delete the account of `target`.
///
/// Rules: no self-deletion; SuperAdmin accounts are never deletable; an Admin
/// may not delete another Admin; SuperAdmin may delete anyone else.
pub fn can_delete_user(actor_id: uuid::Uuid, actor_role: Role, target_id: uuid::Uuid, target_role: Role) -> bool {
    if actor_id == target_id {
        return false;
    }
    if target_role == Role::SuperAdmin {
        return false;
    }
    match actor_role {
        Role::SuperAdmin => true,
        Role::Admin => target_role != Role::Admin,
        _ => false,
    }
}

/// Whether `actor` may change `target`'s role to `new_role`.
///
/// Rules: no self-role-change; SuperAdmin accounts cannot be reassigned and
/// the SuperAdmin role cannot be granted; elevating to or demoting from Admin
/// is SuperAdmin-only; Admins may otherwise move users between User and
/// Moderator.
pub fn can_change_role(
    actor_id: uuid::Uuid,
    actor_role: Role,
    target_id: uuid::Uuid,
    target_role: Role,
    new_role: Role,
) -> bool {
    if actor_id == target_id {
        return false;
    }
    if target_role == Role::SuperAdmin || new_role == Role::SuperAdmin {
        return false;
    }
    match actor_role {
        Role::SuperAdmin => true,
        Role::Admin => target_role != Role::Admin && new_role != Role::Admin,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const ALL: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::Moderator, Role::User];

    #[test]
    fn superadmin_bypasses_every_allowlist() {
        assert!(is_allowed(Role::SuperAdmin, &[]));
        assert!(is_allowed(Role::SuperAdmin, &[Role::User]));
        for role in ALL {
            assert!(is_allowed(*role, ALL));
        }
    }

    #[test]
    fn allowlist_excludes_other_roles() {
        assert!(!is_allowed(Role::User, &[Role::Admin, Role::Moderator]));
        assert!(is_allowed(Role::Moderator, &[Role::Admin, Role::Moderator]));
    }

    #[test]
    fn no_self_deletion() {
        let id = Uuid::new_v4();
        assert!(!can_delete_user(id, Role::SuperAdmin, id, Role::User));
    }

    #[test]
    fn admin_cannot_delete_admin_or_superadmin() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(!can_delete_user(a, Role::Admin, b, Role::Admin));
        assert!(!can_delete_user(a, Role::Admin, b, Role::SuperAdmin));
        assert!(can_delete_user(a, Role::Admin, b, Role::Moderator));
        assert!(can_delete_user(a, Role::Admin, b, Role::User));
    }

    #[test]
    fn superadmin_deletes_anyone_but_superadmin() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(can_delete_user(a, Role::SuperAdmin, b, Role::Admin));
        assert!(!can_delete_user(a, Role::SuperAdmin, b, Role::SuperAdmin));
    }

    #[test]
    fn moderators_and_users_cannot_delete() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(!can_delete_user(a, Role::Moderator, b, Role::User));
        assert!(!can_delete_user(a, Role::User, b, Role::User));
    }

    #[test]
    fn only_superadmin_touches_admin_role() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        // Admin cannot elevate to Admin or demote an Admin
        assert!(!can_change_role(a, Role::Admin, b, Role::User, Role::Admin));
        assert!(!can_change_role(a, Role::Admin, b, Role::Admin, Role::User));
        // SuperAdmin can do both
        assert!(can_change_role(a, Role::SuperAdmin, b, Role::User, Role::Admin));
        assert!(can_change_role(a, Role::SuperAdmin, b, Role::Admin, Role::User));
    }

    #[test]
    fn no_self_demotion() {
        let id = Uuid::new_v4();
        assert!(!can_change_role(id, Role::Admin, id, Role::Admin, Role::User));
    }

    #[test]
    fn superadmin_role_is_never_granted() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(!can_change_role(a, Role::SuperAdmin, b, Role::User, Role::SuperAdmin));
    }

    #[test]
    fn role_string_round_trip() {
        for role in ALL {
            assert_eq!(Role::parse(role.as_str()), Some(*role));
        }
        assert_eq!(Role::parse("root"), None);
    }
}
