use tracing::debug;

use shared::types::AdminRole;

use crate::auth::errors::GuardError;
use crate::auth::identity::Identity;

/// Passes iff the caller's role is in `allowed`.
pub fn require_role(identity: Option<&Identity>, allowed: &[AdminRole]) -> Result<(), GuardError> {
    let identity = identity.ok_or(GuardError::Unauthorized)?;

    if allowed.contains(&identity.role) {
        return Ok(());
    }

    debug!(
        "Role guard rejected admin {}: role {} not in {:?}",
        identity.id, identity.role, allowed
    );
    Err(GuardError::InsufficientRole {
        required: allowed.to_vec(),
        current: identity.role,
    })
}

/// Passes iff every permission in `required` is held. `"*"` holds them all.
pub fn require_permissions(
    identity: Option<&Identity>,
    required: &[String],
) -> Result<(), GuardError> {
    let identity = identity.ok_or(GuardError::Unauthorized)?;

    let missing: Vec<String> = required
        .iter()
        .filter(|p| !identity.has_permission(p))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    debug!(
        "Permission guard rejected admin {}: missing {:?}",
        identity.id, missing
    );
    Err(GuardError::MissingPermissions {
        required: required.to_vec(),
        missing,
    })
}

/// Authorization requirement attached to a route at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Any authenticated admin.
    Authenticated,
    Roles(Vec<AdminRole>),
    Permissions(Vec<String>),
    /// Every inner guard must pass; the first failure is returned.
    All(Vec<Guard>),
}

impl Guard {
    pub fn roles(roles: &[AdminRole]) -> Self {
        Self::Roles(roles.to_vec())
    }

    pub fn permissions(permissions: &[&str]) -> Self {
        Self::Permissions(permissions.iter().map(|p| p.to_string()).collect())
    }

    pub fn check(&self, identity: Option<&Identity>) -> Result<(), GuardError> {
        match self {
            Self::Authenticated => identity.map(|_| ()).ok_or(GuardError::Unauthorized),
            Self::Roles(allowed) => require_role(identity, allowed),
            Self::Permissions(required) => require_permissions(identity, required),
            Self::All(guards) => guards.iter().try_for_each(|g| g.check(identity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared::types::WILDCARD_PERMISSION;

    fn admin(role: AdminRole, permissions: &[&str]) -> Identity {
        Identity {
            id: "admin-1".into(),
            email: "a@chapel.org".into(),
            name: "A".into(),
            role,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        assert_eq!(
            Guard::Authenticated.check(None),
            Err(GuardError::Unauthorized)
        );
        assert_eq!(
            require_role(None, &[AdminRole::Admin]),
            Err(GuardError::Unauthorized)
        );
        assert_eq!(
            require_permissions(None, &["content:read".to_string()]),
            Err(GuardError::Unauthorized)
        );
    }

    #[test]
    fn editor_on_super_admin_route_echoes_roles() {
        let editor = admin(AdminRole::Editor, &["content:read"]);
        let err = Guard::roles(&[AdminRole::SuperAdmin])
            .check(Some(&editor))
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::InsufficientRole {
                required: vec![AdminRole::SuperAdmin],
                current: AdminRole::Editor,
            }
        );
    }

    #[test]
    fn partial_permissions_list_what_is_missing() {
        let caller = admin(AdminRole::Editor, &["x"]);
        let err = Guard::permissions(&["x", "y"])
            .check(Some(&caller))
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::MissingPermissions {
                required: vec!["x".into(), "y".into()],
                missing: vec!["y".into()],
            }
        );
    }

    #[test]
    fn all_requires_every_guard() {
        let caller = admin(AdminRole::Admin, &["admins:read"]);
        let both = Guard::All(vec![
            Guard::roles(&[AdminRole::Admin, AdminRole::SuperAdmin]),
            Guard::permissions(&["admins:read"]),
        ]);
        assert!(both.check(Some(&caller)).is_ok());

        let stricter = Guard::All(vec![
            Guard::roles(&[AdminRole::Admin]),
            Guard::permissions(&["settings:delete"]),
        ]);
        assert!(matches!(
            stricter.check(Some(&caller)),
            Err(GuardError::MissingPermissions { .. })
        ));
    }

    fn any_role() -> impl Strategy<Value = AdminRole> {
        (0usize..4).prop_map(|i| AdminRole::ALL[i])
    }

    proptest! {
        #[test]
        fn role_outside_allow_list_is_forbidden(
            caller_role in any_role(),
            allowed in proptest::collection::vec(any_role(), 0..4),
        ) {
            let allowed: Vec<AdminRole> =
                allowed.into_iter().filter(|r| *r != caller_role).collect();
            let caller = admin(caller_role, &[WILDCARD_PERMISSION]);
            let result = require_role(Some(&caller), &allowed);
            let is_insufficient_role =
                matches!(result, Err(GuardError::InsufficientRole { .. }));
            prop_assert!(is_insufficient_role);
        }

        #[test]
        fn wildcard_passes_any_requirement(
            required in proptest::collection::vec("[a-z]{1,10}:[a-z]{1,10}", 0..8),
        ) {
            let caller = admin(AdminRole::Viewer, &[WILDCARD_PERMISSION]);
            prop_assert!(require_permissions(Some(&caller), &required).is_ok());
        }

        #[test]
        fn held_subset_short_of_required_is_rejected(
            held in proptest::collection::hash_set("[a-z]{1,6}", 0..5),
            extra in "[A-Z]{1,6}",
        ) {
            let mut required: Vec<String> = held.iter().cloned().collect();
            required.push(extra.clone());
            let held_refs: Vec<&str> = held.iter().map(String::as_str).collect();
            let caller = admin(AdminRole::Admin, &held_refs);
            let err = require_permissions(Some(&caller), &required).unwrap_err();
            prop_assert_eq!(
                err,
                GuardError::MissingPermissions { required, missing: vec![extra] }
            );
        }
    }
}
