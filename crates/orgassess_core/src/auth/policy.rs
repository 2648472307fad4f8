//! Authorization port and built-in policies.
//!
//! The session manager depends on `AuthorizationPort` only for ownership
//! checks; role logic lives behind the port.

use crate::auth::capability::{
    parse_permission, Action, Permission, PermissionParseError, ResourceKind,
};
use crate::model::assessment::OwnerRef;
use std::collections::{BTreeSet, HashMap};

/// Resource an action targets, with its owner when it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef<'a> {
    pub kind: ResourceKind,
    pub owner: Option<&'a OwnerRef>,
}

impl<'a> ResourceRef<'a> {
    pub fn owned(kind: ResourceKind, owner: &'a OwnerRef) -> Self {
        Self {
            kind,
            owner: Some(owner),
        }
    }

    pub fn unowned(kind: ResourceKind) -> Self {
        Self { kind, owner: None }
    }
}

/// Capability check: may `actor` perform `action` on `resource`?
pub trait AuthorizationPort {
    fn can(&self, actor: &OwnerRef, action: Action, resource: ResourceRef<'_>) -> bool;
}

/// Owners act on their own resources; anyone may create or read the catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipPolicy;

impl AuthorizationPort for OwnershipPolicy {
    fn can(&self, actor: &OwnerRef, action: Action, resource: ResourceRef<'_>) -> bool {
        if resource.kind.is_catalog() {
            return action.is_read_only();
        }
        match resource.owner {
            Some(owner) => owner == actor,
            None => action == Action::Create,
        }
    }
}

/// Permission-string grants for registered users, over `OwnershipPolicy`.
///
/// Grants never apply to guests.
#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    grants: HashMap<String, BTreeSet<Permission>>,
    fallback: OwnershipPolicy,
}

impl PermissionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants parsed permission strings to one user id.
    pub fn grant<I, S>(&mut self, user_id: &str, permissions: I) -> Result<(), PermissionParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = permissions
            .into_iter()
            .map(|value| parse_permission(value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.grants
            .entry(user_id.to_string())
            .or_default()
            .extend(parsed);
        Ok(())
    }

    /// Whether `user_id` holds `permission` directly.
    pub fn has_permission(&self, user_id: &str, permission: Permission) -> bool {
        self.grants
            .get(user_id)
            .is_some_and(|granted| granted.contains(&permission))
    }
}

impl AuthorizationPort for PermissionPolicy {
    fn can(&self, actor: &OwnerRef, action: Action, resource: ResourceRef<'_>) -> bool {
        if let OwnerRef::User(user_id) = actor {
            if self.has_permission(user_id, Permission::new(action, resource.kind)) {
                return true;
            }
        }
        self.fallback.can(actor, action, resource)
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthorizationPort, OwnershipPolicy, PermissionPolicy, ResourceRef};
    use crate::auth::capability::{Action, ResourceKind};
    use crate::model::assessment::OwnerRef;

    #[test]
    fn ownership_policy_allows_only_the_owner() {
        let owner = OwnerRef::user("u-1");
        let other = OwnerRef::user("u-2");
        let resource = ResourceRef::owned(ResourceKind::Assessment, &owner);

        assert!(OwnershipPolicy.can(&owner, Action::Update, resource));
        assert!(!OwnershipPolicy.can(&other, Action::Update, resource));
        assert!(!OwnershipPolicy.can(&OwnerRef::guest("u-1"), Action::View, resource));
    }

    #[test]
    fn ownership_policy_keeps_catalog_read_only() {
        let actor = OwnerRef::guest("g-1");
        assert!(OwnershipPolicy.can(
            &actor,
            Action::View,
            ResourceRef::unowned(ResourceKind::Tool)
        ));
        assert!(!OwnershipPolicy.can(
            &actor,
            Action::Update,
            ResourceRef::unowned(ResourceKind::Domain)
        ));
        assert!(OwnershipPolicy.can(
            &actor,
            Action::Create,
            ResourceRef::unowned(ResourceKind::Assessment)
        ));
    }

    #[test]
    fn permission_grants_extend_ownership() {
        let mut policy = PermissionPolicy::new();
        policy
            .grant("admin", ["view_assessment", "update_domain"])
            .expect("valid permissions");

        let owner = OwnerRef::user("u-1");
        let admin = OwnerRef::user("admin");
        let resource = ResourceRef::owned(ResourceKind::Assessment, &owner);

        assert!(policy.can(&admin, Action::View, resource));
        assert!(!policy.can(&admin, Action::Update, resource));
        assert!(policy.can(&owner, Action::Update, resource));
        assert!(policy.can(&admin, Action::Update, ResourceRef::unowned(ResourceKind::Domain)));
    }

    #[test]
    fn permission_grants_never_apply_to_guests() {
        let mut policy = PermissionPolicy::new();
        policy.grant("shared", ["view_assessment"]).expect("valid");

        let owner = OwnerRef::user("u-1");
        let resource = ResourceRef::owned(ResourceKind::Assessment, &owner);
        assert!(!policy.can(&OwnerRef::guest("shared"), Action::View, resource));
    }

    #[test]
    fn grant_rejects_unknown_permission_strings() {
        let mut policy = PermissionPolicy::new();
        assert!(policy.grant("admin", ["teleport_domain"]).is_err());
    }
}
