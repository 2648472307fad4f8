//! Action and resource-kind declarations for permission strings.
//!
//! Permission strings use the `<action>_<resource>` form, e.g.
//! `view_any_domain` or `update_guest::session`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Verb half of a permission string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
    DeleteAny,
    ForceDelete,
    ForceDeleteAny,
    Restore,
    RestoreAny,
    Replicate,
    Reorder,
}

// Longest prefixes first so `delete_any_` wins over `delete_`.
const ACTIONS_BY_PREFIX_LEN: &[Action] = &[
    Action::ForceDeleteAny,
    Action::ForceDelete,
    Action::RestoreAny,
    Action::DeleteAny,
    Action::Replicate,
    Action::ViewAny,
    Action::Restore,
    Action::Reorder,
    Action::Create,
    Action::Update,
    Action::Delete,
    Action::View,
];

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewAny => "view_any",
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::DeleteAny => "delete_any",
            Self::ForceDelete => "force_delete",
            Self::ForceDeleteAny => "force_delete_any",
            Self::Restore => "restore",
            Self::RestoreAny => "restore_any",
            Self::Replicate => "replicate",
            Self::Reorder => "reorder",
        }
    }

    /// Whether the action reads without mutating.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ViewAny | Self::View)
    }
}

/// Resource half of a permission string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Tool,
    Domain,
    Category,
    Criterion,
    Assessment,
    AssessmentResponse,
    GuestSession,
}

const ALL_RESOURCE_KINDS: &[ResourceKind] = &[
    ResourceKind::Tool,
    ResourceKind::Domain,
    ResourceKind::Category,
    ResourceKind::Criterion,
    ResourceKind::Assessment,
    ResourceKind::AssessmentResponse,
    ResourceKind::GuestSession,
];

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Domain => "domain",
            Self::Category => "category",
            Self::Criterion => "criterion",
            Self::Assessment => "assessment",
            Self::AssessmentResponse => "assessment::response",
            Self::GuestSession => "guest::session",
        }
    }

    /// Catalog kinds are read-only for assessment callers.
    pub fn is_catalog(self) -> bool {
        matches!(
            self,
            Self::Tool | Self::Domain | Self::Category | Self::Criterion
        )
    }
}

/// One `<action>_<resource>` grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    pub action: Action,
    pub resource: ResourceKind,
}

impl Permission {
    pub fn new(action: Action, resource: ResourceKind) -> Self {
        Self { action, resource }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.action.as_str(), self.resource.as_str())
    }
}

/// Permission string parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionParseError {
    EmptyPermission,
    UnsupportedPermission(String),
}

impl Display for PermissionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "permission value must not be empty"),
            Self::UnsupportedPermission(value) => {
                write!(f, "permission is unsupported: {value}")
            }
        }
    }
}

impl Error for PermissionParseError {}

/// Parses one permission string such as `delete_any_guest::session`.
pub fn parse_permission(value: &str) -> Result<Permission, PermissionParseError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(PermissionParseError::EmptyPermission);
    }

    for action in ACTIONS_BY_PREFIX_LEN {
        let Some(rest) = normalized
            .strip_prefix(action.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
        else {
            continue;
        };
        if let Some(resource) = ALL_RESOURCE_KINDS
            .iter()
            .find(|resource| resource.as_str() == rest)
        {
            return Ok(Permission::new(*action, *resource));
        }
    }

    Err(PermissionParseError::UnsupportedPermission(
        normalized.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::{parse_permission, Action, Permission, PermissionParseError, ResourceKind};

    #[test]
    fn formats_permission_strings() {
        assert_eq!(
            Permission::new(Action::ViewAny, ResourceKind::Domain).to_string(),
            "view_any_domain"
        );
        assert_eq!(
            Permission::new(Action::Update, ResourceKind::GuestSession).to_string(),
            "update_guest::session"
        );
    }

    #[test]
    fn parses_longest_action_prefix() {
        assert_eq!(
            parse_permission("delete_any_guest::session").expect("parse"),
            Permission::new(Action::DeleteAny, ResourceKind::GuestSession)
        );
        assert_eq!(
            parse_permission("force_delete_any_domain").expect("parse"),
            Permission::new(Action::ForceDeleteAny, ResourceKind::Domain)
        );
        assert_eq!(
            parse_permission("delete_domain").expect("parse"),
            Permission::new(Action::Delete, ResourceKind::Domain)
        );
    }

    #[test]
    fn rejects_empty_and_unknown_permissions() {
        assert_eq!(
            parse_permission("  "),
            Err(PermissionParseError::EmptyPermission)
        );
        assert_eq!(
            parse_permission("fly_domain"),
            Err(PermissionParseError::UnsupportedPermission(
                "fly_domain".to_string()
            ))
        );
        assert!(parse_permission("view_widget").is_err());
    }

    #[test]
    fn catalog_kinds_are_flagged() {
        assert!(ResourceKind::Criterion.is_catalog());
        assert!(!ResourceKind::Assessment.is_catalog());
        assert!(Action::View.is_read_only());
        assert!(!Action::Update.is_read_only());
    }
}
