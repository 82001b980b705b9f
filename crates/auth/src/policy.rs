//! Explicit permission table: `(role, resource, action) → allow`.
//!
//! One table, one check function. Per-resource role grants are data in the
//! table, not logic scattered across per-resource policy objects.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::Role;

/// Resource kinds the API exposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Product,
    Store,
    Inventory,
    Transfer,
    Purchase,
    User,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Product,
        Resource::Store,
        Resource::Inventory,
        Resource::Transfer,
        Resource::Purchase,
        Resource::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Product => "product",
            Resource::Store => "store",
            Resource::Inventory => "inventory",
            Resource::Transfer => "transfer",
            Resource::Purchase => "purchase",
            Resource::User => "user",
        }
    }
}

/// Actions a role may be granted on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' may not {action} {resource}")]
    Forbidden {
        role: String,
        resource: &'static str,
        action: &'static str,
    },
}

/// Allow-list of `(role, resource, action)` grants.
///
/// Absent means deny. A role can additionally be marked wildcard, which grants
/// every action on every resource.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    grants: HashSet<(String, Resource, Action)>,
    wildcard_roles: HashSet<String>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in matrix: `admin` everything, `viewer` read-only, `staff`
    /// read-everything plus write grants on the warehouse-side resources
    /// (inventory, transfers, purchases).
    pub fn default_table() -> Self {
        let mut table = Self::new();
        table.grant_wildcard("admin");
        for resource in Resource::ALL {
            table.grant("viewer", resource, Action::View);
            table.grant("staff", resource, Action::View);
        }
        for resource in [Resource::Inventory, Resource::Transfer, Resource::Purchase] {
            table.grant("staff", resource, Action::Create);
            table.grant("staff", resource, Action::Update);
        }
        table
    }

    pub fn grant(&mut self, role: impl Into<String>, resource: Resource, action: Action) {
        self.grants.insert((role.into(), resource, action));
    }

    pub fn grant_wildcard(&mut self, role: impl Into<String>) {
        self.wildcard_roles.insert(role.into());
    }

    pub fn allows(&self, role: &Role, resource: Resource, action: Action) -> bool {
        self.wildcard_roles.contains(role.as_str())
            || self
                .grants
                .contains(&(role.as_str().to_string(), resource, action))
    }
}

/// Authorize a role for one action on one resource.
///
/// - No IO
/// - No panics
/// - Pure policy lookup
pub fn authorize(
    table: &PermissionTable,
    role: &Role,
    resource: Resource,
    action: Action,
) -> Result<(), AuthzError> {
    if table.allows(role, resource, action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: role.as_str().to_string(),
            resource: resource.as_str(),
            action: action.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PermissionTable {
        PermissionTable::default_table()
    }

    #[test]
    fn admin_may_do_everything() {
        let table = table();
        let admin = Role::new("admin");
        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(
                    authorize(&table, &admin, resource, action).is_ok(),
                    "admin denied {action:?} on {resource:?}"
                );
            }
        }
    }

    #[test]
    fn viewer_is_read_only() {
        let table = table();
        let viewer = Role::new("viewer");
        for resource in Resource::ALL {
            assert!(authorize(&table, &viewer, resource, Action::View).is_ok());
            assert!(authorize(&table, &viewer, resource, Action::Create).is_err());
            assert!(authorize(&table, &viewer, resource, Action::Delete).is_err());
        }
    }

    #[test]
    fn staff_writes_warehouse_resources_only() {
        let table = table();
        let staff = Role::new("staff");
        assert!(authorize(&table, &staff, Resource::Transfer, Action::Create).is_ok());
        assert!(authorize(&table, &staff, Resource::Inventory, Action::Update).is_ok());
        assert!(authorize(&table, &staff, Resource::Purchase, Action::Create).is_ok());
        assert!(authorize(&table, &staff, Resource::Store, Action::Create).is_err());
        assert!(authorize(&table, &staff, Resource::User, Action::Create).is_err());
        assert!(authorize(&table, &staff, Resource::Transfer, Action::Delete).is_err());
    }

    #[test]
    fn unknown_role_is_denied() {
        let table = table();
        let ghost = Role::new("ghost");
        assert!(authorize(&table, &ghost, Resource::Product, Action::View).is_err());
    }

    #[test]
    fn denial_names_role_resource_action() {
        let table = table();
        let err = authorize(&table, &Role::new("viewer"), Resource::Store, Action::Delete)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("viewer"));
        assert!(msg.contains("store"));
        assert!(msg.contains("delete"));
    }
}
