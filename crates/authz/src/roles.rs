//! Role registry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use atrium_core::{DomainError, DomainResult, Entity, RoleId};

/// A role a user holds exactly one of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub abbreviation: String,
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Thread-safe in-memory role registry.
///
/// Deleting a role does not touch grants here; the caller cascades through
/// [`crate::RoleGrantStore::purge_role`] so the two stores stay independent.
#[derive(Debug, Default)]
pub struct RoleStore {
    roles: RwLock<HashMap<RoleId, Role>>,
}

impl RoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, role: Role) -> DomainResult<()> {
        if role.name.trim().is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        let mut roles = self.roles.write().unwrap_or_else(PoisonError::into_inner);
        if roles.contains_key(&role.id) {
            return Err(DomainError::conflict(format!("role {} already exists", role.id)));
        }
        if roles.values().any(|r| r.name == role.name) {
            return Err(DomainError::conflict(format!(
                "a role named '{}' already exists",
                role.name
            )));
        }
        roles.insert(role.id, role);
        Ok(())
    }

    pub fn get(&self, id: RoleId) -> Option<Role> {
        self.roles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn list(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .roles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    pub fn remove(&self, id: RoleId) -> Option<Role> {
        self.roles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_role_name_rejected() {
        let store = RoleStore::new();
        store
            .insert(Role {
                id: RoleId::new(),
                name: "Auditor".to_string(),
                abbreviation: "AUD".to_string(),
            })
            .unwrap();

        let err = store
            .insert(Role {
                id: RoleId::new(),
                name: "Auditor".to_string(),
                abbreviation: "AU2".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn remove_returns_the_role() {
        let store = RoleStore::new();
        let id = RoleId::new();
        store
            .insert(Role {
                id,
                name: "Operator".to_string(),
                abbreviation: "OP".to_string(),
            })
            .unwrap();

        assert_eq!(store.remove(id).unwrap().name, "Operator");
        assert!(store.get(id).is_none());
    }
}
