//! Role→node permission grants.
//!
//! The existence of a grant row is what makes a node visible to a role; the
//! token set on the row authorizes concrete actions. An empty token set is a
//! legal "visible, no actions" state.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use atrium_core::RoleId;

use crate::node::{Node, NodeKey};
use crate::permissions::{PermissionSet, PermissionToken};

/// One role→node grant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role_id: RoleId,
    pub node: NodeKey,
    pub tokens: PermissionSet,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// The token is neither a base action nor declared on the node.
    #[error("permission token '{0}' is not declared on the target node")]
    InvalidPermissionToken(String),
}

/// Store of the many-to-many role↔node permission mapping.
pub trait RoleGrantStore: Send + Sync {
    /// Replaces the full token set for (role, node). Idempotent, never
    /// additive. Every token must pass the node's vocabulary; on rejection
    /// nothing is applied. The replace is atomic: no reader observes a
    /// transient empty or duplicated set.
    fn grant(
        &self,
        role: RoleId,
        node: &Node,
        tokens: &[PermissionToken],
    ) -> Result<(), GrantError>;

    /// Deletes the row entirely; the node disappears from the role's menu.
    /// Returns whether a row existed.
    fn revoke(&self, role: RoleId, node: NodeKey) -> bool;

    /// `Some(empty)` still means "visible, no actions"; `None` means the
    /// node is invisible to the role.
    fn tokens_for(&self, role: RoleId, node: NodeKey) -> Option<PermissionSet>;

    fn is_granted(&self, role: RoleId, node: NodeKey, token: &str) -> bool {
        self.tokens_for(role, node)
            .is_some_and(|set| set.contains(token))
    }

    /// All rows for a role, for administration (including orphaned ones).
    fn grants_for_role(&self, role: RoleId) -> Vec<RoleGrant>;

    /// Cascade used when a role is deleted. Returns the number of rows removed.
    fn purge_role(&self, role: RoleId) -> usize;
}

/// In-memory grant store.
///
/// A single `RwLock` over the row map gives `grant` its delete-then-insert
/// atomicity for free: the replacement happens under one write guard.
#[derive(Debug, Default)]
pub struct InMemoryRoleGrantStore {
    rows: RwLock<HashMap<(RoleId, NodeKey), PermissionSet>>,
}

impl InMemoryRoleGrantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleGrantStore for InMemoryRoleGrantStore {
    fn grant(
        &self,
        role: RoleId,
        node: &Node,
        tokens: &[PermissionToken],
    ) -> Result<(), GrantError> {
        // Validate the whole set before touching the row; a bad token must
        // not partially apply.
        let vocabulary = node.vocabulary();
        for token in tokens {
            if !vocabulary.allows(token.as_str()) {
                return Err(GrantError::InvalidPermissionToken(
                    token.as_str().to_string(),
                ));
            }
        }

        let set = PermissionSet::new(tokens.iter().cloned());
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((role, node.key()), set);
        Ok(())
    }

    fn revoke(&self, role: RoleId, node: NodeKey) -> bool {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(role, node))
            .is_some()
    }

    fn tokens_for(&self, role: RoleId, node: NodeKey) -> Option<PermissionSet> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(role, node))
            .cloned()
    }

    fn grants_for_role(&self, role: RoleId) -> Vec<RoleGrant> {
        let mut grants: Vec<RoleGrant> = self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((r, _), _)| *r == role)
            .map(|((r, node), tokens)| RoleGrant {
                role_id: *r,
                node: *node,
                tokens: tokens.clone(),
            })
            .collect();
        grants.sort_by_key(|g| g.node);
        grants
    }

    fn purge_role(&self, role: RoleId) -> usize {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let before = rows.len();
        rows.retain(|(r, _), _| *r != role);
        before - rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Module;
    use crate::permissions::PermissionVocabulary;
    use atrium_core::ModuleId;

    fn node_with_extras(extras: &[&str]) -> Node {
        Node::Module(Module {
            id: ModuleId::new(),
            name: "Contracts".to_string(),
            icon: "file".to_string(),
            path: "contracts".to_string(),
            display_order: 1,
            is_parent: false,
            parent_id: None,
            extra_permissions: PermissionVocabulary::new(
                extras.iter().map(|e| PermissionToken::from(*e)),
            ),
            deleted_at: None,
        })
    }

    #[test]
    fn grant_is_full_replace_not_additive() {
        let store = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let node = node_with_extras(&[]);

        store
            .grant(role, &node, &[PermissionToken::from("view")])
            .unwrap();
        store
            .grant(role, &node, &[PermissionToken::from("edit")])
            .unwrap();

        let tokens = store.tokens_for(role, node.key()).unwrap();
        assert!(tokens.contains("edit"));
        assert!(!tokens.contains("view"));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn undeclared_token_rejected_without_partial_apply() {
        let store = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let node = node_with_extras(&["export"]);

        let err = store
            .grant(
                role,
                &node,
                &[PermissionToken::from("view"), PermissionToken::from("approve")],
            )
            .unwrap_err();
        assert_eq!(
            err,
            GrantError::InvalidPermissionToken("approve".to_string())
        );
        // Nothing applied, not even the valid token.
        assert!(store.tokens_for(role, node.key()).is_none());
    }

    #[test]
    fn declared_extra_token_accepted() {
        let store = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let node = node_with_extras(&["export"]);

        store
            .grant(role, &node, &[PermissionToken::from("export")])
            .unwrap();
        assert!(store.is_granted(role, node.key(), "export"));
    }

    #[test]
    fn empty_grant_is_visible_but_actionless() {
        let store = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let node = node_with_extras(&[]);

        store.grant(role, &node, &[]).unwrap();
        let tokens = store.tokens_for(role, node.key()).unwrap();
        assert!(tokens.is_empty());
        assert!(!store.is_granted(role, node.key(), "view"));
    }

    #[test]
    fn revoke_removes_the_row() {
        let store = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let node = node_with_extras(&[]);

        store.grant(role, &node, &[]).unwrap();
        assert!(store.revoke(role, node.key()));
        assert!(store.tokens_for(role, node.key()).is_none());
        assert!(!store.revoke(role, node.key()));
    }

    #[test]
    fn replace_is_atomic_under_concurrent_readers() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryRoleGrantStore::new());
        let role = RoleId::new();
        let node = node_with_extras(&[]);
        let key = node.key();

        let first = || [PermissionToken::from("view"), PermissionToken::from("edit")];
        let second = || {
            [
                PermissionToken::from("create"),
                PermissionToken::from("delete"),
            ]
        };
        store.grant(role, &node, &first()).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..500 {
                    let set = if i % 2 == 0 { second() } else { first() };
                    store.grant(role, &node, &set).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        // The row must never vanish or show a partial set
                        // while replacements are in flight.
                        let tokens = store.tokens_for(role, key).unwrap();
                        let names: Vec<&str> =
                            tokens.tokens().iter().map(|t| t.as_str()).collect();
                        assert!(
                            names == ["view", "edit"] || names == ["create", "delete"],
                            "observed a transient token set: {names:?}"
                        );
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn purge_role_cascades_all_rows() {
        let store = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let other = RoleId::new();
        let a = node_with_extras(&[]);
        let b = node_with_extras(&[]);

        store.grant(role, &a, &[]).unwrap();
        store.grant(role, &b, &[]).unwrap();
        store.grant(other, &a, &[]).unwrap();

        assert_eq!(store.purge_role(role), 2);
        assert!(store.tokens_for(role, a.key()).is_none());
        assert!(store.tokens_for(other, a.key()).is_some());
    }
}
