//! Access gate: the single enforcement point in front of every surface.
//!
//! - No IO
//! - No panics
//! - Expected business outcomes (denials) are values, never errors

use atrium_core::RoleId;

use crate::grants::RoleGrantStore;
use crate::node::{NodeKey, Resolution};
use crate::tree::AuthorizationTree;

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Machine-readable denial reason; the presentation layer branches on these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// Node is missing or soft-deleted (orphaned grants land here too).
    NodeMissing,
    /// No grant row exists for (role, node).
    NoAccess,
    /// A grant row exists but the required token is not in its set.
    MissingPermission(String),
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NodeMissing => "node_missing",
            DenyReason::NoAccess => "no_access",
            DenyReason::MissingPermission(_) => "missing_permission",
        }
    }

    pub fn message(&self) -> String {
        match self {
            DenyReason::NodeMissing => {
                "the requested surface does not exist or has been removed".to_string()
            }
            DenyReason::NoAccess => "your role has no access to this surface".to_string(),
            DenyReason::MissingPermission(token) => {
                format!("your role lacks the '{token}' permission on this surface")
            }
        }
    }
}

/// Stateless enforcement over the tree and the grant store.
pub struct AccessGate<'a> {
    tree: &'a AuthorizationTree,
    grants: &'a dyn RoleGrantStore,
}

impl<'a> AccessGate<'a> {
    pub fn new(tree: &'a AuthorizationTree, grants: &'a dyn RoleGrantStore) -> Self {
        Self { tree, grants }
    }

    /// Row-existence check: true iff a grant row exists for a live node.
    pub fn can_access(&self, role: RoleId, node: NodeKey) -> bool {
        self.require_permission(role, node, None).is_allow()
    }

    /// Full check. Ambiguous or missing data always resolves to a denial.
    pub fn require_permission(
        &self,
        role: RoleId,
        node: NodeKey,
        token: Option<&str>,
    ) -> Decision {
        match self.tree.resolve(node) {
            Resolution::Present(_) => {}
            Resolution::SoftDeleted | Resolution::Missing => {
                return Decision::Deny(DenyReason::NodeMissing);
            }
        }

        let Some(tokens) = self.grants.tokens_for(role, node) else {
            return Decision::Deny(DenyReason::NoAccess);
        };

        match token {
            None => Decision::Allow,
            Some(token) if tokens.contains(token) => Decision::Allow,
            Some(token) => Decision::Deny(DenyReason::MissingPermission(token.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::InMemoryRoleGrantStore;
    use crate::node::{Module, Node, Tab};
    use crate::permissions::{PermissionToken, PermissionVocabulary};
    use atrium_core::{ModuleId, TabId};
    use chrono::Utc;

    struct Fixture {
        tree: AuthorizationTree,
        grants: InMemoryRoleGrantStore,
        role: RoleId,
        module_id: ModuleId,
        tab_id: TabId,
    }

    fn fixture() -> Fixture {
        let tree = AuthorizationTree::new();
        let module = Module {
            id: ModuleId::new(),
            name: "Contracts".to_string(),
            icon: "file".to_string(),
            path: "contracts".to_string(),
            display_order: 1,
            is_parent: false,
            parent_id: None,
            extra_permissions: PermissionVocabulary::empty(),
            deleted_at: None,
        };
        let module_id = module.id;
        tree.insert_module(module).unwrap();

        let tab = Tab {
            id: TabId::new(),
            module_id,
            name: "Active".to_string(),
            icon: "tab".to_string(),
            path: "active".to_string(),
            display_order: 1,
            extra_permissions: PermissionVocabulary::empty(),
            deleted_at: None,
        };
        let tab_id = tab.id;
        tree.insert_tab(tab).unwrap();

        Fixture {
            tree,
            grants: InMemoryRoleGrantStore::new(),
            role: RoleId::new(),
            module_id,
            tab_id,
        }
    }

    fn resolved(f: &Fixture, key: NodeKey) -> Node {
        f.tree.resolve(key).into_present().unwrap()
    }

    #[test]
    fn missing_node_denies_node_missing() {
        let f = fixture();
        let gate = AccessGate::new(&f.tree, &f.grants);
        assert_eq!(
            gate.require_permission(f.role, NodeKey::Module(ModuleId::new()), None),
            Decision::Deny(DenyReason::NodeMissing)
        );
    }

    #[test]
    fn no_grant_row_denies_no_access() {
        let f = fixture();
        let gate = AccessGate::new(&f.tree, &f.grants);
        assert_eq!(
            gate.require_permission(f.role, NodeKey::Module(f.module_id), None),
            Decision::Deny(DenyReason::NoAccess)
        );
        assert!(!gate.can_access(f.role, NodeKey::Module(f.module_id)));
    }

    #[test]
    fn empty_grant_allows_access_but_no_actions() {
        let f = fixture();
        let node = resolved(&f, NodeKey::Module(f.module_id));
        f.grants.grant(f.role, &node, &[]).unwrap();

        let gate = AccessGate::new(&f.tree, &f.grants);
        assert!(gate.can_access(f.role, NodeKey::Module(f.module_id)));
        assert_eq!(
            gate.require_permission(f.role, NodeKey::Module(f.module_id), Some("view")),
            Decision::Deny(DenyReason::MissingPermission("view".to_string()))
        );
    }

    #[test]
    fn tab_grant_with_edit_denies_delete_allows_edit() {
        let f = fixture();
        let node = resolved(&f, NodeKey::Tab(f.tab_id));
        f.grants
            .grant(f.role, &node, &[PermissionToken::from("edit")])
            .unwrap();

        let gate = AccessGate::new(&f.tree, &f.grants);
        assert_eq!(
            gate.require_permission(f.role, NodeKey::Tab(f.tab_id), Some("delete")),
            Decision::Deny(DenyReason::MissingPermission("delete".to_string()))
        );
        assert_eq!(
            gate.require_permission(f.role, NodeKey::Tab(f.tab_id), Some("edit")),
            Decision::Allow
        );
    }

    #[test]
    fn soft_deleted_module_denies_while_grant_row_survives() {
        let f = fixture();
        let node = resolved(&f, NodeKey::Module(f.module_id));
        f.grants
            .grant(f.role, &node, &[PermissionToken::from("view")])
            .unwrap();

        f.tree.soft_delete_module(f.module_id, Utc::now()).unwrap();

        let gate = AccessGate::new(&f.tree, &f.grants);
        assert!(!gate.can_access(f.role, NodeKey::Module(f.module_id)));
        // The orphaned row remains queryable for administrative cleanup.
        assert!(f.grants.tokens_for(f.role, NodeKey::Module(f.module_id)).is_some());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: `can_access` is true iff a grant row exists for the
            /// (role, node) pair, independent of which tokens it holds.
            #[test]
            fn can_access_iff_grant_row_exists(granted in proptest::collection::vec(any::<bool>(), 8)) {
                let tree = AuthorizationTree::new();
                let grants = InMemoryRoleGrantStore::new();
                let role = RoleId::new();

                let mut keys = Vec::new();
                for (i, grant) in granted.iter().enumerate() {
                    let module = Module {
                        id: ModuleId::new(),
                        name: format!("Module {i}"),
                        icon: "grid".to_string(),
                        path: format!("module-{i}"),
                        display_order: i as u32,
                        is_parent: false,
                        parent_id: None,
                        extra_permissions: PermissionVocabulary::empty(),
                        deleted_at: None,
                    };
                    let key = NodeKey::Module(module.id);
                    tree.insert_module(module).unwrap();
                    if *grant {
                        let node = tree.resolve(key).into_present().unwrap();
                        grants.grant(role, &node, &[]).unwrap();
                    }
                    keys.push((key, *grant));
                }

                let gate = AccessGate::new(&tree, &grants);
                for (key, grant) in keys {
                    prop_assert_eq!(gate.can_access(role, key), grant);
                }
            }
        }
    }
}
