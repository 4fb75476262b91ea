//! Navigable menu construction and the role-keyed read-through cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use atrium_core::RoleId;

use crate::grants::RoleGrantStore;
use crate::node::{Module, NodeKey, Tab};
use crate::tree::AuthorizationTree;

/// One menu row: a module and the tabs the role can navigate to under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub module: Module,
    pub tabs: Vec<Tab>,
}

/// Builds the navigable menu for a role.
///
/// A module appears iff it is directly granted or at least one of its tabs
/// is visible. Tab visibility composes downward: a tab is visible if the tab
/// itself is granted or its parent module is granted (action tokens on the
/// tab still require a tab grant; the gate handles that). Ordering follows
/// stored display order, ties by id ascending; soft-deleted nodes never
/// appear.
pub fn menu_for(
    tree: &AuthorizationTree,
    grants: &dyn RoleGrantStore,
    role: RoleId,
) -> Vec<MenuEntry> {
    let mut entries = Vec::new();

    for module in tree.modules() {
        let module_granted = grants.tokens_for(role, NodeKey::Module(module.id)).is_some();

        let tabs: Vec<Tab> = tree
            .children_of(module.id)
            .into_iter()
            .filter(|tab| {
                module_granted || grants.tokens_for(role, NodeKey::Tab(tab.id)).is_some()
            })
            .collect();

        if module_granted || !tabs.is_empty() {
            entries.push(MenuEntry { module, tabs });
        }
    }

    entries
}

/// Read-through menu cache keyed by role.
///
/// Replaces the source system's process-wide mutable configuration cache:
/// this one is an explicit dependency, invalidated by grant/revoke, role
/// purge, and any tree mutation.
#[derive(Debug, Default)]
pub struct MenuCache {
    inner: RwLock<HashMap<RoleId, Arc<Vec<MenuEntry>>>>,
}

impl MenuCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached menu for a role, building it on a miss.
    pub fn get_or_build<F>(&self, role: RoleId, build: F) -> Arc<Vec<MenuEntry>>
    where
        F: FnOnce() -> Vec<MenuEntry>,
    {
        if let Some(menu) = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&role)
        {
            return Arc::clone(menu);
        }

        let menu = Arc::new(build());
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(role, Arc::clone(&menu));
        menu
    }

    /// Drops the cached menu for one role (grant/revoke on that role).
    pub fn invalidate(&self, role: RoleId) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&role);
    }

    /// Drops every cached menu (tree mutations affect all roles).
    pub fn invalidate_all(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::InMemoryRoleGrantStore;
    use crate::node::Node;
    use crate::permissions::PermissionVocabulary;
    use atrium_core::{ModuleId, TabId};
    use chrono::Utc;

    fn module(name: &str, order: u32) -> Module {
        Module {
            id: ModuleId::new(),
            name: name.to_string(),
            icon: "grid".to_string(),
            path: name.to_lowercase(),
            display_order: order,
            is_parent: false,
            parent_id: None,
            extra_permissions: PermissionVocabulary::empty(),
            deleted_at: None,
        }
    }

    fn tab(module_id: ModuleId, name: &str, order: u32) -> Tab {
        Tab {
            id: TabId::new(),
            module_id,
            name: name.to_string(),
            icon: "tab".to_string(),
            path: name.to_lowercase(),
            display_order: order,
            extra_permissions: PermissionVocabulary::empty(),
            deleted_at: None,
        }
    }

    fn resolved(tree: &AuthorizationTree, key: NodeKey) -> Node {
        tree.resolve(key).into_present().unwrap()
    }

    #[test]
    fn ungranted_module_is_invisible() {
        let tree = AuthorizationTree::new();
        tree.insert_module(module("Contracts", 1)).unwrap();
        let grants = InMemoryRoleGrantStore::new();

        assert!(menu_for(&tree, &grants, RoleId::new()).is_empty());
    }

    #[test]
    fn directly_granted_module_appears_without_tabs() {
        let tree = AuthorizationTree::new();
        let m = module("Dashboard", 1);
        let key = NodeKey::Module(m.id);
        tree.insert_module(m).unwrap();

        let grants = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        grants.grant(role, &resolved(&tree, key), &[]).unwrap();

        let menu = menu_for(&tree, &grants, role);
        assert_eq!(menu.len(), 1);
        assert!(menu[0].tabs.is_empty());
    }

    #[test]
    fn module_appears_when_only_a_tab_is_granted() {
        let tree = AuthorizationTree::new();
        let m = module("Contracts", 1);
        let module_id = m.id;
        tree.insert_module(m).unwrap();
        let t = tab(module_id, "Active", 1);
        let tab_key = NodeKey::Tab(t.id);
        tree.insert_tab(t).unwrap();
        tree.insert_tab(tab(module_id, "Expired", 2)).unwrap();

        let grants = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        grants.grant(role, &resolved(&tree, tab_key), &[]).unwrap();

        let menu = menu_for(&tree, &grants, role);
        assert_eq!(menu.len(), 1);
        // Only the granted tab shows; the sibling stays hidden.
        assert_eq!(menu[0].tabs.len(), 1);
        assert_eq!(menu[0].tabs[0].name, "Active");
    }

    #[test]
    fn module_grant_composes_down_to_its_tabs() {
        let tree = AuthorizationTree::new();
        let m = module("Contracts", 1);
        let module_id = m.id;
        let module_key = NodeKey::Module(module_id);
        tree.insert_module(m).unwrap();
        tree.insert_tab(tab(module_id, "Active", 1)).unwrap();
        tree.insert_tab(tab(module_id, "Expired", 2)).unwrap();

        let grants = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        grants.grant(role, &resolved(&tree, module_key), &[]).unwrap();

        let menu = menu_for(&tree, &grants, role);
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].tabs.len(), 2);
    }

    #[test]
    fn menu_ordering_follows_display_order() {
        let tree = AuthorizationTree::new();
        let a = module("Zeta", 2);
        let b = module("Alpha", 1);
        let a_key = NodeKey::Module(a.id);
        let b_key = NodeKey::Module(b.id);
        tree.insert_module(a).unwrap();
        tree.insert_module(b).unwrap();

        let grants = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        grants.grant(role, &resolved(&tree, a_key), &[]).unwrap();
        grants.grant(role, &resolved(&tree, b_key), &[]).unwrap();

        let menu = menu_for(&tree, &grants, role);
        assert_eq!(menu[0].module.name, "Alpha");
        assert_eq!(menu[1].module.name, "Zeta");
    }

    #[test]
    fn soft_deleted_module_disappears_from_menu() {
        let tree = AuthorizationTree::new();
        let m = module("Contracts", 1);
        let id = m.id;
        let key = NodeKey::Module(id);
        tree.insert_module(m).unwrap();

        let grants = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        grants.grant(role, &resolved(&tree, key), &[]).unwrap();

        tree.soft_delete_module(id, Utc::now()).unwrap();
        assert!(menu_for(&tree, &grants, role).is_empty());
    }

    #[test]
    fn cache_serves_stale_until_invalidated() {
        let tree = AuthorizationTree::new();
        let m = module("Contracts", 1);
        let key = NodeKey::Module(m.id);
        tree.insert_module(m).unwrap();

        let grants = InMemoryRoleGrantStore::new();
        let role = RoleId::new();
        let cache = MenuCache::new();

        let empty = cache.get_or_build(role, || menu_for(&tree, &grants, role));
        assert!(empty.is_empty());

        grants.grant(role, &resolved(&tree, key), &[]).unwrap();

        // Still a hit on the stale entry until someone invalidates.
        let still_empty = cache.get_or_build(role, || menu_for(&tree, &grants, role));
        assert!(still_empty.is_empty());

        cache.invalidate(role);
        let fresh = cache.get_or_build(role, || menu_for(&tree, &grants, role));
        assert_eq!(fresh.len(), 1);
    }
}
