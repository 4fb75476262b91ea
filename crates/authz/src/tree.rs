//! The authorization tree: a thread-safe in-memory store of modules and tabs.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use atrium_core::{DomainError, DomainResult, ModuleId, TabId};

use crate::node::{Module, Node, NodeKey, Resolution, Tab};

/// Two-level hierarchy of administrative surfaces.
///
/// Interior locking makes the tree shareable across request handlers; all
/// mutations validate the tree invariants before committing.
#[derive(Debug, Default)]
pub struct AuthorizationTree {
    modules: RwLock<HashMap<ModuleId, Module>>,
    tabs: RwLock<HashMap<TabId, Tab>>,
}

// A poisoned lock only means a writer panicked mid-update of a HashMap entry;
// the map itself is still coherent, so we recover the guard.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl AuthorizationTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Modules ──────────────────────────────────────────────────────────

    pub fn insert_module(&self, module: Module) -> DomainResult<()> {
        module.validate()?;
        let mut modules = write(&self.modules);
        if modules.contains_key(&module.id) {
            return Err(DomainError::conflict(format!(
                "module {} already exists",
                module.id
            )));
        }
        Self::check_parent(&modules, module.parent_id)?;
        modules.insert(module.id, module);
        Ok(())
    }

    pub fn update_module(&self, module: Module) -> DomainResult<Module> {
        module.validate()?;
        let mut modules = write(&self.modules);
        let Some(previous) = modules.get(&module.id).cloned() else {
            return Err(DomainError::NotFound);
        };
        if module.parent_id == Some(module.id) {
            return Err(DomainError::invariant("a module cannot be its own parent"));
        }
        Self::check_parent(&modules, module.parent_id)?;
        // A module that still parents children cannot be demoted to a child.
        if !module.is_parent
            && modules
                .values()
                .any(|m| m.parent_id == Some(module.id) && !m.is_deleted())
        {
            return Err(DomainError::invariant(
                "module still has child modules and cannot stop being a parent",
            ));
        }
        modules.insert(module.id, module);
        Ok(previous)
    }

    /// Soft-deletes a module. Grant rows referencing it are left in place;
    /// they become orphaned and the gate denies through them.
    pub fn soft_delete_module(&self, id: ModuleId, at: DateTime<Utc>) -> DomainResult<Module> {
        let mut modules = write(&self.modules);
        let module = modules.get_mut(&id).ok_or(DomainError::NotFound)?;
        if module.is_deleted() {
            return Err(DomainError::NotFound);
        }
        let before = module.clone();
        module.deleted_at = Some(at);
        Ok(before)
    }

    fn check_parent(
        modules: &HashMap<ModuleId, Module>,
        parent_id: Option<ModuleId>,
    ) -> DomainResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        match modules.get(&parent_id) {
            Some(parent) if parent.is_deleted() => Err(DomainError::invariant(
                "parent module has been deleted",
            )),
            Some(parent) if !parent.is_parent => Err(DomainError::invariant(
                "parent_id must reference a module with is_parent = true",
            )),
            Some(_) => Ok(()),
            None => Err(DomainError::invariant("parent module does not exist")),
        }
    }

    // ── Tabs ─────────────────────────────────────────────────────────────

    pub fn insert_tab(&self, tab: Tab) -> DomainResult<()> {
        tab.validate()?;
        let modules = read(&self.modules);
        match modules.get(&tab.module_id) {
            Some(m) if !m.is_deleted() => {}
            _ => {
                return Err(DomainError::invariant(
                    "tab must belong to a live module",
                ))
            }
        }
        drop(modules);
        let mut tabs = write(&self.tabs);
        if tabs.contains_key(&tab.id) {
            return Err(DomainError::conflict(format!("tab {} already exists", tab.id)));
        }
        tabs.insert(tab.id, tab);
        Ok(())
    }

    pub fn update_tab(&self, tab: Tab) -> DomainResult<Tab> {
        tab.validate()?;
        {
            let modules = read(&self.modules);
            match modules.get(&tab.module_id) {
                Some(m) if !m.is_deleted() => {}
                _ => {
                    return Err(DomainError::invariant(
                        "tab must belong to a live module",
                    ))
                }
            }
        }
        let mut tabs = write(&self.tabs);
        let Some(previous) = tabs.get(&tab.id).cloned() else {
            return Err(DomainError::NotFound);
        };
        tabs.insert(tab.id, tab);
        Ok(previous)
    }

    pub fn soft_delete_tab(&self, id: TabId, at: DateTime<Utc>) -> DomainResult<Tab> {
        let mut tabs = write(&self.tabs);
        let tab = tabs.get_mut(&id).ok_or(DomainError::NotFound)?;
        if tab.is_deleted() {
            return Err(DomainError::NotFound);
        }
        let before = tab.clone();
        tab.deleted_at = Some(at);
        Ok(before)
    }

    // ── Resolution ───────────────────────────────────────────────────────

    /// Resolves a node key to the tri-state the gate and menu share.
    ///
    /// Callers must treat anything but `Present` as a denial, never as an
    /// allow-by-default.
    pub fn resolve(&self, key: NodeKey) -> Resolution {
        match key {
            NodeKey::Module(id) => match read(&self.modules).get(&id) {
                Some(m) if m.is_deleted() => Resolution::SoftDeleted,
                Some(m) => Resolution::Present(Node::Module(m.clone())),
                None => Resolution::Missing,
            },
            NodeKey::Tab(id) => {
                let tab = match read(&self.tabs).get(&id) {
                    Some(t) if t.is_deleted() => return Resolution::SoftDeleted,
                    Some(t) => t.clone(),
                    None => return Resolution::Missing,
                };
                // A live tab under a soft-deleted module is itself orphaned.
                match read(&self.modules).get(&tab.module_id) {
                    Some(m) if m.is_deleted() => Resolution::SoftDeleted,
                    Some(_) => Resolution::Present(Node::Tab(tab)),
                    None => Resolution::Missing,
                }
            }
        }
    }

    /// Live tabs owned by a module, ordered by display order then id.
    pub fn children_of(&self, module_id: ModuleId) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = read(&self.tabs)
            .values()
            .filter(|t| t.module_id == module_id && !t.is_deleted())
            .cloned()
            .collect();
        tabs.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        tabs
    }

    /// Live modules, ordered by display order then id.
    pub fn modules(&self) -> Vec<Module> {
        let mut modules: Vec<Module> = read(&self.modules)
            .values()
            .filter(|m| !m.is_deleted())
            .cloned()
            .collect();
        modules.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        modules
    }

    /// Full navigation path of a tab: module segment + "/" + tab segment.
    pub fn full_path(&self, tab: &Tab) -> Option<String> {
        read(&self.modules)
            .get(&tab.module_id)
            .map(|m| format!("{}/{}", m.path.trim_matches('/'), tab.path.trim_matches('/')))
    }
}
