//! Nodes of the authorization tree: modules and the tabs they own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atrium_core::{DomainError, Entity, ModuleId, TabId};

use crate::permissions::PermissionVocabulary;

/// Top-level or child administrative surface grouping.
///
/// # Invariants
/// - A module with `is_parent = true` has no `parent_id`.
/// - A module with a `parent_id` cannot itself be a parent (two levels max).
/// - `parent_id`, when set, references a live module with `is_parent = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub icon: String,
    /// Navigation path segment (e.g. "contracts").
    pub path: String,
    /// Stored display order; menu ties are broken by id ascending.
    pub display_order: u32,
    pub is_parent: bool,
    pub parent_id: Option<ModuleId>,
    pub extra_permissions: PermissionVocabulary,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Module {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Structural validation that does not require the rest of the tree.
    pub(crate) fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("module name cannot be empty"));
        }
        if self.path.trim().is_empty() {
            return Err(DomainError::validation("module path cannot be empty"));
        }
        if self.is_parent && self.parent_id.is_some() {
            return Err(DomainError::invariant(
                "a parent module cannot itself have a parent",
            ));
        }
        Ok(())
    }
}

impl Entity for Module {
    type Id = ModuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A surface owned by exactly one module; the finest-grained grant target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub module_id: ModuleId,
    pub name: String,
    pub icon: String,
    /// Navigation path segment; the full path prepends the module's segment.
    pub path: String,
    pub display_order: u32,
    /// Independent of the owning module's vocabulary.
    pub extra_permissions: PermissionVocabulary,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tab {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("tab name cannot be empty"));
        }
        if self.path.trim().is_empty() {
            return Err(DomainError::validation("tab path cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for Tab {
    type Id = TabId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Which kind of node a key or grant targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Tab,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Tab => "tab",
        }
    }
}

impl core::str::FromStr for NodeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(NodeKind::Module),
            "tab" => Ok(NodeKind::Tab),
            other => Err(DomainError::validation(format!(
                "unknown node kind '{other}'"
            ))),
        }
    }
}

/// Reference to a node in the tree, usable as a grant key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKey {
    Module(ModuleId),
    Tab(TabId),
}

impl NodeKey {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeKey::Module(_) => NodeKind::Module,
            NodeKey::Tab(_) => NodeKind::Tab,
        }
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        match self {
            NodeKey::Module(id) => id.as_uuid(),
            NodeKey::Tab(id) => id.as_uuid(),
        }
    }
}

impl core::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.as_uuid())
    }
}

/// A resolved node (module or tab).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Module(Module),
    Tab(Tab),
}

impl Node {
    pub fn key(&self) -> NodeKey {
        match self {
            Node::Module(m) => NodeKey::Module(m.id),
            Node::Tab(t) => NodeKey::Tab(t.id),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Module(m) => &m.name,
            Node::Tab(t) => &t.name,
        }
    }

    pub fn vocabulary(&self) -> &PermissionVocabulary {
        match self {
            Node::Module(m) => &m.extra_permissions,
            Node::Tab(t) => &t.extra_permissions,
        }
    }
}

/// Tri-state node resolution shared by the gate, the menu builder, and the
/// administrative grant listing.
///
/// `SoftDeleted` covers both a soft-deleted node and a tab whose owning
/// module was soft-deleted (the "parent deleted" case administrators see
/// when cleaning up orphaned grants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Present(Node),
    SoftDeleted,
    Missing,
}

impl Resolution {
    pub fn into_present(self) -> Option<Node> {
        match self {
            Resolution::Present(node) => Some(node),
            _ => None,
        }
    }

    /// Wire/state label used by the admin cleanup listing.
    pub fn state_label(&self) -> &'static str {
        match self {
            Resolution::Present(_) => "present",
            Resolution::SoftDeleted => "parent_deleted",
            Resolution::Missing => "missing",
        }
    }
}
