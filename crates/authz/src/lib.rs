//! `atrium-authz` — hierarchical authorization model for the portal.
//!
//! Owns the module/tab tree, the role→node permission grants, and the
//! access gate that every administrative surface consults before executing.
//! This crate is intentionally decoupled from HTTP and storage backends;
//! stores are in-memory and thread-safe.

mod audited;
pub mod gate;
pub mod grants;
pub mod menu;
pub mod node;
pub mod permissions;
pub mod roles;
pub mod tree;

pub use gate::{AccessGate, Decision, DenyReason};
pub use grants::{GrantError, InMemoryRoleGrantStore, RoleGrant, RoleGrantStore};
pub use menu::{menu_for, MenuCache, MenuEntry};
pub use node::{Module, Node, NodeKey, NodeKind, Resolution, Tab};
pub use permissions::{PermissionSet, PermissionToken, PermissionVocabulary, BASE_ACTIONS};
pub use roles::{Role, RoleStore};
pub use tree::AuthorizationTree;
