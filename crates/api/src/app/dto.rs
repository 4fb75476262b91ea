use serde::{Deserialize, Serialize};

use atrium_authz::{
    Module, PermissionToken, PermissionVocabulary, Resolution, RoleGrant, Tab,
};
use atrium_core::ModuleId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub document: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub document: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ModuleRequest {
    pub name: String,
    pub icon: String,
    pub path: String,
    pub display_order: u32,
    #[serde(default)]
    pub is_parent: bool,
    pub parent_id: Option<ModuleId>,
    #[serde(default)]
    pub extra_permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TabRequest {
    pub name: String,
    pub icon: String,
    pub path: String,
    pub display_order: u32,
    #[serde(default)]
    pub extra_permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceGrantRequest {
    pub tokens: Vec<String>,
}

pub fn vocabulary_from(extras: Vec<String>) -> PermissionVocabulary {
    PermissionVocabulary::new(extras.into_iter().map(PermissionToken::from))
}

pub fn tokens_from(tokens: Vec<String>) -> Vec<PermissionToken> {
    tokens.into_iter().map(PermissionToken::from).collect()
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ModuleResponse {
    pub id: ModuleId,
    pub name: String,
    pub icon: String,
    pub path: String,
    pub display_order: u32,
    pub is_parent: bool,
    pub parent_id: Option<ModuleId>,
    pub extra_permissions: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Module> for ModuleResponse {
    fn from(module: Module) -> Self {
        Self {
            id: module.id,
            name: module.name,
            icon: module.icon,
            path: module.path,
            display_order: module.display_order,
            is_parent: module.is_parent,
            parent_id: module.parent_id,
            extra_permissions: module
                .extra_permissions
                .extras()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            deleted_at: module.deleted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TabResponse {
    pub id: atrium_core::TabId,
    pub module_id: ModuleId,
    pub name: String,
    pub icon: String,
    pub path: String,
    /// Module segment + tab segment; absent when the owning module is gone.
    pub full_path: Option<String>,
    pub display_order: u32,
    pub extra_permissions: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TabResponse {
    pub fn new(tab: Tab, full_path: Option<String>) -> Self {
        Self {
            id: tab.id,
            module_id: tab.module_id,
            name: tab.name,
            icon: tab.icon,
            path: tab.path,
            full_path,
            display_order: tab.display_order,
            extra_permissions: tab
                .extra_permissions
                .extras()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            deleted_at: tab.deleted_at,
        }
    }
}

/// One grant row in the admin listing, annotated with the node's current
/// state so orphaned rows are visible for cleanup.
#[derive(Debug, Serialize)]
pub struct GrantRowResponse {
    pub node_kind: &'static str,
    pub node_id: Uuid,
    pub node_state: &'static str,
    pub node_name: Option<String>,
    pub tokens: Vec<String>,
}

impl GrantRowResponse {
    pub fn new(row: &RoleGrant, resolution: &Resolution) -> Self {
        Self {
            node_kind: row.node.kind().as_str(),
            node_id: *row.node.as_uuid(),
            node_state: resolution.state_label(),
            node_name: match resolution {
                Resolution::Present(node) => Some(node.name().to_string()),
                _ => None,
            },
            tokens: row
                .tokens
                .tokens()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
        }
    }
}
