//! Directory administration: modules, tabs, and roles. Every mutation runs
//! through the audited service path and invalidates the menu cache.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};

use atrium_authz::{Module, Node, NodeKey, Role, Tab};
use atrium_core::{ModuleId, RoleId, TabId};

use crate::app::dto::{
    vocabulary_from, CreateRoleRequest, ModuleRequest, ModuleResponse, TabRequest, TabResponse,
};
use crate::app::errors;
use crate::app::routes::require_admin;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/modules", get(list_modules).post(create_module))
        .route("/modules/:module_id", put(update_module).delete(delete_module))
        .route("/modules/:module_id/tabs", post(create_tab))
        .route("/tabs/:tab_id", put(update_tab).delete(delete_tab))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:role_id", delete(delete_role))
}

// ── Modules ──────────────────────────────────────────────────────────────

pub async fn list_modules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let modules: Vec<serde_json::Value> = services
        .tree()
        .modules()
        .into_iter()
        .map(|module| {
            let tabs: Vec<TabResponse> = services
                .tree()
                .children_of(module.id)
                .into_iter()
                .map(|tab| {
                    let full_path = services.tree().full_path(&tab);
                    TabResponse::new(tab, full_path)
                })
                .collect();
            serde_json::json!({
                "module": ModuleResponse::from(module),
                "tabs": tabs,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "modules": modules }))).into_response()
}

pub async fn create_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<ModuleRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let module = Module {
        id: ModuleId::new(),
        name: body.name,
        icon: body.icon,
        path: body.path,
        display_order: body.display_order,
        is_parent: body.is_parent,
        parent_id: body.parent_id,
        extra_permissions: vocabulary_from(body.extra_permissions),
        deleted_at: None,
    };

    match services.create_module(actor.user_id(), module) {
        Ok(module) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "module": ModuleResponse::from(module) })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(module_id): Path<ModuleId>,
    Json(body): Json<ModuleRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    // Updates apply to live modules only; soft-deleted ones read as gone.
    let Some(Node::Module(_)) = services
        .tree()
        .resolve(NodeKey::Module(module_id))
        .into_present()
    else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "module not found");
    };

    let module = Module {
        id: module_id,
        name: body.name,
        icon: body.icon,
        path: body.path,
        display_order: body.display_order,
        is_parent: body.is_parent,
        parent_id: body.parent_id,
        extra_permissions: vocabulary_from(body.extra_permissions),
        deleted_at: None,
    };

    match services.update_module(actor.user_id(), module) {
        Ok(module) => (
            StatusCode::OK,
            Json(serde_json::json!({ "module": ModuleResponse::from(module) })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_module(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(module_id): Path<ModuleId>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    match services.soft_delete_module(actor.user_id(), module_id) {
        Ok(module) => (
            StatusCode::OK,
            Json(serde_json::json!({ "module": ModuleResponse::from(module) })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── Tabs ─────────────────────────────────────────────────────────────────

pub async fn create_tab(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(module_id): Path<ModuleId>,
    Json(body): Json<TabRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let tab = Tab {
        id: TabId::new(),
        module_id,
        name: body.name,
        icon: body.icon,
        path: body.path,
        display_order: body.display_order,
        extra_permissions: vocabulary_from(body.extra_permissions),
        deleted_at: None,
    };

    match services.create_tab(actor.user_id(), tab) {
        Ok(tab) => {
            let full_path = services.tree().full_path(&tab);
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "tab": TabResponse::new(tab, full_path) })),
            )
                .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_tab(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(tab_id): Path<TabId>,
    Json(body): Json<TabRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let Some(Node::Tab(existing)) = services
        .tree()
        .resolve(NodeKey::Tab(tab_id))
        .into_present()
    else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "tab not found");
    };

    let tab = Tab {
        id: tab_id,
        module_id: existing.module_id,
        name: body.name,
        icon: body.icon,
        path: body.path,
        display_order: body.display_order,
        extra_permissions: vocabulary_from(body.extra_permissions),
        deleted_at: None,
    };

    match services.update_tab(actor.user_id(), tab) {
        Ok(tab) => {
            let full_path = services.tree().full_path(&tab);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "tab": TabResponse::new(tab, full_path) })),
            )
                .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_tab(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(tab_id): Path<TabId>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    match services.soft_delete_tab(actor.user_id(), tab_id) {
        Ok(tab) => {
            let full_path = services.tree().full_path(&tab);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "tab": TabResponse::new(tab, full_path) })),
            )
                .into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── Roles ────────────────────────────────────────────────────────────────

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let roles = services.roles().list();
    (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<CreateRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let role = Role {
        id: RoleId::new(),
        name: body.name,
        abbreviation: body.abbreviation,
    };

    match services.create_role(actor.user_id(), role) {
        Ok(role) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "role": role })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(role_id): Path<RoleId>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    match services.delete_role(actor.user_id(), role_id) {
        Ok(role) => (StatusCode::OK, Json(serde_json::json!({ "role": role }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
