//! Guarded node surfaces. The route guards run before these handlers, so a
//! request that reaches them has already passed the access gate; the
//! handlers only shape the response.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use atrium_authz::{Node, NodeKey};
use atrium_core::{ModuleId, TabId};

use crate::app::dto::{ModuleResponse, TabResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::middleware;

pub fn router() -> Router {
    let module = Router::new()
        .route("/:module_id", get(get_module))
        .route_layer(axum::middleware::from_fn(middleware::require_module_access));

    let tab = Router::new()
        .route("/:module_id/tabs/:tab_id", get(get_tab))
        .route_layer(axum::middleware::from_fn(middleware::require_tab_access));

    module.merge(tab)
}

pub async fn get_module(
    Extension(services): Extension<Arc<AppServices>>,
    Path(module_id): Path<ModuleId>,
) -> axum::response::Response {
    match services
        .tree()
        .resolve(NodeKey::Module(module_id))
        .into_present()
    {
        Some(Node::Module(module)) => {
            let tabs: Vec<TabResponse> = services
                .tree()
                .children_of(module.id)
                .into_iter()
                .map(|tab| {
                    let full_path = services.tree().full_path(&tab);
                    TabResponse::new(tab, full_path)
                })
                .collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "module": ModuleResponse::from(module),
                    "tabs": tabs,
                })),
            )
                .into_response()
        }
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "module not found"),
    }
}

pub async fn get_tab(
    Extension(services): Extension<Arc<AppServices>>,
    Path((module_id, tab_id)): Path<(ModuleId, TabId)>,
) -> axum::response::Response {
    let resolved = services.tree().resolve(NodeKey::Tab(tab_id)).into_present();
    match resolved {
        Some(Node::Tab(tab)) if tab.module_id == module_id => {
            let full_path = services.tree().full_path(&tab);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "tab": TabResponse::new(tab, full_path) })),
            )
                .into_response()
        }
        _ => errors::json_error(StatusCode::NOT_FOUND, "not_found", "tab not found"),
    }
}
