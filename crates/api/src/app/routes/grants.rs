//! Grant administration: the full-replace write surface over role→node
//! permission rows.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use atrium_authz::{NodeKey, NodeKind, Resolution};
use atrium_core::RoleId;

use crate::app::dto::{tokens_from, GrantRowResponse, ReplaceGrantRequest};
use crate::app::errors;
use crate::app::routes::require_admin;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/roles/:role_id/grants", get(list_grants))
        .route(
            "/roles/:role_id/grants/:node_kind/:node_id",
            axum::routing::put(replace_grant).delete(revoke_grant),
        )
}

fn parse_node_key(kind: &str, id: &str) -> Option<NodeKey> {
    let kind: NodeKind = kind.parse().ok()?;
    let id: uuid::Uuid = id.parse().ok()?;
    Some(match kind {
        NodeKind::Module => NodeKey::Module(id.into()),
        NodeKind::Tab => NodeKey::Tab(id.into()),
    })
}

/// GET /admin/roles/:role_id/grants — every row the role holds, annotated
/// with the node's current state so administrators can spot orphaned rows.
pub async fn list_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(role_id): Path<RoleId>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }
    if services.roles().get(role_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "role not found");
    }

    let rows: Vec<GrantRowResponse> = services
        .grants()
        .grants_for_role(role_id)
        .iter()
        .map(|row| {
            let resolution = services.tree().resolve(row.node);
            GrantRowResponse::new(row, &resolution)
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "grants": rows }))).into_response()
}

/// PUT /admin/roles/:role_id/grants/:node_kind/:node_id — replaces the full
/// token set. Tokens are validated against the node's vocabulary; a bad
/// token rejects the whole set.
pub async fn replace_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path((role_id, node_kind, node_id)): Path<(RoleId, String, String)>,
    Json(body): Json<ReplaceGrantRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let Some(key) = parse_node_key(&node_kind, &node_id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid node reference");
    };
    if services.roles().get(role_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "role not found");
    }

    let node = match services.tree().resolve(key) {
        Resolution::Present(node) => node,
        Resolution::SoftDeleted => {
            return errors::json_error(
                StatusCode::CONFLICT,
                "node_soft_deleted",
                "cannot grant on a soft-deleted node",
            );
        }
        Resolution::Missing => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "node not found");
        }
    };

    let tokens = tokens_from(body.tokens);
    match services.replace_grant(actor.user_id(), role_id, &node, &tokens) {
        Ok(row) => {
            let resolution = services.tree().resolve(row.node);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "grant": GrantRowResponse::new(&row, &resolution) })),
            )
                .into_response()
        }
        Err(e) => errors::grant_error_to_response(e),
    }
}

/// DELETE — revokes the row entirely; the node disappears from the role's
/// menu on the next build.
pub async fn revoke_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path((role_id, node_kind, node_id)): Path<(RoleId, String, String)>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let Some(key) = parse_node_key(&node_kind, &node_id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid node reference");
    };

    if services.revoke_grant(actor.user_id(), role_id, key) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        errors::json_error(StatusCode::NOT_FOUND, "not_found", "no grant row for this node")
    }
}
