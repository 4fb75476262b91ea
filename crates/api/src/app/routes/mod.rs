use axum::{routing::get, Router};

use atrium_authz::Decision;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub mod audit;
pub mod auth;
pub mod directory;
pub mod grants;
pub mod menu;
pub mod nodes;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/menu", get(menu::menu))
        .nest("/modules", nodes::router())
        .nest("/admin", admin_router())
}

fn admin_router() -> Router {
    Router::new()
        .merge(directory::router())
        .merge(grants::router())
        .route("/audit", get(audit::list))
}

/// Admin surfaces gate on `edit` over the security module; the caller's own
/// role goes through the same access gate as everyone else.
pub(crate) fn require_admin(
    services: &AppServices,
    actor: &ActorContext,
) -> Result<(), axum::response::Response> {
    match services.admin_gate(actor.role_id()) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(errors::deny_response(&reason)),
    }
}
