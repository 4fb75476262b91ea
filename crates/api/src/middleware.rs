use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};
use chrono::Utc;

use atrium_authz::{Decision, NodeKey};
use atrium_core::{ModuleId, TabId};
use atrium_identity::TokenValidator;

use crate::app::{errors, services::AppServices};
use crate::context::ActorContext;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn TokenValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .sessions
        .validate(token, Utc::now())
        .map_err(|_e| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(ActorContext::new(
        claims.sub,
        claims.role_id,
        claims.document.clone(),
    ));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

/// Route guard for `/modules/:module_id` surfaces: the actor's role must hold
/// a grant row for the module before the handler runs.
pub async fn require_module_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(module_id) = parse_param::<ModuleId>(&params, "module_id") else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid module id");
    };

    match services.decide(actor.role_id(), NodeKey::Module(module_id), None) {
        Decision::Allow => next.run(req).await,
        Decision::Deny(reason) => errors::deny_response(&reason),
    }
}

/// Route guard for tab surfaces. Navigation composes downward like the menu:
/// a grant on the owning module suffices. Action tokens still require a
/// direct tab grant; handlers check those through the gate.
pub async fn require_tab_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(tab_id) = parse_param::<TabId>(&params, "tab_id") else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid tab id");
    };

    match services.decide_tab_navigation(actor.role_id(), tab_id) {
        Decision::Allow => next.run(req).await,
        Decision::Deny(reason) => errors::deny_response(&reason),
    }
}

fn parse_param<T: core::str::FromStr>(params: &HashMap<String, String>, name: &str) -> Option<T> {
    params.get(name).and_then(|raw| raw.parse().ok())
}
