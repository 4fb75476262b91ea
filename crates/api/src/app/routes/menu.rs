use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::context::ActorContext;

/// GET /menu — the actor's navigable menu (served read-through from the
/// role-keyed cache).
pub async fn menu(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> impl IntoResponse {
    let menu = services.menu(actor.role_id());
    Json(serde_json::json!({ "menu": &*menu }))
}
