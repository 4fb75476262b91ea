use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use atrium_audit::{AuditFilter, AuditStore};

use crate::app::routes::require_admin;
use crate::app::services::AppServices;
use crate::context::ActorContext;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub table: Option<String>,
    pub record_id: Option<String>,
}

/// GET /admin/audit?table=&record_id= — matching records, newest first.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<AuditQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&services, &actor) {
        return resp;
    }

    let filter = AuditFilter {
        table_name: query.table,
        record_id: query.record_id,
    };
    let records = services.audit_store().query(&filter);

    (StatusCode::OK, Json(serde_json::json!({ "records": records }))).into_response()
}
