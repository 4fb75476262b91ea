//! Login and self-registration. These are the only unauthenticated routes
//! besides /health; the verifier's rate limiter throttles them per
//! (document, source address).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use atrium_identity::{LoginOutcome, LoginSubmission, RegisterOutcome};

use crate::app::dto::{LoginRequest, RegisterRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let submission = LoginSubmission {
        document: body.document,
        password: body.password,
        remember: body.remember,
        source: addr.ip(),
    };

    let outcome = match services.verifier.verify(submission).await {
        Ok(outcome) => outcome,
        Err(e) => return errors::identity_error_to_response(e),
    };

    match outcome {
        LoginOutcome::Authenticated { user, session } => (
            StatusCode::OK,
            Json(serde_json::json!({
                "token": session.token,
                "expires_at": session.expires_at,
                "user_id": user.id,
                "role_id": user.role_id,
            })),
        )
            .into_response(),
        LoginOutcome::Blocked => errors::json_error(
            StatusCode::FORBIDDEN,
            "blocked",
            "this account is blocked after repeated failed attempts",
        ),
        LoginOutcome::RegistrationRequired { document } => errors::json_error(
            StatusCode::CONFLICT,
            "registration_required",
            format!("no account exists for document {document}; registration is required"),
        ),
        LoginOutcome::PasswordPrompt => errors::json_error(
            StatusCode::UNAUTHORIZED,
            "password_prompt",
            "an account already exists for this document; sign in with its password",
        ),
        LoginOutcome::RateLimited { retry_after_secs } => errors::json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            format!("too many attempts; retry in {retry_after_secs}s"),
        ),
        LoginOutcome::Rejected(reason) => errors::reject_reason_to_response(&reason),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    let outcome = match services
        .verifier
        .register(&body.document, &body.password, services.default_role())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return errors::identity_error_to_response(e),
    };

    match outcome {
        RegisterOutcome::Created(account) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "user_id": account.id,
                "document": account.document_number,
                "role_id": account.role_id,
            })),
        )
            .into_response(),
        RegisterOutcome::AlreadyRegistered => errors::json_error(
            StatusCode::CONFLICT,
            "already_registered",
            "an account already exists for this document",
        ),
        RegisterOutcome::Rejected(reason) => errors::reject_reason_to_response(&reason),
    }
}
