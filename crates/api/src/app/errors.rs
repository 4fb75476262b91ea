use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use atrium_authz::{DenyReason, GrantError};
use atrium_core::DomainError;
use atrium_identity::{IdentityError, RejectReason};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
    }
}

/// Every gate denial renders the same shape: machine-readable code plus a
/// human-readable message.
pub fn deny_response(reason: &DenyReason) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, reason.code(), reason.message())
}

pub fn grant_error_to_response(err: GrantError) -> axum::response::Response {
    match err {
        GrantError::InvalidPermissionToken(token) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_permission_token",
            format!("'{token}' is not a base action or a declared extra permission on this node"),
        ),
    }
}

/// Login terminal states. Each carries its own code so the portal frontend
/// can route the user (lockout notice, registration screen, password form).
pub fn reject_reason_to_response(reason: &RejectReason) -> axum::response::Response {
    let status = match reason {
        RejectReason::VerificationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::UNAUTHORIZED,
    };
    json_error(status, reason.code(), reason.message())
}

pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    match err {
        IdentityError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        IdentityError::DuplicateDocument(_) => json_error(
            StatusCode::CONFLICT,
            "already_registered",
            "an account already exists for this document",
        ),
        IdentityError::Storage(msg) => {
            tracing::error!(error = %msg, "identity storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}
