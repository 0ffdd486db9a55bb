use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use meshmart_core::DomainError;

/// Translate a core error into a transport response, 1:1.
///
/// `Conflict` should not normally reach this point: the payment path turns
/// compare-and-set losses into idempotent no-ops before they become errors.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        DomainError::Expired => json_error(StatusCode::GONE, "expired", "access has expired"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Storage(e) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_error",
            format!("storage failure, retry with backoff: {e}"),
        ),
    }
}

/// Undifferentiated failure for the token-redemption endpoint.
///
/// Collapses unknown vs. expired tokens so the endpoint cannot be used as a
/// token-enumeration oracle.
pub fn invalid_token_response() -> axum::response::Response {
    json_error(
        StatusCode::NOT_FOUND,
        "invalid_token",
        "download token is invalid or expired",
    )
}

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
