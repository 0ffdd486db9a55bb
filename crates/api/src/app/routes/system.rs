use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::PrincipalContext;

pub async fn health() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

pub async fn whoami(
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let p = principal.principal();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "user_id": p.user_id,
            "role": p.role,
        })),
    )
        .into_response()
}
