use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
};

use meshmart_core::{DomainError, ProductId};
use meshmart_entitlements::EntitlementToken;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

/// Authenticated access checks (nested under the protected router).
pub fn router() -> Router {
    Router::new().route("/products/:product_id", get(check_access))
}

/// "Do I still have access" probe used before showing a download button.
/// Read-only; does not consume a redemption.
pub async fn check_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<i64>,
) -> axum::response::Response {
    match services
        .resolve_access(principal.user_id(), ProductId::new(product_id))
        .await
    {
        Ok(access) => (StatusCode::OK, Json(dto::access_to_json(&access))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Bearer-capability endpoint: the token is the whole credential, no
/// session required.
pub async fn redeem(
    Extension(services): Extension<Arc<AppServices>>,
    Path(token): Path<String>,
) -> axum::response::Response {
    let token = EntitlementToken::from_presented(token);
    match services.redeem(&token).await {
        Ok(redemption) => Redirect::temporary(&redemption.redemption_target).into_response(),
        // One undifferentiated signal for unknown vs. expired tokens, so the
        // endpoint cannot be probed as an enumeration oracle.
        Err(DomainError::NotFound | DomainError::Expired) => errors::invalid_token_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
