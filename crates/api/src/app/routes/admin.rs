use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use meshmart_orders::{OrderStatus, PageRequest, store::DEFAULT_PAGE_SIZE};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/orders", get(list_all_orders))
}

pub async fn list_all_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AdminOrdersQuery>,
) -> axum::response::Response {
    if let Err(denied) = authz::require_admin(&principal) {
        return denied;
    }

    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<OrderStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "status must be one of: pending, paid, cancelled",
                );
            }
        },
    };

    let request = PageRequest::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );

    match services.list_all_orders(request, status).await {
        Ok(page) => (StatusCode::OK, Json(dto::order_page_to_json(&page))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
