use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use meshmart_core::{OrderId, ProductId};
use meshmart_orders::OrderItemRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_my_orders))
        .route("/:id", get(get_order))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let items: Vec<OrderItemRequest> = body
        .items
        .iter()
        .map(|item| OrderItemRequest {
            product_id: ProductId::new(item.product_id),
            quantity: item.quantity,
        })
        .collect();

    match services.create_order(principal.user_id(), &items).await {
        Ok(created) => (StatusCode::CREATED, Json(dto::order_to_json(&created))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_my_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.list_user_orders(principal.user_id()).await {
        Ok(orders) => {
            let items: Vec<_> = orders.iter().map(dto::order_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    match services
        .get_order(&principal.principal(), OrderId::new(id))
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
