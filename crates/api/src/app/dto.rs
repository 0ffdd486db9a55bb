use serde::Deserialize;
use serde_json::json;

use meshmart_entitlements::AccessGrant;
use meshmart_orders::{OrderPage, OrderWithItems};
use meshmart_payments::{CallbackDisposition, CallbackResult};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentCallbackRequest {
    pub order_id: i64,
    /// "success" or "failure".
    pub outcome: String,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn order_to_json(order: &OrderWithItems) -> serde_json::Value {
    json!({
        "id": order.order.id,
        "user_id": order.order.user_id,
        "total_amount": order.order.total_amount,
        "status": order.order.status,
        "transaction_id": order.order.transaction_id,
        "payment_method": order.order.payment_method,
        "created_at": order.order.created_at.to_rfc3339(),
        "items": order.items.iter().map(|item| json!({
            "id": item.id,
            "product_id": item.product_id,
            "price": item.price,
        })).collect::<Vec<_>>(),
    })
}

pub fn order_page_to_json(page: &OrderPage) -> serde_json::Value {
    json!({
        "items": page.items.iter().map(order_to_json).collect::<Vec<_>>(),
        "pagination": {
            "page": page.page,
            "page_size": page.page_size,
            "total": page.total,
            "pages": page.page_count(),
        },
    })
}

pub fn access_to_json(access: &AccessGrant) -> serde_json::Value {
    json!({
        "download_url": access.redemption_target,
        "token": access.token,
        "expires_at": access.expires_at.to_rfc3339(),
    })
}

pub fn callback_result_to_json(result: &CallbackResult) -> serde_json::Value {
    let disposition = match result.disposition {
        CallbackDisposition::Applied => "applied",
        CallbackDisposition::AlreadySettled => "already_settled",
    };
    json!({
        "disposition": disposition,
        "order": {
            "id": result.order.id,
            "status": result.order.status,
            "transaction_id": result.order.transaction_id,
        },
        "issuance": {
            "issued": result.issuance.issued.len(),
            // Item ids whose grants failed to persist; a retry should be
            // scoped to exactly these.
            "failed_items": result.issuance.failed.iter()
                .map(|f| f.item_id)
                .collect::<Vec<_>>(),
        },
    })
}
