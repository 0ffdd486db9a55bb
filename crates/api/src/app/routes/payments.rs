use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use meshmart_core::OrderId;
use meshmart_payments::{PaymentCallback, PaymentOutcome};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Trusted-notifier endpoint; gated by the callback secret middleware, not
/// by user auth. Idempotent against redelivery.
pub async fn payment_callback(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PaymentCallbackRequest>,
) -> axum::response::Response {
    let outcome = match body.outcome.as_str() {
        "success" => PaymentOutcome::Success,
        "failure" => PaymentOutcome::Failure,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "outcome must be 'success' or 'failure'",
            );
        }
    };

    let callback = PaymentCallback {
        order_id: OrderId::new(body.order_id),
        outcome,
        transaction_id: body.transaction_id,
        payment_method: body.payment_method,
    };

    match services.payment_callback(callback).await {
        Ok(result) => (
            StatusCode::OK,
            Json(dto::callback_result_to_json(&result)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
