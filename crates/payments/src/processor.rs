use chrono::{DateTime, Utc};
use uuid::Uuid;

use meshmart_core::{DomainError, DomainResult, OrderId};
use meshmart_entitlements::{DownloadStore, EntitlementIssuer, IssuanceReport};
use meshmart_orders::{
    Order, OrderStatus, OrderStore, OrderWithItems, StatusTransition, TransitionOutcome,
};

/// What the external notifier reported about the payment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Failure,
}

/// One delivery of a payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCallback {
    pub order_id: OrderId,
    pub outcome: PaymentOutcome,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

/// Whether this delivery changed anything.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// This delivery won the transition (and ran issuance if paid).
    Applied,
    /// The order was already terminal: either settled earlier or another
    /// concurrent delivery won the compare-and-set. No side effects.
    AlreadySettled,
}

/// Result of processing one callback delivery.
#[derive(Debug)]
pub struct CallbackResult {
    pub order: Order,
    pub disposition: CallbackDisposition,
    pub issuance: IssuanceReport,
}

/// Advances an order's state on receipt of an external payment notification
/// and triggers entitlement issuance on success.
pub struct PaymentProcessor<S, D> {
    orders: S,
    issuer: EntitlementIssuer<D>,
}

impl<S, D> PaymentProcessor<S, D>
where
    S: OrderStore,
    D: DownloadStore,
{
    pub fn new(orders: S, issuer: EntitlementIssuer<D>) -> Self {
        Self { orders, issuer }
    }

    /// Process one notification delivery. Idempotent: redelivery against a
    /// terminal order returns the order unchanged with no side effects.
    ///
    /// The status update is a compare-and-set on `pending`: of two racing
    /// deliveries exactly one applies the transition and runs issuance; the
    /// loser observes the terminal row and is a no-op (never an error).
    pub async fn handle_callback(
        &self,
        callback: PaymentCallback,
        now: DateTime<Utc>,
    ) -> DomainResult<CallbackResult> {
        let existing = self
            .orders
            .get_order(callback.order_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        if existing.order.status.is_terminal() {
            tracing::info!(
                order_id = %callback.order_id,
                status = %existing.order.status,
                "payment callback redelivered for settled order; no-op"
            );
            return Ok(CallbackResult {
                order: existing.order,
                disposition: CallbackDisposition::AlreadySettled,
                issuance: IssuanceReport::default(),
            });
        }

        let (target, transaction_id, payment_method) = match callback.outcome {
            PaymentOutcome::Success => (
                OrderStatus::Paid,
                Some(
                    callback
                        .transaction_id
                        .unwrap_or_else(|| Uuid::now_v7().to_string()),
                ),
                callback.payment_method,
            ),
            PaymentOutcome::Failure => (OrderStatus::Cancelled, None, None),
        };

        let transition = StatusTransition {
            from: OrderStatus::Pending,
            to: target,
            transaction_id,
            payment_method,
        };

        match self
            .orders
            .transition_status(callback.order_id, transition)
            .await?
        {
            TransitionOutcome::Applied(order) => {
                if target != OrderStatus::Paid {
                    tracing::info!(order_id = %order.id, "order cancelled by payment failure");
                    return Ok(CallbackResult {
                        order,
                        disposition: CallbackDisposition::Applied,
                        issuance: IssuanceReport::default(),
                    });
                }

                let paid = OrderWithItems {
                    order,
                    items: existing.items,
                };
                let issuance = self.issuer.issue_for_order(&paid, now).await;
                if issuance.is_complete() {
                    tracing::info!(
                        order_id = %paid.order.id,
                        grants = issuance.issued.len(),
                        "order paid; entitlements issued"
                    );
                } else {
                    tracing::warn!(
                        order_id = %paid.order.id,
                        issued = issuance.issued.len(),
                        failed = issuance.failed.len(),
                        "order paid but issuance incomplete; retry the failed items"
                    );
                }

                Ok(CallbackResult {
                    order: paid.order,
                    disposition: CallbackDisposition::Applied,
                    issuance,
                })
            }
            TransitionOutcome::Superseded(order) => {
                tracing::info!(
                    order_id = %order.id,
                    status = %order.status,
                    "payment callback lost the status race; no-op"
                );
                Ok(CallbackResult {
                    order,
                    disposition: CallbackDisposition::AlreadySettled,
                    issuance: IssuanceReport::default(),
                })
            }
            TransitionOutcome::Missing => Err(DomainError::NotFound),
        }
    }
}
