use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meshmart_core::{OrderId, OrderItemId, ProductId, UserId};

/// Order status lifecycle.
///
/// Transitions are one-directional: `pending -> paid` or
/// `pending -> cancelled`. Both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted order.
///
/// `total_amount` is in the smallest currency unit (e.g. cents) and equals
/// the sum of item prices captured at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted order line item.
///
/// `price` is the catalog price snapshot taken when the order was created;
/// later catalog price changes do not affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub price: i64,
}

/// An order together with its line items (how reads return orders).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    pub fn items_total(&self) -> i64 {
        self.items.iter().map(|i| i.price).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_transitions_to_both_terminal_states() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn terminal_states_never_transition() {
        for terminal in [OrderStatus::Paid, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn pending_never_transitions_to_itself() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = OrderStatus> {
            prop_oneof![
                Just(OrderStatus::Pending),
                Just(OrderStatus::Paid),
                Just(OrderStatus::Cancelled),
            ]
        }

        proptest! {
            /// Property: every permitted transition leaves `pending` and
            /// lands on a terminal state; there is no path back.
            #[test]
            fn transitions_only_leave_pending_for_terminal(
                from in any_status(),
                to in any_status()
            ) {
                if from.can_transition_to(to) {
                    prop_assert_eq!(from, OrderStatus::Pending);
                    prop_assert!(to.is_terminal());
                }
            }

            /// Property: any sequence of attempted transitions settles after
            /// at most one applied step (subsequence of pending -> terminal).
            #[test]
            fn status_settles_after_one_applied_transition(
                attempts in proptest::collection::vec(any_status(), 0..10)
            ) {
                let mut current = OrderStatus::Pending;
                let mut applied = 0usize;
                for next in attempts {
                    if current.can_transition_to(next) {
                        current = next;
                        applied += 1;
                    }
                }
                prop_assert!(applied <= 1);
                if applied == 1 {
                    prop_assert!(current.is_terminal());
                }
            }
        }
    }
}
