//! `meshmart-orders` — purchase orders and their lifecycle.
//!
//! An order is an audit record: created `pending` with a snapshot of the
//! catalog prices at purchase time, moved exactly once to `paid` or
//! `cancelled`, never deleted.

pub mod order;
pub mod service;
pub mod store;

pub use order::{Order, OrderItem, OrderStatus, OrderWithItems};
pub use service::{OrderItemRequest, OrderService};
pub use store::{
    NewOrder, NewOrderItem, OrderPage, OrderStore, PageRequest, StatusTransition,
    TransitionOutcome,
};
