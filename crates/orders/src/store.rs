//! Order persistence abstraction.
//!
//! Implementations must uphold two atomicity guarantees:
//!
//! - `insert_order` persists the order and all of its items as one unit; a
//!   concurrent reader never observes a partial item set.
//! - `transition_status` is a compare-and-set on the current status: of two
//!   racing callers, exactly one receives `Applied`, the other `Superseded`
//!   with the winner's terminal row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meshmart_core::{OrderId, ProductId, StoreError, UserId};

use crate::order::{Order, OrderStatus, OrderWithItems};

/// An order ready to be persisted (no ids assigned yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub price: i64,
}

/// Requested compare-and-set on an order's status.
///
/// `transaction_id` / `payment_method` are written only when the transition
/// applies; a superseded caller must not clobber the winner's audit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

/// Result of a [`StatusTransition`] attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The caller won the compare-and-set; the returned order carries the
    /// new status.
    Applied(Order),
    /// Another caller already moved the order; the returned order is the
    /// current (terminal) row, untouched by this attempt.
    Superseded(Order),
    /// No order with that id exists.
    Missing,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A normalized page request. Out-of-range values clamp rather than error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of orders plus the pagination metadata clients echo back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub items: Vec<OrderWithItems>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl OrderPage {
    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size))
    }
}

/// Persists orders and their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order with all of its items atomically, assigning ids.
    async fn insert_order(&self, new_order: NewOrder) -> Result<OrderWithItems, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError>;

    /// All orders belonging to `user_id`, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StoreError>;

    /// One page of all orders (admin view), newest first, optionally
    /// filtered by status.
    async fn list_page(
        &self,
        request: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, StoreError>;

    /// Compare-and-set the order's status. See [`TransitionOutcome`].
    async fn transition_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome, StoreError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn insert_order(&self, new_order: NewOrder) -> Result<OrderWithItems, StoreError> {
        (**self).insert_order(new_order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError> {
        (**self).get_order(id).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StoreError> {
        (**self).list_for_user(user_id).await
    }

    async fn list_page(
        &self,
        request: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, StoreError> {
        (**self).list_page(request, status).await
    }

    async fn transition_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        (**self).transition_status(id, transition).await
    }
}
