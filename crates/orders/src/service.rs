//! Order creation and authorized reads.

use chrono::Utc;

use meshmart_auth::Principal;
use meshmart_catalog::ProductCatalog;
use meshmart_core::{DomainError, DomainResult, OrderId, ProductId, UserId};

use crate::order::{OrderStatus, OrderWithItems};
use crate::store::{NewOrder, NewOrderItem, OrderPage, OrderStore, PageRequest};

/// A requested line item. Prices are never accepted from the client; the
/// catalog is the sole price source. A quantity of N expands into N
/// independent order items (each later yields its own download grant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Creates orders from catalog lookups and serves ownership-checked reads.
pub struct OrderService<S, C> {
    store: S,
    catalog: C,
}

impl<S, C> OrderService<S, C>
where
    S: OrderStore,
    C: ProductCatalog,
{
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Create a `pending` order for `user_id`.
    ///
    /// Every product is resolved through the catalog for its authoritative
    /// current price; the total is the sum of resolved prices. The order and
    /// its items are persisted as one atomic unit.
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: &[OrderItemRequest],
    ) -> DomainResult<OrderWithItems> {
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        let mut new_items = Vec::new();
        for request in items {
            let quantity = request.quantity.unwrap_or(1);
            if quantity == 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }

            let product = self
                .catalog
                .get_by_id(request.product_id)
                .await?
                .ok_or(DomainError::NotFound)?;

            for _ in 0..quantity {
                new_items.push(NewOrderItem {
                    product_id: product.id,
                    price: product.price,
                });
            }
        }

        let total_amount = new_items.iter().map(|i| i.price).sum();
        let created = self
            .store
            .insert_order(NewOrder {
                user_id,
                total_amount,
                created_at: Utc::now(),
                items: new_items,
            })
            .await?;

        Ok(created)
    }

    /// Fetch one order. Owners and admins only.
    pub async fn get_order(
        &self,
        principal: &Principal,
        id: OrderId,
    ) -> DomainResult<OrderWithItems> {
        let order = self.store.get_order(id).await?.ok_or(DomainError::NotFound)?;

        if !principal.can_read_resource_of(order.order.user_id) {
            return Err(DomainError::Unauthorized);
        }

        Ok(order)
    }

    /// All of a user's own orders, newest first (snapshot at call time).
    pub async fn list_user_orders(&self, user_id: UserId) -> DomainResult<Vec<OrderWithItems>> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// Administrative listing across all users, newest first.
    pub async fn list_all_orders(
        &self,
        request: PageRequest,
        status: Option<OrderStatus>,
    ) -> DomainResult<OrderPage> {
        Ok(self.store.list_page(request, status).await?)
    }
}
