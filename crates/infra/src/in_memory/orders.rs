use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use meshmart_core::{OrderId, OrderItemId, StoreError, UserId};
use meshmart_orders::{
    NewOrder, Order, OrderItem, OrderPage, OrderStatus, OrderStore, OrderWithItems, PageRequest,
    StatusTransition, TransitionOutcome,
};

#[derive(Debug, Default)]
struct OrdersState {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    next_order_id: i64,
    next_item_id: i64,
}

/// In-memory order store.
///
/// One mutex guards orders and items together, so an insert publishes the
/// order and its full item set in a single critical section and the status
/// compare-and-set cannot interleave with another transition.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: Mutex<OrdersState>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, OrdersState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::unavailable("order store lock poisoned"))
    }

    fn with_items(state: &OrdersState, order: &Order) -> OrderWithItems {
        OrderWithItems {
            order: order.clone(),
            items: state.items.get(&order.id).cloned().unwrap_or_default(),
        }
    }

    /// Newest first: creation time descending, id as the tiebreak.
    fn sort_newest_first(orders: &mut [&Order]) {
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, new_order: NewOrder) -> Result<OrderWithItems, StoreError> {
        let mut state = self.lock()?;

        state.next_order_id += 1;
        let order_id = OrderId::new(state.next_order_id);

        let order = Order {
            id: order_id,
            user_id: new_order.user_id,
            total_amount: new_order.total_amount,
            status: OrderStatus::Pending,
            transaction_id: None,
            payment_method: None,
            created_at: new_order.created_at,
        };

        let mut items = Vec::with_capacity(new_order.items.len());
        for item in new_order.items {
            state.next_item_id += 1;
            items.push(OrderItem {
                id: OrderItemId::new(state.next_item_id),
                order_id,
                product_id: item.product_id,
                price: item.price,
            });
        }

        state.orders.insert(order_id, order.clone());
        state.items.insert(order_id, items.clone());

        Ok(OrderWithItems { order, items })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .orders
            .get(&id)
            .map(|order| Self::with_items(&state, order)))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StoreError> {
        let state = self.lock()?;
        let mut matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .collect();
        Self::sort_newest_first(&mut matching);
        Ok(matching
            .into_iter()
            .map(|order| Self::with_items(&state, order))
            .collect())
    }

    async fn list_page(
        &self,
        request: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, StoreError> {
        let state = self.lock()?;
        let mut matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        let total = matching.len() as u64;
        Self::sort_newest_first(&mut matching);

        let items = matching
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size() as usize)
            .map(|order| Self::with_items(&state, order))
            .collect();

        Ok(OrderPage {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total,
        })
    }

    async fn transition_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut state = self.lock()?;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(TransitionOutcome::Missing);
        };

        if order.status != transition.from {
            return Ok(TransitionOutcome::Superseded(order.clone()));
        }

        order.status = transition.to;
        if transition.transaction_id.is_some() {
            order.transaction_id = transition.transaction_id;
        }
        if transition.payment_method.is_some() {
            order.payment_method = transition.payment_method;
        }
        Ok(TransitionOutcome::Applied(order.clone()))
    }
}
