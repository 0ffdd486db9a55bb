use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use meshmart_core::{OrderId, OrderItemId, ProductId, StoreError, UserId};
use meshmart_orders::{
    NewOrder, Order, OrderItem, OrderPage, OrderStatus, OrderStore, OrderWithItems, PageRequest,
    StatusTransition, TransitionOutcome,
};

use super::map_sqlx_error;

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, transaction_id, payment_method, created_at";

/// Postgres-backed order store.
///
/// Thread-safe via the SQLx connection pool; every multi-row write runs in
/// a transaction.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: Arc<PgPool>,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn load_items(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_items", e))?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item_row = OrderItemRow::from_row(&row)
                .map_err(|e| StoreError::decode(format!("order item row: {e}")))?;
            let item = OrderItem::from(item_row);
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn attach_items(
        &self,
        orders: Vec<Order>,
    ) -> Result<Vec<OrderWithItems>, StoreError> {
        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let mut grouped = self.load_items(&ids).await?;
        Ok(orders
            .into_iter()
            .map(|order| {
                let items = grouped.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip(self, new_order), fields(user_id = %new_order.user_id, item_count = new_order.items.len()), err)]
    async fn insert_order(&self, new_order: NewOrder) -> Result<OrderWithItems, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let order_row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (user_id, total_amount, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(new_order.user_id.as_i64())
        .bind(new_order.total_amount)
        .bind(OrderStatus::Pending.as_str())
        .bind(new_order.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        let order: Order = OrderRow::from_row(&order_row)
            .map_err(|e| StoreError::decode(format!("order row: {e}")))?
            .try_into()?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for item in &new_order.items {
            let item_id: i64 = sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, price)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(order.id.as_i64())
            .bind(item.product_id.as_i64())
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?
            .try_get("id")
            .map_err(|e| StoreError::decode(format!("order item id: {e}")))?;

            items.push(OrderItem {
                id: OrderItemId::new(item_id),
                order_id: order.id,
                product_id: item.product_id,
                price: item.price,
            });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(OrderWithItems { order, items })
    }

    #[instrument(skip(self), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order: Order = OrderRow::from_row(&row)
            .map_err(|e| StoreError::decode(format!("order row: {e}")))?
            .try_into()?;

        let mut with_items = self.attach_items(vec![order]).await?;
        Ok(with_items.pop())
    }

    #[instrument(skip(self), err)]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id.as_i64())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_for_user", e))?;

        let orders = decode_orders(rows)?;
        self.attach_items(orders).await
    }

    #[instrument(skip(self), fields(page = request.page(), page_size = request.page_size()), err)]
    async fn list_page(
        &self,
        request: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, StoreError> {
        let status_param: Option<&str> = status.map(|s| s.as_str());

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            "#,
        )
        .bind(status_param)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_orders", e))?
        .try_get("total")
        .map_err(|e| StoreError::decode(format!("order count: {e}")))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status_param)
        .bind(i64::from(request.page_size()))
        .bind(request.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_page", e))?;

        let orders = decode_orders(rows)?;
        let items = self.attach_items(orders).await?;

        Ok(OrderPage {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total: total as u64,
        })
    }

    #[instrument(skip(self, transition), fields(to = %transition.to), err)]
    async fn transition_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        // The status filter is the compare-and-set: the update applies only
        // if this caller still observes the expected current status.
        let updated = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $1,
                transaction_id = COALESCE($2, transaction_id),
                payment_method = COALESCE($3, payment_method)
            WHERE id = $4 AND status = $5
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(transition.to.as_str())
        .bind(transition.transaction_id.as_deref())
        .bind(transition.payment_method.as_deref())
        .bind(id.as_i64())
        .bind(transition.from.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transition_status", e))?;

        if let Some(row) = updated {
            let order: Order = OrderRow::from_row(&row)
                .map_err(|e| StoreError::decode(format!("order row: {e}")))?
                .try_into()?;
            return Ok(TransitionOutcome::Applied(order));
        }

        // Lost the race (or the order never existed); report what is there.
        let current = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transition_status_reload", e))?;

        match current {
            Some(row) => {
                let order: Order = OrderRow::from_row(&row)
                    .map_err(|e| StoreError::decode(format!("order row: {e}")))?
                    .try_into()?;
                Ok(TransitionOutcome::Superseded(order))
            }
            None => Ok(TransitionOutcome::Missing),
        }
    }
}

fn decode_orders(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Order>, StoreError> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let order: Order = OrderRow::from_row(&row)
            .map_err(|e| StoreError::decode(format!("order row: {e}")))?
            .try_into()?;
        orders.push(order);
    }
    Ok(orders)
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    id: i64,
    user_id: i64,
    total_amount: i64,
    status: String,
    transaction_id: Option<String>,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            transaction_id: row.try_get("transaction_id")?,
            payment_method: row.try_get("payment_method")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::decode(e))?;
        Ok(Order {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            total_amount: row.total_amount,
            status,
            transaction_id: row.transaction_id,
            payment_method: row.payment_method,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    price: i64,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for OrderItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderItemRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            price: row.try_get("price")?,
        })
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            price: row.price,
        }
    }
}
