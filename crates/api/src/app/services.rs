//! Service wiring: stores constructed once at process start and passed by
//! reference into the domain services. No ambient global state.

use std::sync::Arc;

use chrono::Utc;

use meshmart_auth::Principal;
use meshmart_catalog::{CatalogProduct, InMemoryCatalog};
use meshmart_core::{DomainResult, OrderId, ProductId, UserId};
use meshmart_entitlements::{
    AccessGrant, DownloadGate, EntitlementIssuer, EntitlementToken, Redemption,
};
use meshmart_infra::in_memory::{InMemoryDownloadStore, InMemoryOrderStore};
use meshmart_orders::{OrderItemRequest, OrderPage, OrderService, OrderStatus, OrderWithItems, PageRequest};
use meshmart_payments::{CallbackResult, PaymentCallback, PaymentProcessor};

#[cfg(feature = "postgres")]
use meshmart_infra::postgres::{
    PostgresDownloadStore, PostgresOrderStore, PostgresProductCatalog,
};

type MemoryOrders = OrderService<Arc<InMemoryOrderStore>, Arc<InMemoryCatalog>>;
type MemoryPayments = PaymentProcessor<Arc<InMemoryOrderStore>, Arc<InMemoryDownloadStore>>;
type MemoryGate = DownloadGate<Arc<InMemoryDownloadStore>, Arc<InMemoryCatalog>>;

#[cfg(feature = "postgres")]
type PgOrders = OrderService<Arc<PostgresOrderStore>, Arc<PostgresProductCatalog>>;
#[cfg(feature = "postgres")]
type PgPayments = PaymentProcessor<Arc<PostgresOrderStore>, Arc<PostgresDownloadStore>>;
#[cfg(feature = "postgres")]
type PgGate = DownloadGate<Arc<PostgresDownloadStore>, Arc<PostgresProductCatalog>>;

pub enum AppServices {
    InMemory {
        orders: MemoryOrders,
        payments: MemoryPayments,
        gate: MemoryGate,
    },
    #[cfg(feature = "postgres")]
    Persistent {
        orders: PgOrders,
        payments: PgPayments,
        gate: PgGate,
    },
}

/// Pick the backend at startup: Postgres when the `postgres` feature is
/// compiled in and `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services() -> AppServices {
    #[cfg(feature = "postgres")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = meshmart_infra::postgres::connect(&url)
            .await
            .expect("DATABASE_URL is set but the connection failed");
        tracing::info!("using postgres-backed stores");
        return build_postgres_services(pool);
    }

    tracing::info!("DATABASE_URL not set; using in-memory stores with a demo catalog");
    build_in_memory_services()
}

pub fn build_in_memory_services() -> AppServices {
    let order_store = Arc::new(InMemoryOrderStore::new());
    let download_store = Arc::new(InMemoryDownloadStore::new());

    let catalog = Arc::new(InMemoryCatalog::new());
    seed_demo_catalog(&catalog);

    AppServices::InMemory {
        orders: OrderService::new(order_store.clone(), catalog.clone()),
        payments: PaymentProcessor::new(
            order_store,
            EntitlementIssuer::new(download_store.clone()),
        ),
        gate: DownloadGate::new(download_store, catalog),
    }
}

#[cfg(feature = "postgres")]
pub fn build_postgres_services(pool: sqlx::PgPool) -> AppServices {
    let order_store = Arc::new(PostgresOrderStore::new(pool.clone()));
    let download_store = Arc::new(PostgresDownloadStore::new(pool.clone()));
    let catalog = Arc::new(PostgresProductCatalog::new(pool));

    AppServices::Persistent {
        orders: OrderService::new(order_store.clone(), catalog.clone()),
        payments: PaymentProcessor::new(
            order_store,
            EntitlementIssuer::new(download_store.clone()),
        ),
        gate: DownloadGate::new(download_store, catalog),
    }
}

/// The in-memory backend has no catalog-management tooling behind it, so
/// dev/test runs get a small fixed assortment.
fn seed_demo_catalog(catalog: &InMemoryCatalog) {
    let demo = [
        (1, 4999, "starter-mesh.zip"),
        (2, 12999, "city-pack.zip"),
        (3, 1500, "texture-set.zip"),
    ];
    for (id, price, file) in demo {
        catalog.insert(CatalogProduct {
            id: ProductId::new(id),
            price,
            download_target: format!("https://assets.meshmart.dev/{file}"),
        });
    }
}

impl AppServices {
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: &[OrderItemRequest],
    ) -> DomainResult<OrderWithItems> {
        match self {
            AppServices::InMemory { orders, .. } => orders.create_order(user_id, items).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { orders, .. } => orders.create_order(user_id, items).await,
        }
    }

    pub async fn get_order(
        &self,
        principal: &Principal,
        id: OrderId,
    ) -> DomainResult<OrderWithItems> {
        match self {
            AppServices::InMemory { orders, .. } => orders.get_order(principal, id).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { orders, .. } => orders.get_order(principal, id).await,
        }
    }

    pub async fn list_user_orders(&self, user_id: UserId) -> DomainResult<Vec<OrderWithItems>> {
        match self {
            AppServices::InMemory { orders, .. } => orders.list_user_orders(user_id).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { orders, .. } => orders.list_user_orders(user_id).await,
        }
    }

    pub async fn list_all_orders(
        &self,
        request: PageRequest,
        status: Option<OrderStatus>,
    ) -> DomainResult<OrderPage> {
        match self {
            AppServices::InMemory { orders, .. } => orders.list_all_orders(request, status).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { orders, .. } => orders.list_all_orders(request, status).await,
        }
    }

    pub async fn payment_callback(&self, callback: PaymentCallback) -> DomainResult<CallbackResult> {
        let now = Utc::now();
        match self {
            AppServices::InMemory { payments, .. } => payments.handle_callback(callback, now).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { payments, .. } => payments.handle_callback(callback, now).await,
        }
    }

    pub async fn resolve_access(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> DomainResult<AccessGrant> {
        let now = Utc::now();
        match self {
            AppServices::InMemory { gate, .. } => gate.resolve_for_user(user_id, product_id, now).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { gate, .. } => gate.resolve_for_user(user_id, product_id, now).await,
        }
    }

    pub async fn redeem(&self, token: &EntitlementToken) -> DomainResult<Redemption> {
        let now = Utc::now();
        match self {
            AppServices::InMemory { gate, .. } => gate.redeem(token, now).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { gate, .. } => gate.redeem(token, now).await,
        }
    }
}
