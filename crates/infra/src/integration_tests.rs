//! End-to-end pipeline tests over the in-memory adapters:
//! order creation → payment callback → entitlement issuance → redemption.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use meshmart_auth::{Principal, Role};
use meshmart_catalog::{CatalogProduct, InMemoryCatalog};
use meshmart_core::{DomainError, OrderId, ProductId, UserId};
use meshmart_entitlements::{DownloadGate, DownloadStore, EntitlementIssuer};
use meshmart_orders::{OrderItemRequest, OrderService, OrderStatus, OrderWithItems, PageRequest};
use meshmart_payments::{CallbackDisposition, PaymentCallback, PaymentOutcome, PaymentProcessor};

use crate::in_memory::{InMemoryDownloadStore, InMemoryOrderStore};

type Orders = OrderService<Arc<InMemoryOrderStore>, Arc<InMemoryCatalog>>;
type Payments = PaymentProcessor<Arc<InMemoryOrderStore>, Arc<InMemoryDownloadStore>>;
type Gate = DownloadGate<Arc<InMemoryDownloadStore>, Arc<InMemoryCatalog>>;

struct Pipeline {
    downloads: Arc<InMemoryDownloadStore>,
    orders: Orders,
    payments: Arc<Payments>,
    gate: Arc<Gate>,
}

fn pipeline() -> Pipeline {
    let order_store = Arc::new(InMemoryOrderStore::new());
    let downloads = Arc::new(InMemoryDownloadStore::new());

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(CatalogProduct {
        id: ProductId::new(7),
        price: 4999,
        download_target: "https://cdn.example.com/assets/7.zip".to_string(),
    });
    catalog.insert(CatalogProduct {
        id: ProductId::new(8),
        price: 1500,
        download_target: "https://cdn.example.com/assets/8.zip".to_string(),
    });

    Pipeline {
        downloads: downloads.clone(),
        orders: OrderService::new(order_store.clone(), catalog.clone()),
        payments: Arc::new(PaymentProcessor::new(
            order_store,
            EntitlementIssuer::new(downloads.clone()),
        )),
        gate: Arc::new(DownloadGate::new(downloads, catalog)),
    }
}

fn success_callback(order_id: OrderId) -> PaymentCallback {
    PaymentCallback {
        order_id,
        outcome: PaymentOutcome::Success,
        transaction_id: Some("txn-gateway-1".to_string()),
        payment_method: Some("card".to_string()),
    }
}

async fn buy(p: &Pipeline, user: i64, products: &[i64]) -> OrderWithItems {
    let requests: Vec<OrderItemRequest> = products
        .iter()
        .map(|pid| OrderItemRequest {
            product_id: ProductId::new(*pid),
            quantity: None,
        })
        .collect();
    p.orders
        .create_order(UserId::new(user), &requests)
        .await
        .unwrap()
}

async fn pay(p: &Pipeline, order_id: OrderId, now: DateTime<Utc>) {
    let result = p
        .payments
        .handle_callback(success_callback(order_id), now)
        .await
        .unwrap();
    assert_eq!(result.disposition, CallbackDisposition::Applied);
    assert!(result.issuance.is_complete());
}

#[tokio::test]
async fn paid_order_yields_a_redeemable_grant() {
    let p = pipeline();
    let now = Utc::now();

    // Scenario A: pending order with the catalog-resolved total.
    let created = buy(&p, 1, &[7]).await;
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.order.total_amount, 4999);
    assert_eq!(created.items_total(), 4999);

    // Scenario B: payment success issues exactly one grant per item.
    pay(&p, created.order.id, now).await;
    let grant = p
        .downloads
        .find_active(UserId::new(1), ProductId::new(7), now)
        .await
        .unwrap()
        .expect("grant should exist after payment");
    assert_eq!(grant.download_count, 0);
    assert_eq!(grant.expires_at, now + Duration::days(7));

    // Scenario C: redemption before expiry returns the target and counts.
    let access = p
        .gate
        .resolve_for_user(UserId::new(1), ProductId::new(7), now)
        .await
        .unwrap();
    let redemption = p.gate.redeem(&access.token, now).await.unwrap();
    assert_eq!(
        redemption.redemption_target,
        "https://cdn.example.com/assets/7.zip"
    );
    assert_eq!(redemption.download_count, 1);
}

#[tokio::test]
async fn expired_grants_reject_redemption_but_are_retained() {
    let p = pipeline();
    let purchase_time = Utc::now() - Duration::days(8);
    let now = Utc::now();

    let created = buy(&p, 1, &[7]).await;
    pay(&p, created.order.id, purchase_time).await;

    let grant = p
        .downloads
        .find_active(UserId::new(1), ProductId::new(7), purchase_time)
        .await
        .unwrap()
        .unwrap();

    // Scenario D: the 7-day window has passed.
    assert_eq!(
        p.gate.redeem(&grant.token, now).await.unwrap_err(),
        DomainError::Expired
    );
    // The access check does not distinguish expired from never-purchased.
    assert_eq!(
        p.gate
            .resolve_for_user(UserId::new(1), ProductId::new(7), now)
            .await
            .unwrap_err(),
        DomainError::NotFound
    );
}

#[tokio::test]
async fn settled_orders_ignore_further_callbacks() {
    let p = pipeline();
    let now = Utc::now();

    let created = buy(&p, 1, &[7]).await;
    pay(&p, created.order.id, now).await;

    // Scenario E: a contradictory late delivery is a no-op.
    let late = p
        .payments
        .handle_callback(
            PaymentCallback {
                order_id: created.order.id,
                outcome: PaymentOutcome::Failure,
                transaction_id: None,
                payment_method: None,
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(late.disposition, CallbackDisposition::AlreadySettled);
    assert_eq!(late.order.status, OrderStatus::Paid);

    // Still exactly one grant, untouched.
    let grant = p
        .downloads
        .find_active(UserId::new(1), ProductId::new(7), now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.download_count, 0);
}

#[tokio::test]
async fn failed_payments_cancel_without_granting() {
    let p = pipeline();
    let now = Utc::now();

    let created = buy(&p, 1, &[7]).await;
    let result = p
        .payments
        .handle_callback(
            PaymentCallback {
                order_id: created.order.id,
                outcome: PaymentOutcome::Failure,
                transaction_id: None,
                payment_method: None,
            },
            now,
        )
        .await
        .unwrap();

    assert_eq!(result.order.status, OrderStatus::Cancelled);
    assert!(
        p.downloads
            .find_active(UserId::new(1), ProductId::new(7), now)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_redemptions_count_every_use() {
    let p = pipeline();
    let now = Utc::now();

    let created = buy(&p, 1, &[7]).await;
    pay(&p, created.order.id, now).await;
    let token = p
        .downloads
        .find_active(UserId::new(1), ProductId::new(7), now)
        .await
        .unwrap()
        .unwrap()
        .token;

    const REDEMPTIONS: usize = 32;
    let mut handles = Vec::new();
    for _ in 0..REDEMPTIONS {
        let gate = p.gate.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move { gate.redeem(&token, now).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let grant = p
        .downloads
        .find_active(UserId::new(1), ProductId::new(7), now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.download_count, REDEMPTIONS as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_callbacks_issue_exactly_one_pass() {
    let p = pipeline();
    let now = Utc::now();

    let created = buy(&p, 1, &[7, 8]).await;
    let order_id = created.order.id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let payments = p.payments.clone();
        handles.push(tokio::spawn(async move {
            payments.handle_callback(success_callback(order_id), now).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.order.status, OrderStatus::Paid);
        if result.disposition == CallbackDisposition::Applied {
            applied += 1;
        }
    }
    assert_eq!(applied, 1, "exactly one delivery must win the transition");

    // One issuance pass: one grant per item, not per delivery.
    for product in [7, 8] {
        let grant = p
            .downloads
            .find_active(UserId::new(1), ProductId::new(product), now)
            .await
            .unwrap()
            .expect("each item gets its grant");
        assert_eq!(grant.download_count, 0);
    }
}

#[tokio::test]
async fn admin_listing_paginates_and_filters() {
    let p = pipeline();
    let now = Utc::now();

    let first = buy(&p, 1, &[7]).await;
    buy(&p, 2, &[8]).await;
    buy(&p, 3, &[7, 8]).await;
    pay(&p, first.order.id, now).await;

    let all = p
        .orders
        .list_all_orders(PageRequest::new(1, 2), None)
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.items.len(), 2);
    assert_eq!(all.page_count(), 2);

    let paid = p
        .orders
        .list_all_orders(PageRequest::default(), Some(OrderStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid.total, 1);
    assert_eq!(paid.items[0].order.id, first.order.id);

    // Ownership checks hold through the full stack.
    let owner = Principal::new(UserId::new(1), Role::Customer);
    let admin = Principal::new(UserId::new(99), Role::Admin);
    let stranger = Principal::new(UserId::new(2), Role::Customer);
    assert!(p.orders.get_order(&owner, first.order.id).await.is_ok());
    assert!(p.orders.get_order(&admin, first.order.id).await.is_ok());
    assert_eq!(
        p.orders
            .get_order(&stranger, first.order.id)
            .await
            .unwrap_err(),
        DomainError::Unauthorized
    );
}
