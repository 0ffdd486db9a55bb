//! Grant issuance for paid orders.

use chrono::{DateTime, Duration, Utc};

use meshmart_core::{OrderItemId, ProductId, StoreError, UserId};
use meshmart_orders::{OrderItem, OrderWithItems};

use crate::grant::{DownloadGrant, NewGrant};
use crate::store::DownloadStore;
use crate::token::EntitlementToken;

/// How long a grant stays redeemable, unless overridden at construction.
pub const DEFAULT_GRANT_TTL_DAYS: i64 = 7;

/// One issuance attempt that could not be persisted.
///
/// Carries enough context for a retry scoped to exactly this item, without
/// re-granting items that already succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedIssuance {
    pub item_id: OrderItemId,
    pub product_id: ProductId,
    pub error: StoreError,
}

/// Outcome of issuing grants for a set of order items.
#[derive(Debug, Clone, Default)]
pub struct IssuanceReport {
    pub issued: Vec<DownloadGrant>,
    pub failed: Vec<FailedIssuance>,
}

impl IssuanceReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Converts a paid order's line items into download grants, one per item.
///
/// There are no business-rule rejections here: once an order is confirmed
/// paid, the only failure mode is storage unavailability, reported per item.
pub struct EntitlementIssuer<D> {
    store: D,
    ttl: Duration,
}

impl<D> EntitlementIssuer<D>
where
    D: DownloadStore,
{
    pub fn new(store: D) -> Self {
        Self {
            store,
            ttl: Duration::days(DEFAULT_GRANT_TTL_DAYS),
        }
    }

    pub fn with_ttl(store: D, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Issue one grant per order item for the order's owner.
    pub async fn issue_for_order(&self, order: &OrderWithItems, now: DateTime<Utc>) -> IssuanceReport {
        self.issue_for_items(order.order.user_id, &order.items, now)
            .await
    }

    /// Issue grants for an explicit item subset (the scoped-retry path).
    pub async fn issue_for_items(
        &self,
        user_id: UserId,
        items: &[OrderItem],
        now: DateTime<Utc>,
    ) -> IssuanceReport {
        let mut report = IssuanceReport::default();

        for item in items {
            let grant = NewGrant {
                user_id,
                product_id: item.product_id,
                token: EntitlementToken::generate(),
                expires_at: now + self.ttl,
                created_at: now,
            };

            match self.store.insert_grant(grant).await {
                Ok(stored) => {
                    tracing::debug!(
                        grant_id = %stored.id,
                        user_id = %user_id,
                        product_id = %item.product_id,
                        "issued download grant"
                    );
                    report.issued.push(stored);
                }
                Err(error) => {
                    tracing::warn!(
                        item_id = %item.id,
                        product_id = %item.product_id,
                        %error,
                        "grant issuance failed for order item"
                    );
                    report.failed.push(FailedIssuance {
                        item_id: item.id,
                        product_id: item.product_id,
                        error,
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use meshmart_core::OrderItemId;

    use crate::testing::MemoryDownloadStore;

    fn items(product_ids: &[i64]) -> Vec<OrderItem> {
        product_ids
            .iter()
            .enumerate()
            .map(|(idx, pid)| OrderItem {
                id: OrderItemId::new(idx as i64 + 1),
                order_id: meshmart_core::OrderId::new(1),
                product_id: ProductId::new(*pid),
                price: 1000,
            })
            .collect()
    }

    #[tokio::test]
    async fn issues_one_grant_per_item_with_seven_day_expiry() {
        let store = Arc::new(MemoryDownloadStore::new());
        let issuer = EntitlementIssuer::new(store.clone());
        let now = Utc::now();

        let report = issuer
            .issue_for_items(UserId::new(1), &items(&[7, 8]), now)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.issued.len(), 2);
        for grant in &report.issued {
            assert_eq!(grant.download_count, 0);
            assert_eq!(grant.expires_at, now + Duration::days(7));
        }
    }

    #[tokio::test]
    async fn repeat_issuance_creates_independent_grants() {
        let store = Arc::new(MemoryDownloadStore::new());
        let issuer = EntitlementIssuer::new(store.clone());
        let now = Utc::now();
        let line = items(&[7]);

        let first = issuer.issue_for_items(UserId::new(1), &line, now).await;
        let second = issuer.issue_for_items(UserId::new(1), &line, now).await;

        // No deduplication: each purchase yields its own valid grant.
        assert_ne!(
            first.issued[0].token.as_str(),
            second.issued[0].token.as_str()
        );
        assert_ne!(first.issued[0].id, second.issued[0].id);
    }

    #[tokio::test]
    async fn storage_failures_are_reported_per_item() {
        let store = Arc::new(MemoryDownloadStore::new());
        store.fail_inserts_for(ProductId::new(8));
        let issuer = EntitlementIssuer::new(store.clone());
        let now = Utc::now();

        let report = issuer
            .issue_for_items(UserId::new(1), &items(&[7, 8, 9]), now)
            .await;

        assert_eq!(report.issued.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].product_id, ProductId::new(8));
        assert!(report.failed[0].error.is_retryable());
    }
}
