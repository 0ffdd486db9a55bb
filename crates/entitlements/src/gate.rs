//! Token validation and redemption.

use chrono::{DateTime, Utc};
use serde::Serialize;

use meshmart_catalog::ProductCatalog;
use meshmart_core::{DomainError, DomainResult, ProductId, UserId};

use crate::store::{DownloadStore, RedeemOutcome};
use crate::token::EntitlementToken;

/// "Do I still have access" answer: the newest unexpired grant for a
/// (user, product) pair plus the target it unlocks. Produced without
/// consuming a redemption.
#[derive(Debug, Clone, Serialize)]
pub struct AccessGrant {
    pub redemption_target: String,
    pub token: EntitlementToken,
    pub expires_at: DateTime<Utc>,
}

/// A successful redemption.
#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub redemption_target: String,
    pub download_count: i64,
}

/// Validates presented tokens and accounts for their use.
pub struct DownloadGate<D, C> {
    store: D,
    catalog: C,
}

impl<D, C> DownloadGate<D, C>
where
    D: DownloadStore,
    C: ProductCatalog,
{
    pub fn new(store: D, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Look up the most recently issued, still-unexpired grant for the pair.
    ///
    /// Read-only: used before showing a download button. `NotFound` covers
    /// both "never purchased" and "all grants expired".
    pub async fn resolve_for_user(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> DomainResult<AccessGrant> {
        let grant = self
            .store
            .find_active(user_id, product_id, now)
            .await?
            .ok_or(DomainError::NotFound)?;

        let target = self.lookup_target(grant.product_id).await?;
        Ok(AccessGrant {
            redemption_target: target,
            token: grant.token,
            expires_at: grant.expires_at,
        })
    }

    /// Redeem a presented token: validate, atomically count the use, and
    /// return the redemption target.
    ///
    /// The core distinguishes `NotFound` from `Expired`; the transport layer
    /// is expected to collapse them into one signal on the token endpoint.
    pub async fn redeem(
        &self,
        token: &EntitlementToken,
        now: DateTime<Utc>,
    ) -> DomainResult<Redemption> {
        let grant = match self.store.redeem(token, now).await? {
            RedeemOutcome::Redeemed(grant) => grant,
            RedeemOutcome::Expired(_) => return Err(DomainError::Expired),
            RedeemOutcome::UnknownToken => return Err(DomainError::NotFound),
        };

        let target = self.lookup_target(grant.product_id).await?;
        Ok(Redemption {
            redemption_target: target,
            download_count: grant.download_count,
        })
    }

    async fn lookup_target(&self, product_id: ProductId) -> DomainResult<String> {
        match self.catalog.get_by_id(product_id).await? {
            Some(product) => Ok(product.download_target),
            None => {
                // Grants outlive everything else; a missing catalog row means
                // catalog data loss, not a client mistake.
                tracing::error!(%product_id, "grant references product missing from catalog");
                Err(DomainError::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use meshmart_catalog::{CatalogProduct, InMemoryCatalog};

    use crate::grant::NewGrant;
    use crate::testing::MemoryDownloadStore;

    fn catalog() -> Arc<InMemoryCatalog> {
        let catalog = InMemoryCatalog::new();
        catalog.insert(CatalogProduct {
            id: ProductId::new(7),
            price: 4999,
            download_target: "https://cdn.example.com/assets/7.zip".to_string(),
        });
        Arc::new(catalog)
    }

    fn gate(
        store: Arc<MemoryDownloadStore>,
    ) -> DownloadGate<Arc<MemoryDownloadStore>, Arc<InMemoryCatalog>> {
        DownloadGate::new(store, catalog())
    }

    async fn seed_grant(
        store: &MemoryDownloadStore,
        product_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> EntitlementToken {
        let token = EntitlementToken::generate();
        store
            .insert_grant(NewGrant {
                user_id: UserId::new(1),
                product_id: ProductId::new(product_id),
                token: token.clone(),
                expires_at,
                created_at,
            })
            .await
            .unwrap();
        token
    }

    #[tokio::test]
    async fn resolve_returns_newest_unexpired_grant() {
        let store = Arc::new(MemoryDownloadStore::new());
        let now = Utc::now();

        let _old = seed_grant(&store, 7, now - Duration::days(3), now + Duration::days(4)).await;
        let newest = seed_grant(&store, 7, now - Duration::days(1), now + Duration::days(6)).await;
        let _expired = seed_grant(&store, 7, now - Duration::days(9), now - Duration::days(2)).await;

        let access = gate(store)
            .resolve_for_user(UserId::new(1), ProductId::new(7), now)
            .await
            .unwrap();

        assert_eq!(access.token, newest);
        assert_eq!(
            access.redemption_target,
            "https://cdn.example.com/assets/7.zip"
        );
    }

    #[tokio::test]
    async fn resolve_reports_not_found_when_all_grants_expired() {
        let store = Arc::new(MemoryDownloadStore::new());
        let now = Utc::now();
        seed_grant(&store, 7, now - Duration::days(9), now - Duration::days(2)).await;

        let err = gate(store)
            .resolve_for_user(UserId::new(1), ProductId::new(7), now)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[tokio::test]
    async fn redeem_counts_uses_and_returns_the_target() {
        let store = Arc::new(MemoryDownloadStore::new());
        let now = Utc::now();
        let token = seed_grant(&store, 7, now, now + Duration::days(7)).await;
        let gate = gate(store);

        let first = gate.redeem(&token, now).await.unwrap();
        assert_eq!(first.download_count, 1);
        assert_eq!(first.redemption_target, "https://cdn.example.com/assets/7.zip");

        let second = gate.redeem(&token, now).await.unwrap();
        assert_eq!(second.download_count, 2);
    }

    #[tokio::test]
    async fn redeem_distinguishes_expired_from_unknown() {
        let store = Arc::new(MemoryDownloadStore::new());
        let now = Utc::now();
        let token = seed_grant(&store, 7, now - Duration::days(8), now - Duration::days(1)).await;
        let gate = gate(store);

        assert_eq!(gate.redeem(&token, now).await.unwrap_err(), DomainError::Expired);
        assert_eq!(
            gate.redeem(&EntitlementToken::generate(), now)
                .await
                .unwrap_err(),
            DomainError::NotFound
        );
    }

    #[tokio::test]
    async fn redeem_succeeds_until_the_expiry_instant() {
        let store = Arc::new(MemoryDownloadStore::new());
        let now = Utc::now();
        let expires_at = now + Duration::days(7);
        let token = seed_grant(&store, 7, now, expires_at).await;
        let gate = gate(store);

        assert!(gate.redeem(&token, expires_at - Duration::seconds(1)).await.is_ok());
        assert_eq!(
            gate.redeem(&token, expires_at).await.unwrap_err(),
            DomainError::Expired
        );
    }
}
