//! Test doubles for the download store.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meshmart_core::{GrantId, ProductId, StoreError, UserId};

use crate::grant::{DownloadGrant, NewGrant};
use crate::store::{DownloadStore, RedeemOutcome};
use crate::token::EntitlementToken;

/// Mutex-guarded grant store with the same semantics the real adapters
/// implement, plus a per-product failure switch for exercising partial
/// issuance.
#[derive(Default)]
pub(crate) struct MemoryDownloadStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    grants: Vec<DownloadGrant>,
    next_id: i64,
    failing_products: Vec<ProductId>,
}

impl MemoryDownloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inserts for this product fail with a retryable error.
    pub fn fail_inserts_for(&self, product_id: ProductId) {
        self.state.lock().unwrap().failing_products.push(product_id);
    }
}

#[async_trait]
impl DownloadStore for MemoryDownloadStore {
    async fn insert_grant(&self, grant: NewGrant) -> Result<DownloadGrant, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_products.contains(&grant.product_id) {
            return Err(StoreError::unavailable("injected failure"));
        }
        if state.grants.iter().any(|g| g.token == grant.token) {
            return Err(StoreError::constraint("duplicate token"));
        }

        state.next_id += 1;
        let stored = DownloadGrant {
            id: GrantId::new(state.next_id),
            user_id: grant.user_id,
            product_id: grant.product_id,
            token: grant.token,
            expires_at: grant.expires_at,
            download_count: 0,
            created_at: grant.created_at,
        };
        state.grants.push(stored.clone());
        Ok(stored)
    }

    async fn find_active(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<DownloadGrant>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .grants
            .iter()
            .filter(|g| g.user_id == user_id && g.product_id == product_id && !g.is_expired(now))
            .max_by_key(|g| (g.created_at, g.id))
            .cloned())
    }

    async fn redeem(
        &self,
        token: &EntitlementToken,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(grant) = state.grants.iter_mut().find(|g| &g.token == token) else {
            return Ok(RedeemOutcome::UnknownToken);
        };
        if grant.is_expired(now) {
            return Ok(RedeemOutcome::Expired(grant.clone()));
        }
        grant.download_count += 1;
        Ok(RedeemOutcome::Redeemed(grant.clone()))
    }
}
