use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meshmart_core::{GrantId, ProductId, StoreError, UserId};
use meshmart_entitlements::{
    DownloadGrant, DownloadStore, EntitlementToken, NewGrant, RedeemOutcome,
};

#[derive(Debug, Default)]
struct DownloadsState {
    grants: HashMap<GrantId, DownloadGrant>,
    by_token: HashMap<String, GrantId>,
    next_id: i64,
}

/// In-memory download grant store.
///
/// The single mutex makes `redeem` a true read-modify-write: the expiry
/// check and the counter increment happen in one critical section, so
/// concurrent redemptions of the same token cannot lose updates.
#[derive(Debug, Default)]
pub struct InMemoryDownloadStore {
    state: Mutex<DownloadsState>,
}

impl InMemoryDownloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DownloadsState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::unavailable("download store lock poisoned"))
    }
}

#[async_trait]
impl DownloadStore for InMemoryDownloadStore {
    async fn insert_grant(&self, grant: NewGrant) -> Result<DownloadGrant, StoreError> {
        let mut state = self.lock()?;

        if state.by_token.contains_key(grant.token.as_str()) {
            return Err(StoreError::constraint("duplicate grant token"));
        }

        state.next_id += 1;
        let id = GrantId::new(state.next_id);
        let stored = DownloadGrant {
            id,
            user_id: grant.user_id,
            product_id: grant.product_id,
            token: grant.token,
            expires_at: grant.expires_at,
            download_count: 0,
            created_at: grant.created_at,
        };

        state
            .by_token
            .insert(stored.token.as_str().to_string(), id);
        state.grants.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_active(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<DownloadGrant>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .grants
            .values()
            .filter(|g| g.user_id == user_id && g.product_id == product_id && !g.is_expired(now))
            .max_by_key(|g| (g.created_at, g.id))
            .cloned())
    }

    async fn redeem(
        &self,
        token: &EntitlementToken,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, StoreError> {
        let mut state = self.lock()?;

        let Some(id) = state.by_token.get(token.as_str()).copied() else {
            return Ok(RedeemOutcome::UnknownToken);
        };
        let grant = state
            .grants
            .get_mut(&id)
            .ok_or_else(|| StoreError::decode("token index points at missing grant"))?;

        if grant.is_expired(now) {
            return Ok(RedeemOutcome::Expired(grant.clone()));
        }

        grant.download_count += 1;
        Ok(RedeemOutcome::Redeemed(grant.clone()))
    }
}
