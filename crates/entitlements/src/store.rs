//! Download grant persistence abstraction.
//!
//! The redemption counter is the one hot spot: `redeem` must perform the
//! expiry check and the increment as a single atomic read-modify-write. A
//! read-then-write-back sequence loses updates under concurrent redemption
//! of the same token and is exactly the defect this contract exists to
//! rule out.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meshmart_core::{ProductId, StoreError, UserId};

use crate::grant::{DownloadGrant, NewGrant};
use crate::token::EntitlementToken;

/// Result of an atomic redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Counter incremented; the grant reflects the post-increment count.
    Redeemed(DownloadGrant),
    /// The token exists but its validity window has passed; nothing changed.
    Expired(DownloadGrant),
    /// No grant carries this token.
    UnknownToken,
}

/// Persists download grants.
#[async_trait]
pub trait DownloadStore: Send + Sync {
    /// Persist a grant with redemption counter 0, assigning an id.
    ///
    /// Implementations must enforce token uniqueness (constraint violation
    /// maps to [`StoreError::Constraint`]).
    async fn insert_grant(&self, grant: NewGrant) -> Result<DownloadGrant, StoreError>;

    /// The most recently issued grant for `(user_id, product_id)` that is
    /// still unexpired at `now`. Does not mutate anything.
    async fn find_active(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<DownloadGrant>, StoreError>;

    /// Atomically validate the token against `now` and increment its
    /// redemption counter. See [`RedeemOutcome`].
    async fn redeem(
        &self,
        token: &EntitlementToken,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, StoreError>;
}

#[async_trait]
impl<S> DownloadStore for Arc<S>
where
    S: DownloadStore + ?Sized,
{
    async fn insert_grant(&self, grant: NewGrant) -> Result<DownloadGrant, StoreError> {
        (**self).insert_grant(grant).await
    }

    async fn find_active(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<DownloadGrant>, StoreError> {
        (**self).find_active(user_id, product_id, now).await
    }

    async fn redeem(
        &self,
        token: &EntitlementToken,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, StoreError> {
        (**self).redeem(token, now).await
    }
}
