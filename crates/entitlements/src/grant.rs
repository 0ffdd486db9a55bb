use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meshmart_core::{GrantId, ProductId, UserId};

use crate::token::EntitlementToken;

/// A persisted download grant.
///
/// Created once at payment success, never deleted. Past expiry it becomes
/// unusable but is retained for audit and abuse analysis; `download_count`
/// is the sole abuse-detection signal (no hard redemption limit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadGrant {
    pub id: GrantId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub token: EntitlementToken,
    pub expires_at: DateTime<Utc>,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

impl DownloadGrant {
    /// A grant is usable strictly before its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A grant ready to be persisted (no id assigned yet, count starts at 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrant {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub token: EntitlementToken,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
