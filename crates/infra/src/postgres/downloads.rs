use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use meshmart_core::{GrantId, ProductId, StoreError, UserId};
use meshmart_entitlements::{
    DownloadGrant, DownloadStore, EntitlementToken, NewGrant, RedeemOutcome,
};

use super::map_sqlx_error;

const GRANT_COLUMNS: &str =
    "id, user_id, product_id, token, expires_at, download_count, created_at";

/// Postgres-backed download grant store.
///
/// The `token` column carries a unique index: generation never probes for
/// collisions, the constraint is a defense-in-depth backstop only.
#[derive(Debug, Clone)]
pub struct PostgresDownloadStore {
    pool: Arc<PgPool>,
}

impl PostgresDownloadStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl DownloadStore for PostgresDownloadStore {
    #[instrument(skip(self, grant), fields(user_id = %grant.user_id, product_id = %grant.product_id), err)]
    async fn insert_grant(&self, grant: NewGrant) -> Result<DownloadGrant, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO download_grants
                (user_id, product_id, token, expires_at, download_count, created_at)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING {GRANT_COLUMNS}
            "#
        ))
        .bind(grant.user_id.as_i64())
        .bind(grant.product_id.as_i64())
        .bind(grant.token.as_str())
        .bind(grant.expires_at)
        .bind(grant.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_grant", e))?;

        GrantRow::from_row(&row)
            .map_err(|e| StoreError::decode(format!("grant row: {e}")))
            .map(DownloadGrant::from)
    }

    #[instrument(skip(self), err)]
    async fn find_active(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<DownloadGrant>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM download_grants
            WHERE user_id = $1 AND product_id = $2 AND expires_at > $3
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active", e))?;

        row.map(|row| {
            GrantRow::from_row(&row)
                .map_err(|e| StoreError::decode(format!("grant row: {e}")))
                .map(DownloadGrant::from)
        })
        .transpose()
    }

    #[instrument(skip(self, token), err)]
    async fn redeem(
        &self,
        token: &EntitlementToken,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, StoreError> {
        // Single-statement read-modify-write: the expiry predicate and the
        // increment execute atomically at the row level, so concurrent
        // redemptions serialize in the database and no update is lost.
        let updated = sqlx::query(&format!(
            r#"
            UPDATE download_grants
            SET download_count = download_count + 1
            WHERE token = $1 AND expires_at > $2
            RETURNING {GRANT_COLUMNS}
            "#
        ))
        .bind(token.as_str())
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("redeem", e))?;

        if let Some(row) = updated {
            let grant = GrantRow::from_row(&row)
                .map_err(|e| StoreError::decode(format!("grant row: {e}")))
                .map(DownloadGrant::from)?;
            return Ok(RedeemOutcome::Redeemed(grant));
        }

        // Distinguish "no such token" from "expired" for the core; the
        // transport collapses them again at the boundary.
        let existing = sqlx::query(&format!(
            "SELECT {GRANT_COLUMNS} FROM download_grants WHERE token = $1"
        ))
        .bind(token.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("redeem_reload", e))?;

        match existing {
            Some(row) => {
                let grant = GrantRow::from_row(&row)
                    .map_err(|e| StoreError::decode(format!("grant row: {e}")))
                    .map(DownloadGrant::from)?;
                Ok(RedeemOutcome::Expired(grant))
            }
            None => Ok(RedeemOutcome::UnknownToken),
        }
    }
}

// SQLx row types

#[derive(Debug)]
struct GrantRow {
    id: i64,
    user_id: i64,
    product_id: i64,
    token: String,
    expires_at: DateTime<Utc>,
    download_count: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for GrantRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(GrantRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            token: row.try_get("token")?,
            expires_at: row.try_get("expires_at")?,
            download_count: row.try_get("download_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<GrantRow> for DownloadGrant {
    fn from(row: GrantRow) -> Self {
        DownloadGrant {
            id: GrantId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            token: EntitlementToken::from_presented(row.token),
            expires_at: row.expires_at,
            download_count: row.download_count,
            created_at: row.created_at,
        }
    }
}
