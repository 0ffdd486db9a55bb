//! Postgres-backed store implementations.
//!
//! Atomicity strategy:
//!
//! - Order creation inserts the order row and every item row inside one
//!   transaction, so readers never observe a partial item set.
//! - The status transition is a single `UPDATE ... WHERE status = 'pending'`;
//!   the row filter is the compare-and-set, no explicit locking.
//! - The redemption counter is incremented with
//!   `SET download_count = download_count + 1 ... RETURNING`, a single
//!   read-modify-write at the row level.
//!
//! ## Error Mapping
//!
//! | SQLx error                         | StoreError      |
//! |------------------------------------|-----------------|
//! | Database, code `23505` / `23514`   | `Constraint`    |
//! | Database, other codes              | `Unavailable`   |
//! | `PoolTimedOut` / `PoolClosed` / IO | `Unavailable`   |
//! | Row/column decode failures         | `Decode`        |
//!
//! The expected schema lives in `schema.sql` at the crate root.

pub mod catalog;
pub mod downloads;
pub mod orders;

pub use catalog::PostgresProductCatalog;
pub use downloads::PostgresDownloadStore;
pub use orders::PostgresOrderStore;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use meshmart_core::StoreError;

/// Connect a bounded pool.
///
/// Acquire/connect timeouts keep store access from hanging: a saturated or
/// unreachable database surfaces as a retryable `Unavailable` instead of a
/// stuck request.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Map SQLx errors into the store error taxonomy.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation / check constraint violation.
                Some("23505") | Some("23514") => StoreError::constraint(msg),
                _ => StoreError::unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::TypeNotFound { .. } => {
            StoreError::decode(format!("decode error in {operation}: {err}"))
        }
        other => StoreError::unavailable(format!("sqlx error in {operation}: {other}")),
    }
}
