//! `meshmart-infra` — store adapters.
//!
//! Two implementations per store contract:
//!
//! - [`in_memory`]: mutex-guarded maps for tests and dev wiring. The single
//!   lock per store is what makes order+items insertion, the status
//!   compare-and-set, and the redemption increment atomic.
//! - [`postgres`]: sqlx-backed persistence. Atomicity comes from
//!   transactions and single-statement row updates; see `schema.sql` at the
//!   crate root for the expected tables.

pub mod in_memory;
pub mod postgres;

#[cfg(test)]
mod integration_tests;

pub use in_memory::{InMemoryDownloadStore, InMemoryOrderStore};
pub use postgres::{PostgresDownloadStore, PostgresOrderStore, PostgresProductCatalog};
