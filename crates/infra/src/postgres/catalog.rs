use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use meshmart_catalog::{CatalogProduct, ProductCatalog};
use meshmart_core::{ProductId, StoreError};

use super::map_sqlx_error;

/// Postgres-backed read-only catalog lookup.
///
/// Reads the `products` table maintained by the catalog-management tooling;
/// this pipeline only consumes it.
#[derive(Debug, Clone)]
pub struct PostgresProductCatalog {
    pool: Arc<PgPool>,
}

impl PostgresProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl ProductCatalog for PostgresProductCatalog {
    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, price, download_url
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("catalog_get_by_id", e))?;

        row.map(|row| -> Result<CatalogProduct, StoreError> {
            Ok(CatalogProduct {
                id: ProductId::new(
                    row.try_get("id")
                        .map_err(|e| StoreError::decode(format!("product id: {e}")))?,
                ),
                price: row
                    .try_get("price")
                    .map_err(|e| StoreError::decode(format!("product price: {e}")))?,
                download_target: row
                    .try_get("download_url")
                    .map_err(|e| StoreError::decode(format!("product download_url: {e}")))?,
            })
        })
        .transpose()
    }
}
