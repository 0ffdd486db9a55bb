use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use meshmart_core::{ProductId, StoreError};

/// Catalog view of a product: exactly what the order pipeline needs.
///
/// `price` is in the smallest currency unit (e.g. cents). `download_target`
/// is the locator handed to buyers on redemption; serving bytes is not this
/// system's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub price: i64,
    pub download_target: String,
}

/// Read-only product lookup.
///
/// Implementations must be cheap to call per order item; the order service
/// resolves every submitted item through this to obtain the authoritative
/// price (client-submitted prices are never trusted).
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_by_id(&self, id: ProductId) -> Result<Option<CatalogProduct>, StoreError>;
}

#[async_trait]
impl<C> ProductCatalog for Arc<C>
where
    C: ProductCatalog + ?Sized,
{
    async fn get_by_id(&self, id: ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        (**self).get_by_id(id).await
    }
}

/// In-memory catalog for tests and dev wiring.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, CatalogProduct>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: CatalogProduct) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.id, product);
        }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_by_id(&self, id: ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        let products = self
            .products
            .read()
            .map_err(|_| StoreError::unavailable("catalog lock poisoned"))?;
        Ok(products.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_returns_inserted_product() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(CatalogProduct {
            id: ProductId::new(7),
            price: 4999,
            download_target: "https://cdn.example.com/assets/7.zip".to_string(),
        });

        let found = catalog.get_by_id(ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(found.price, 4999);

        assert!(catalog.get_by_id(ProductId::new(8)).await.unwrap().is_none());
    }
}
