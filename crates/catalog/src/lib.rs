//! `meshmart-catalog` — the product catalog collaborator contract.
//!
//! The order pipeline treats the catalog as an external, read-only lookup:
//! it is the authoritative source for prices and download targets. Catalog
//! management (CRUD, taxonomy, bulk import) lives outside this workspace.

pub mod product;

pub use product::{CatalogProduct, InMemoryCatalog, ProductCatalog};
