use async_trait::async_trait;
use jpsync_core::{CatalogProduct, CatalogVariant, ProductRecord, ProductStatus, Vendor};

use crate::error::CatalogError;

/// Operations the upsert engine and reconciler need from the downstream
/// store. [`crate::ShopifyClient`] is the production implementation; tests
/// substitute an in-memory catalog.
///
/// Every write is keyed by handle or by downstream id, so repeating a call
/// after a transient failure is safe.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every downstream product whose vendor is `vendor.brand()`, with
    /// variant ids and inventory-item ids. Exhausts pagination.
    async fn list_products(&self, vendor: Vendor) -> Result<Vec<CatalogProduct>, CatalogError>;

    /// The product with `handle`, or `None` when absent.
    async fn lookup(&self, handle: &str) -> Result<Option<CatalogProduct>, CatalogError>;

    /// Creates the product for `record`. When the handle already exists the
    /// call behaves as [`Catalog::update`] on that product.
    async fn create(&self, record: &ProductRecord) -> Result<CatalogProduct, CatalogError>;

    /// Brings `existing` in line with `record`, touching only what differs:
    /// title and body, variant prices, new option tuples (appended) and
    /// option tuples no longer offered (deleted).
    async fn update(
        &self,
        existing: &CatalogProduct,
        record: &ProductRecord,
    ) -> Result<CatalogProduct, CatalogError>;

    /// Writes absolute availability for `variant` at `location_id`.
    async fn set_inventory(
        &self,
        variant: &CatalogVariant,
        location_id: i64,
        available: bool,
    ) -> Result<(), CatalogError>;

    async fn set_status(&self, product_id: i64, status: ProductStatus)
        -> Result<(), CatalogError>;

    /// Publishes the product to every sales channel of the shop.
    async fn publish(&self, product_id: i64) -> Result<(), CatalogError>;

    /// Id of the custom collection titled `title`, created and published to
    /// every sales channel when it does not exist yet.
    async fn ensure_collection(&self, title: &str) -> Result<i64, CatalogError>;

    /// Adds the product to the collection. Adding it twice succeeds.
    async fn add_to_collection(
        &self,
        product_id: i64,
        collection_id: i64,
    ) -> Result<(), CatalogError>;

    /// Deletes the product. Deleting an absent product succeeds.
    async fn delete(&self, product_id: i64) -> Result<(), CatalogError>;

    /// Location used for inventory writes.
    async fn primary_location(&self) -> Result<i64, CatalogError>;
}
