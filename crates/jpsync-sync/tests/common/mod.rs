//! Shared fixtures for the sync integration tests: an in-memory catalog and
//! config builders pointed at local mock servers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jpsync_core::{
    build_app_config, AppConfig, CatalogProduct, CatalogVariant, ProductRecord, ProductStatus,
    Vendor,
};
use jpsync_scraper::SessionConfig;
use jpsync_shopify::{Catalog, CatalogError};
use jpsync_sync::{JobSettings, NoBackend, Orchestrator, Translator};

/// Counts of every mutating catalog call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Writes {
    pub creates: u32,
    pub updates: u32,
    pub inventory: u32,
    pub status: u32,
    pub publishes: u32,
    pub deletes: u32,
    pub collects: u32,
}

impl Writes {
    pub fn total(&self) -> u32 {
        self.creates
            + self.updates
            + self.inventory
            + self.status
            + self.publishes
            + self.deletes
            + self.collects
    }
}

#[derive(Default)]
struct State {
    products: Vec<(Vendor, CatalogProduct)>,
    writes: Writes,
    next_id: i64,
    collections: HashMap<String, i64>,
    collects: Vec<(i64, i64)>,
}

/// In-memory [`Catalog`]. New variants start with zero stock, like a freshly
/// created Shopify product.
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<State>,
    unreachable: AtomicBool,
    lookups: AtomicU32,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call fails with a 503 from now on.
    pub fn go_down(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Writes {
        self.state.lock().unwrap().writes
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn product(&self, handle: &str) -> Option<CatalogProduct> {
        self.state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|(_, p)| p.handle == handle)
            .map(|(_, p)| p.clone())
    }

    /// Titles of the collections `handle` was added to, sorted.
    pub fn collections_of(&self, handle: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let Some(product_id) = state
            .products
            .iter()
            .find(|(_, p)| p.handle == handle)
            .map(|(_, p)| p.id)
        else {
            return Vec::new();
        };
        let mut titles: Vec<String> = state
            .collects
            .iter()
            .filter(|(p, _)| *p == product_id)
            .filter_map(|(_, c)| {
                state
                    .collections
                    .iter()
                    .find(|(_, id)| *id == c)
                    .map(|(title, _)| title.clone())
            })
            .collect();
        titles.sort();
        titles
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    /// Inserts a product without counting a write.
    pub fn seed(&self, vendor: Vendor, product: CatalogProduct) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(product.id);
        state.products.push((vendor, product));
    }

    fn check_reachable(&self) -> Result<(), CatalogError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CatalogError::UnexpectedStatus {
                status: 503,
                url: "fake://catalog".to_owned(),
                body: "service unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

fn next_id(state: &mut State) -> i64 {
    state.next_id += 1;
    state.next_id
}

fn merge(state: &mut State, existing: &CatalogProduct, record: &ProductRecord) -> CatalogProduct {
    let mut variants = Vec::with_capacity(record.variants.len());
    for source in &record.variants {
        let key = source.option_key();
        let variant = match existing.find_variant(&key) {
            Some(current) => CatalogVariant {
                price: source.target_price,
                ..current.clone()
            },
            None => {
                let id = next_id(state);
                CatalogVariant {
                    id,
                    inventory_item_id: Some(id * 10),
                    option_values: key,
                    sku: source.sku.clone(),
                    price: source.target_price,
                    available: false,
                }
            }
        };
        variants.push(variant);
    }
    CatalogProduct {
        title: record.display_title().to_owned(),
        body_html: Some(record.display_description().to_owned()),
        source_url: Some(record.source_url.clone()),
        source_id: Some(record.source_id.clone()),
        variants,
        ..existing.clone()
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn list_products(&self, vendor: Vendor) -> Result<Vec<CatalogProduct>, CatalogError> {
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .products
            .iter()
            .filter(|(v, _)| *v == vendor)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn lookup(&self, handle: &str) -> Result<Option<CatalogProduct>, CatalogError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.product(handle))
    }

    async fn create(&self, record: &ProductRecord) -> Result<CatalogProduct, CatalogError> {
        self.check_reachable()?;
        if let Some(existing) = self.product(&record.handle()) {
            return self.update(&existing, record).await;
        }
        let mut state = self.state.lock().unwrap();
        state.writes.creates += 1;
        let blank = CatalogProduct {
            id: next_id(&mut state),
            handle: record.handle(),
            title: String::new(),
            body_html: None,
            status: ProductStatus::Active,
            source_url: None,
            source_id: None,
            variants: Vec::new(),
        };
        let product = merge(&mut state, &blank, record);
        state.products.push((record.vendor, product.clone()));
        Ok(product)
    }

    async fn update(
        &self,
        existing: &CatalogProduct,
        record: &ProductRecord,
    ) -> Result<CatalogProduct, CatalogError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.writes.updates += 1;
        let product = merge(&mut state, existing, record);
        if let Some((_, slot)) = state.products.iter_mut().find(|(_, p)| p.id == existing.id) {
            *slot = product.clone();
        }
        Ok(product)
    }

    async fn set_inventory(
        &self,
        variant: &CatalogVariant,
        _location_id: i64,
        available: bool,
    ) -> Result<(), CatalogError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.writes.inventory += 1;
        for (_, product) in &mut state.products {
            for v in &mut product.variants {
                if v.id == variant.id {
                    v.available = available;
                }
            }
        }
        Ok(())
    }

    async fn set_status(&self, product_id: i64, status: ProductStatus) -> Result<(), CatalogError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.writes.status += 1;
        if let Some((_, p)) = state.products.iter_mut().find(|(_, p)| p.id == product_id) {
            p.status = status;
        }
        Ok(())
    }

    async fn publish(&self, _product_id: i64) -> Result<(), CatalogError> {
        self.check_reachable()?;
        self.state.lock().unwrap().writes.publishes += 1;
        Ok(())
    }

    async fn ensure_collection(&self, title: &str) -> Result<i64, CatalogError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.collections.get(title) {
            return Ok(*id);
        }
        let id = next_id(&mut state);
        state.collections.insert(title.to_owned(), id);
        Ok(id)
    }

    async fn add_to_collection(
        &self,
        product_id: i64,
        collection_id: i64,
    ) -> Result<(), CatalogError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if !state.collects.contains(&(product_id, collection_id)) {
            state.writes.collects += 1;
            state.collects.push((product_id, collection_id));
        }
        Ok(())
    }

    async fn delete(&self, product_id: i64) -> Result<(), CatalogError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.writes.deletes += 1;
        state.products.retain(|(_, p)| p.id != product_id);
        Ok(())
    }

    async fn primary_location(&self) -> Result<i64, CatalogError> {
        self.check_reachable()?;
        Ok(1)
    }
}

/// App config with `FX=0.21`, `COMMISSION=0.10`, `SHIPPING=150`, `ROUND=10`.
pub fn app_config(rounding: &str) -> AppConfig {
    let env: HashMap<&str, &str> = [
        ("SHOPIFY_SHOP", "jpsync-test"),
        ("SHOPIFY_ACCESS_TOKEN", "shpat_test"),
        ("FX_JPY_TO_TWD", "0.21"),
        ("COMMISSION_RATE", "0.10"),
        ("SHIPPING_PER_UNIT_TWD", "150"),
        ("PRICE_ROUND_UNIT_TWD", "10"),
        ("PRICE_ROUNDING", rounding),
    ]
    .into_iter()
    .collect();
    build_app_config(|key| {
        env.get(key)
            .map(|v| (*v).to_owned())
            .ok_or(std::env::VarError::NotPresent)
    })
    .expect("test config should be valid")
}

pub fn session(timeout: Duration) -> SessionConfig {
    SessionConfig {
        timeout,
        user_agent: "jpsync-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 0,
        detail_spacing: Duration::ZERO,
        page_spacing: Duration::ZERO,
    }
}

/// Orchestrator over `catalog` with every vendor origin pointed at
/// `vendor_base` and translation disabled.
pub fn orchestrator(catalog: Arc<FakeCatalog>, vendor_base: &str, rounding: &str) -> Orchestrator {
    orchestrator_with_timeout(catalog, vendor_base, rounding, Duration::from_secs(5))
}

pub fn orchestrator_with_timeout(
    catalog: Arc<FakeCatalog>,
    vendor_base: &str,
    rounding: &str,
    timeout: Duration,
) -> Orchestrator {
    let mut settings =
        JobSettings::new(Arc::new(app_config(rounding))).with_session(session(timeout));
    for vendor in Vendor::ALL {
        settings = settings.with_base_url(vendor, vendor_base);
    }
    Orchestrator::new(
        settings,
        catalog,
        Translator::new(Box::new(NoBackend), "zh-TW"),
    )
}

/// A downstream product linked back to `source_url`.
pub fn listed_product(id: i64, handle: &str, source_url: Option<String>) -> CatalogProduct {
    CatalogProduct {
        id,
        handle: handle.to_owned(),
        title: format!("{handle} title"),
        body_html: None,
        status: ProductStatus::Active,
        source_url,
        source_id: Some(handle.to_owned()),
        variants: vec![CatalogVariant {
            id: id * 100,
            inventory_item_id: Some(id * 1000),
            option_values: vec!["M".to_owned()],
            sku: None,
            price: 2460,
            available: true,
        }],
    }
}
