//! Upsert engine: decides create / update / draft / delete for one product
//! and applies the decision through a [`Catalog`].
//!
//! Decision order for a fresh record (first match wins):
//!
//! | Condition                                   | Action                          |
//! |---------------------------------------------|---------------------------------|
//! | verdict `PageGone`                          | delete if present               |
//! | verdict `OutOfStock`, product present       | zero inventory, draft           |
//! | verdict `OutOfStock`, product absent        | skip                            |
//! | product absent, some variant available      | create, stock, publish, collect |
//! | product present, price or variant-set drift | update variants                 |
//! | product present, availability changed       | write inventory, draft ↔ active |
//! | otherwise                                   | no-op                           |
//!
//! Drift and availability are both repaired in the same pass when both
//! apply. Variant identity is the ordered option-value tuple, never the SKU.

use std::sync::Arc;

use jpsync_core::{CatalogProduct, CatalogVariant, ProductRecord, ProductStatus, StockVerdict};
use jpsync_shopify::{Catalog, CatalogError};

use crate::progress::Action;

/// What [`plan`] decided, before any catalog call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Delete { product_id: i64 },
    Draft { product_id: i64 },
    Skip { reason: &'static str },
    Create,
    Sync {
        /// Prices or the variant set drifted.
        update: bool,
        /// Status transition to apply, if any.
        status: Option<ProductStatus>,
    },
    Noop,
}

/// Result of applying one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub action: Action,
    pub product_id: Option<i64>,
    pub message: String,
}

impl Outcome {
    fn new(action: Action, product_id: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            action,
            product_id,
            message: message.into(),
        }
    }
}

/// Decides what to do with `record` given the downstream product and an
/// optional stock verdict. Pure; no I/O.
#[must_use]
pub fn plan(
    existing: Option<&CatalogProduct>,
    record: &ProductRecord,
    verdict: Option<&StockVerdict>,
) -> Plan {
    match (verdict, existing) {
        (Some(StockVerdict::PageGone(_)), Some(product)) => {
            return Plan::Delete {
                product_id: product.id,
            };
        }
        (Some(StockVerdict::PageGone(_)), None) => {
            return Plan::Skip {
                reason: "vendor page gone and nothing downstream",
            };
        }
        (Some(StockVerdict::OutOfStock(_)), Some(product)) => {
            return if product.status == ProductStatus::Draft {
                Plan::Noop
            } else {
                Plan::Draft {
                    product_id: product.id,
                }
            };
        }
        (Some(StockVerdict::OutOfStock(_)), None) => {
            return Plan::Skip {
                reason: "out of stock and never listed",
            };
        }
        _ => {}
    }

    let Some(product) = existing else {
        return if record.has_available_variants() {
            Plan::Create
        } else {
            Plan::Skip {
                reason: "no variant in stock",
            }
        };
    };

    let update = has_drift(product, record);
    let status = status_transition(product, record);
    if update || status.is_some() || availability_changed(product, record) {
        Plan::Sync { update, status }
    } else {
        Plan::Noop
    }
}

/// Decision for the reconciler, which has no fresh record: only the stock
/// verdict for the product's source page. `Available` and `Unknown` never
/// mutate anything.
#[must_use]
pub fn reconcile_plan(product: &CatalogProduct, verdict: &StockVerdict) -> Plan {
    match verdict {
        StockVerdict::PageGone(_) => Plan::Delete {
            product_id: product.id,
        },
        StockVerdict::OutOfStock(_) if product.status != ProductStatus::Draft => Plan::Draft {
            product_id: product.id,
        },
        StockVerdict::OutOfStock(_) | StockVerdict::Available | StockVerdict::Unknown(_) => {
            Plan::Noop
        }
    }
}

/// Price drift on a matched variant, a new option tuple, or a downstream
/// tuple the vendor no longer offers. Prices compare exactly.
#[must_use]
pub fn has_drift(product: &CatalogProduct, record: &ProductRecord) -> bool {
    let price_or_new = record
        .variants
        .iter()
        .any(|v| match product.find_variant(&v.option_key()) {
            Some(current) => current.price != v.target_price,
            None => true,
        });
    let removed = product.variants.iter().any(|current| {
        !record
            .variants
            .iter()
            .any(|v| v.option_key() == current.option_values)
    });
    price_or_new || removed
}

#[must_use]
pub fn availability_changed(product: &CatalogProduct, record: &ProductRecord) -> bool {
    record
        .variants
        .iter()
        .any(|v| match product.find_variant(&v.option_key()) {
            Some(current) => current.available != v.available,
            None => v.available,
        })
}

/// `Draft → Active` when something is in stock again, `Active → Draft`
/// when nothing is. Archived products are left alone.
#[must_use]
pub fn status_transition(product: &CatalogProduct, record: &ProductRecord) -> Option<ProductStatus> {
    let any_available = record.has_available_variants();
    match product.status {
        ProductStatus::Draft if any_available => Some(ProductStatus::Active),
        ProductStatus::Active if !any_available => Some(ProductStatus::Draft),
        _ => None,
    }
}

pub struct UpsertEngine {
    catalog: Arc<dyn Catalog>,
}

impl UpsertEngine {
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Applies the decision table to a freshly fetched record.
    ///
    /// # Errors
    ///
    /// Propagates the first [`CatalogError`]; the caller decides whether it
    /// is transient.
    pub async fn apply(
        &self,
        record: &ProductRecord,
        verdict: Option<&StockVerdict>,
    ) -> Result<Outcome, CatalogError> {
        let handle = record.handle();
        let existing = self.catalog.lookup(&handle).await?;
        if let Some(product) = &existing {
            warn_on_source_change(product, record);
        }

        match (plan(existing.as_ref(), record, verdict), existing) {
            (Plan::Delete { product_id }, _) => self.delete(product_id).await,
            (Plan::Draft { .. }, Some(product)) => self.draft(&product).await,
            (Plan::Skip { reason }, existing) => Ok(Outcome::new(
                Action::Checked,
                existing.map(|p| p.id),
                reason,
            )),
            (Plan::Create, _) => self.create(record).await,
            (Plan::Sync { update, status }, Some(product)) => {
                self.sync(product, record, update, status).await
            }
            (Plan::Draft { .. } | Plan::Sync { .. } | Plan::Noop, existing) => Ok(Outcome::new(
                Action::Checked,
                existing.map(|p| p.id),
                "unchanged",
            )),
        }
    }

    /// Applies a reconciler verdict to an existing downstream product.
    ///
    /// # Errors
    ///
    /// Propagates the [`CatalogError`] of the delete, inventory or status write.
    pub async fn reconcile(
        &self,
        product: &CatalogProduct,
        verdict: &StockVerdict,
    ) -> Result<Outcome, CatalogError> {
        match reconcile_plan(product, verdict) {
            Plan::Delete { product_id } => self.delete(product_id).await,
            Plan::Draft { .. } => self.draft(product).await,
            _ => {
                let message = match verdict {
                    StockVerdict::Unknown(reason) => {
                        format!("stock unknown ({reason}), left untouched")
                    }
                    other => other.label().to_owned(),
                };
                Ok(Outcome::new(Action::Checked, Some(product.id), message))
            }
        }
    }

    async fn delete(&self, product_id: i64) -> Result<Outcome, CatalogError> {
        self.catalog.delete(product_id).await?;
        Ok(Outcome::new(
            Action::Deleted,
            Some(product_id),
            "vendor page gone",
        ))
    }

    /// Zeroes every variant still stocked downstream, then drafts.
    async fn draft(&self, product: &CatalogProduct) -> Result<Outcome, CatalogError> {
        let stocked: Vec<&CatalogVariant> =
            product.variants.iter().filter(|v| v.available).collect();
        if !stocked.is_empty() {
            let location_id = self.catalog.primary_location().await?;
            for variant in &stocked {
                self.catalog
                    .set_inventory(variant, location_id, false)
                    .await?;
            }
        }
        self.catalog
            .set_status(product.id, ProductStatus::Draft)
            .await?;
        Ok(Outcome::new(
            Action::Drafted,
            Some(product.id),
            format!("out of stock at vendor, {} variants zeroed", stocked.len()),
        ))
    }

    async fn create(&self, record: &ProductRecord) -> Result<Outcome, CatalogError> {
        let product = self.catalog.create(record).await?;
        let written = self.write_inventory(&product, record).await?;
        if product.status == ProductStatus::Draft {
            self.catalog
                .set_status(product.id, ProductStatus::Active)
                .await?;
        }
        self.catalog.publish(product.id).await?;
        let collections = self.assign_collections(product.id, record).await;
        Ok(Outcome::new(
            Action::Created,
            Some(product.id),
            format!(
                "{} variants, {written} stocked, {collections} collections",
                product.variants.len()
            ),
        ))
    }

    /// Adds a new product to its brand and category collections. A failure
    /// here is logged and leaves the product listed without that collection.
    async fn assign_collections(&self, product_id: i64, record: &ProductRecord) -> usize {
        let mut assigned = 0usize;
        for title in record.collection_titles() {
            let result = match self.catalog.ensure_collection(&title).await {
                Ok(collection_id) => {
                    self.catalog
                        .add_to_collection(product_id, collection_id)
                        .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => assigned += 1,
                Err(e) => tracing::warn!(
                    product_id,
                    collection = %title,
                    error = %e,
                    "failed to add product to collection"
                ),
            }
        }
        assigned
    }

    async fn sync(
        &self,
        product: CatalogProduct,
        record: &ProductRecord,
        update: bool,
        status: Option<ProductStatus>,
    ) -> Result<Outcome, CatalogError> {
        let product = if update {
            self.catalog.update(&product, record).await?
        } else {
            product
        };
        let written = self.write_inventory(&product, record).await?;
        if let Some(status) = status {
            self.catalog.set_status(product.id, status).await?;
        }

        let action = match status {
            Some(ProductStatus::Draft) => Action::Drafted,
            _ => Action::Updated,
        };
        let mut parts = Vec::new();
        if update {
            parts.push("variants updated".to_owned());
        }
        if written > 0 {
            parts.push(format!("{written} inventory writes"));
        }
        if let Some(status) = status {
            parts.push(format!("status {status}"));
        }
        Ok(Outcome::new(action, Some(product.id), parts.join(", ")))
    }

    /// Writes availability for every variant whose downstream state differs
    /// from the record. Returns the number of writes.
    async fn write_inventory(
        &self,
        product: &CatalogProduct,
        record: &ProductRecord,
    ) -> Result<usize, CatalogError> {
        let mut location = None;
        let mut written = 0usize;
        for source in &record.variants {
            let Some(current) = product.find_variant(&source.option_key()) else {
                continue;
            };
            if current.available == source.available {
                continue;
            }
            let location_id = match location {
                Some(id) => id,
                None => {
                    let id = self.catalog.primary_location().await?;
                    location = Some(id);
                    id
                }
            };
            self.catalog
                .set_inventory(current, location_id, source.available)
                .await?;
            written += 1;
        }
        Ok(written)
    }
}

/// Logs when a handle now maps to a different vendor item: prices of the
/// matching option tuples are about to be overwritten by the new item.
fn warn_on_source_change(product: &CatalogProduct, record: &ProductRecord) {
    if let Some(previous) = product.source_id.as_deref() {
        if previous != record.source_id {
            tracing::warn!(
                handle = %product.handle,
                previous_source_id = %previous,
                source_id = %record.source_id,
                "source id changed for an existing handle"
            );
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
