//! Canonical product model shared by the fetchers, the catalog client and
//! the upsert engine.
//!
//! Money is always integer minor units: yen for `source_price`, whole New
//! Taiwan dollars for `target_price` and downstream variant prices.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vendor::Vendor;

/// Canonical category tags that get a per-brand collection downstream.
/// Synonyms (`兒童`, `作業服`) and brand aliases stay plain tags.
pub const COLLECTION_TAGS: [&str; 6] = ["男裝", "女裝", "童裝", "男鞋", "女鞋", "工作服"];

/// One image attached to a product, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// A product as synthesized from one vendor fetch. Lives for one run only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Vendor-stable identifier (handle, item code, SKU, article number).
    pub source_id: String,
    pub source_url: String,
    pub vendor: Vendor,
    pub title_src: String,
    /// Translated title; `None` until the translator stage has run.
    pub title_tgt: Option<String>,
    pub description_src: String,
    pub description_tgt: Option<String>,
    pub images: Vec<ImageDescriptor>,
    pub variants: Vec<VariantRecord>,
    pub categories: BTreeSet<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Deterministic downstream handle: `{vendor-tag}-{source-id-slug}`.
    #[must_use]
    pub fn handle(&self) -> String {
        crate::handle::handle_for(self.vendor, &self.source_id)
    }

    /// Returns `true` if at least one variant can be bought right now.
    #[must_use]
    pub fn has_available_variants(&self) -> bool {
        self.variants.iter().any(|v| v.available)
    }

    /// Title to publish: the translation when present, otherwise the source.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title_tgt.as_deref().unwrap_or(&self.title_src)
    }

    #[must_use]
    pub fn display_description(&self) -> &str {
        self.description_tgt
            .as_deref()
            .unwrap_or(&self.description_src)
    }

    /// Downstream collections the product belongs to: the brand, plus
    /// `{brand} {tag}` for each [`COLLECTION_TAGS`] entry it carries.
    #[must_use]
    pub fn collection_titles(&self) -> Vec<String> {
        let brand = self.vendor.brand();
        std::iter::once(brand.to_owned())
            .chain(
                COLLECTION_TAGS
                    .iter()
                    .filter(|tag| self.categories.contains(**tag))
                    .map(|tag| format!("{brand} {tag}")),
            )
            .collect()
    }

    /// Ordered option names taken from the first variant. All variants of a
    /// normalized record share the same option names in the same order.
    #[must_use]
    pub fn option_names(&self) -> Vec<&str> {
        self.variants
            .first()
            .map(|v| v.option_values.iter().map(|(k, _)| k.as_str()).collect())
            .unwrap_or_default()
    }
}

/// A purchasable combination of option values within a [`ProductRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Ordered option-name → value pairs, e.g. `[("color", "BLACK"), ("size", "M")]`.
    pub option_values: Vec<(String, String)>,
    pub sku: Option<String>,
    /// Source price in yen.
    pub source_price: i64,
    /// Resale price in TWD; zero until the price transformer has run.
    pub target_price: i64,
    pub available: bool,
    /// Index into [`ProductRecord::images`].
    pub image_index: Option<usize>,
}

impl VariantRecord {
    /// Variant identity used for matching against the downstream catalog:
    /// the ordered option values, without names.
    #[must_use]
    pub fn option_key(&self) -> Vec<String> {
        self.option_values.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Human-readable variant title, e.g. `"BLACK / M"`.
    #[must_use]
    pub fn title(&self) -> String {
        self.option_values
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Outcome of probing a vendor product page for availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum StockVerdict {
    Available,
    OutOfStock(String),
    PageGone(String),
    Unknown(String),
}

impl StockVerdict {
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Available => None,
            Self::OutOfStock(r) | Self::PageGone(r) | Self::Unknown(r) => Some(r),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::OutOfStock(_) => "out_of_stock",
            Self::PageGone(_) => "page_gone",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Publication state of a downstream product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
}

impl ProductStatus {
    /// Parses both the REST (`"active"`) and GraphQL (`"ACTIVE"`) spellings.
    /// Unrecognised values are treated as `Draft` so they never get
    /// re-activated by accident.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "archived" => Self::Archived,
            _ => Self::Draft,
        }
    }

    #[must_use]
    pub fn as_rest(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_rest())
    }
}

/// A product as it currently exists in the downstream store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Numeric Shopify product id.
    pub id: i64,
    pub handle: String,
    pub title: String,
    pub body_html: Option<String>,
    pub status: ProductStatus,
    /// Vendor page URL stored in the `custom.link` metafield.
    pub source_url: Option<String>,
    /// Vendor source id stored in the `custom.source_id` metafield.
    pub source_id: Option<String>,
    pub variants: Vec<CatalogVariant>,
}

impl CatalogProduct {
    #[must_use]
    pub fn find_variant(&self, option_key: &[String]) -> Option<&CatalogVariant> {
        self.variants.iter().find(|v| v.option_values == option_key)
    }

    #[must_use]
    pub fn has_available_variants(&self) -> bool {
        self.variants.iter().any(|v| v.available)
    }
}

/// One downstream variant with the ids needed for price and inventory writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub id: i64,
    pub inventory_item_id: Option<i64>,
    /// Ordered option values (`option1`, `option2`, `option3`).
    pub option_values: Vec<String>,
    pub sku: Option<String>,
    /// Price in whole TWD.
    pub price: i64,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(color: &str, size: &str, available: bool) -> VariantRecord {
        VariantRecord {
            option_values: vec![
                ("color".to_owned(), color.to_owned()),
                ("size".to_owned(), size.to_owned()),
            ],
            sku: None,
            source_price: 10_000,
            target_price: 0,
            available,
            image_index: None,
        }
    }

    fn record(variants: Vec<VariantRecord>) -> ProductRecord {
        ProductRecord {
            source_id: "ABC-123".to_owned(),
            source_url: "https://jp.bape.com/products/abc-123".to_owned(),
            vendor: Vendor::Bape,
            title_src: "シャークフーディ".to_owned(),
            title_tgt: None,
            description_src: String::new(),
            description_tgt: None,
            images: vec![],
            variants,
            categories: BTreeSet::new(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn handle_combines_vendor_tag_and_source_id() {
        assert_eq!(record(vec![]).handle(), "bape-abc-123");
    }

    #[test]
    fn display_title_prefers_translation() {
        let mut r = record(vec![]);
        assert_eq!(r.display_title(), "シャークフーディ");
        r.title_tgt = Some("BAPE 鯊魚連帽衫".to_owned());
        assert_eq!(r.display_title(), "BAPE 鯊魚連帽衫");
    }

    #[test]
    fn option_key_drops_names_and_keeps_order() {
        let v = variant("BLACK", "M", true);
        assert_eq!(v.option_key(), vec!["BLACK".to_owned(), "M".to_owned()]);
        assert_eq!(v.title(), "BLACK / M");
    }

    #[test]
    fn has_available_variants_is_false_when_all_sold_out() {
        let r = record(vec![variant("BLACK", "M", false), variant("BLACK", "L", false)]);
        assert!(!r.has_available_variants());
    }

    #[test]
    fn collection_titles_start_with_the_brand() {
        let mut r = record(vec![]);
        r.categories = ["BAPE", "A BATHING APE", "童裝", "兒童"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        assert_eq!(r.collection_titles(), ["BAPE", "BAPE 童裝"]);
        assert_eq!(record(vec![]).collection_titles(), ["BAPE"]);
    }

    #[test]
    fn product_status_parses_graphql_and_rest_spellings() {
        assert_eq!(ProductStatus::parse("ACTIVE"), ProductStatus::Active);
        assert_eq!(ProductStatus::parse("draft"), ProductStatus::Draft);
        assert_eq!(ProductStatus::parse("ARCHIVED"), ProductStatus::Archived);
        assert_eq!(ProductStatus::parse("weird"), ProductStatus::Draft);
    }

    #[test]
    fn stock_verdict_serializes_with_reason() {
        let json = serde_json::to_value(StockVerdict::OutOfStock("販売を終了".to_owned())).unwrap();
        assert_eq!(json["verdict"], "out_of_stock");
        assert_eq!(json["reason"], "販売を終了");
    }

    #[test]
    fn find_variant_matches_on_option_values() {
        let product = CatalogProduct {
            id: 1,
            handle: "bape-abc-123".to_owned(),
            title: "t".to_owned(),
            body_html: None,
            status: ProductStatus::Active,
            source_url: None,
            source_id: None,
            variants: vec![CatalogVariant {
                id: 11,
                inventory_item_id: Some(111),
                option_values: vec!["BLACK".to_owned(), "M".to_owned()],
                sku: Some("old-sku".to_owned()),
                price: 2460,
                available: true,
            }],
        };
        let key = vec!["BLACK".to_owned(), "M".to_owned()];
        assert_eq!(product.find_variant(&key).map(|v| v.id), Some(11));
        assert!(product.find_variant(&["WHITE".to_owned()]).is_none());
    }
}
