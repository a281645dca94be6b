//! Wire shapes for the Shopify Admin REST and GraphQL APIs.
//!
//! Only the fields the sync pipeline reads are modelled; serde ignores the
//! rest.

use jpsync_core::{CatalogProduct, CatalogVariant, ProductStatus};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// GraphQL envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
}

impl GraphQlError {
    /// `message` with the error code appended when one is present, so
    /// `THROTTLED` survives into [`crate::CatalogError::GraphQl`].
    #[must_use]
    pub fn describe(&self) -> String {
        match self.extensions.as_ref().and_then(|e| e.code.as_deref()) {
            Some(code) => format!("{} ({code})", self.message),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Joins user errors into one line, `field: message; field: message`.
#[must_use]
pub fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationPayload {
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// ---------------------------------------------------------------------------
// Product listing (GraphQL)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: ProductConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub legacy_resource_id: String,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub description_html: Option<String>,
    pub status: String,
    #[serde(default)]
    pub link: Option<MetafieldValue>,
    #[serde(default)]
    pub source_id: Option<MetafieldValue>,
    pub variants: VariantConnection,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantConnection {
    #[serde(default)]
    pub page_info: Option<VariantPageInfo>,
    pub nodes: Vec<VariantNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPageInfo {
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub legacy_resource_id: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: String,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[serde(default)]
    pub inventory_item: Option<LegacyRef>,
}

#[derive(Debug, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRef {
    pub legacy_resource_id: String,
}

impl ProductNode {
    /// `true` when the variant connection was cut off after the first page.
    #[must_use]
    pub fn variants_truncated(&self) -> bool {
        self.variants
            .page_info
            .as_ref()
            .is_some_and(|p| p.has_next_page)
    }

    /// Converts the GraphQL node into the shared catalog model.
    ///
    /// Returns `None` when the legacy id is not numeric, which only happens
    /// on a malformed response.
    #[must_use]
    pub fn into_catalog(self) -> Option<CatalogProduct> {
        if self.variants_truncated() {
            tracing::warn!(
                handle = %self.handle,
                fetched = self.variants.nodes.len(),
                "product has more variants than one page holds; the rest are not matched"
            );
        }
        let id = self.legacy_resource_id.parse().ok()?;
        let variants = self
            .variants
            .nodes
            .into_iter()
            .filter_map(VariantNode::into_catalog)
            .collect();
        Some(CatalogProduct {
            id,
            handle: self.handle,
            title: self.title,
            body_html: self.description_html,
            status: ProductStatus::parse(&self.status),
            source_url: self.link.map(|m| m.value).filter(|v| !v.is_empty()),
            source_id: self.source_id.map(|m| m.value).filter(|v| !v.is_empty()),
            variants,
        })
    }
}

impl VariantNode {
    fn into_catalog(self) -> Option<CatalogVariant> {
        let id = self.legacy_resource_id.parse().ok()?;
        Some(CatalogVariant {
            id,
            inventory_item_id: self
                .inventory_item
                .and_then(|i| i.legacy_resource_id.parse().ok()),
            option_values: self
                .selected_options
                .into_iter()
                .map(|o| o.value)
                .collect(),
            sku: self.sku.filter(|s| !s.is_empty()),
            price: parse_money(&self.price),
            available: self.inventory_quantity.unwrap_or(0) > 0,
        })
    }
}

/// Parses a Shopify money string (`"2460.00"`) into whole units, rounding
/// halves away from zero. Unparseable input maps to zero.
#[must_use]
pub fn parse_money(raw: &str) -> i64 {
    raw.trim()
        .parse::<Decimal>()
        .ok()
        .and_then(|d| {
            d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Publications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PublicationsData {
    pub publications: PublicationConnection,
}

#[derive(Debug, Deserialize)]
pub struct PublicationConnection {
    pub nodes: Vec<GidNode>,
}

#[derive(Debug, Deserialize)]
pub struct GidNode {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishData {
    pub publishable_publish: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldsSetData {
    pub metafields_set: MutationPayload,
}

// ---------------------------------------------------------------------------
// REST Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RestProductEnvelope {
    pub product: RestProduct,
}

#[derive(Debug, Deserialize)]
pub struct RestProduct {
    pub id: i64,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub variants: Vec<RestVariant>,
    #[serde(default)]
    pub images: Vec<RestImage>,
}

#[derive(Debug, Deserialize)]
pub struct RestVariantEnvelope {
    pub variant: RestVariant,
}

#[derive(Debug, Deserialize)]
pub struct RestVariant {
    pub id: i64,
    #[serde(default)]
    pub inventory_item_id: Option<i64>,
    #[serde(default)]
    pub option1: Option<String>,
    #[serde(default)]
    pub option2: Option<String>,
    #[serde(default)]
    pub option3: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: String,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
}

impl RestVariant {
    #[must_use]
    pub fn into_catalog(self) -> CatalogVariant {
        let option_values = [self.option1, self.option2, self.option3]
            .into_iter()
            .flatten()
            .collect();
        CatalogVariant {
            id: self.id,
            inventory_item_id: self.inventory_item_id,
            option_values,
            sku: self.sku.filter(|s| !s.is_empty()),
            price: parse_money(&self.price),
            available: self.inventory_quantity.unwrap_or(0) > 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RestImage {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CustomCollectionsEnvelope {
    #[serde(default)]
    pub custom_collections: Vec<RestCollection>,
}

#[derive(Debug, Deserialize)]
pub struct CustomCollectionEnvelope {
    pub custom_collection: RestCollection,
}

#[derive(Debug, Deserialize)]
pub struct RestCollection {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationsEnvelope {
    pub locations: Vec<RestLocation>,
}

#[derive(Debug, Deserialize)]
pub struct RestLocation {
    pub id: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// REST error body: `{"errors": {...}}` or `{"errors": "..."}`.
#[derive(Debug, Deserialize)]
pub struct RestErrors {
    pub errors: serde_json::Value,
}
