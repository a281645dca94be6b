//! Vendors that run a public hosted-storefront `products.json` feed
//! (BAPE and Human Made).
//!
//! ## Observed shape
//!
//! Tags come back as a JSON array of strings. `available` may be missing on
//! older themes and defaults to `true`. `option1..option3` carry the variant
//! option values in the order given by the product-level `options` array.
//! Images link back to variants through `variant_ids`.

use jpsync_core::{ImageDescriptor, Vendor};
use serde::Deserialize;

use crate::error::VendorError;
use crate::raw::{Listing, ListingPage, RawProduct, RawVariant};
use crate::session::VendorSession;

/// Category filter query and canonical tags for one storefront category.
struct StorefrontCategory {
    key: &'static str,
    filter: &'static str,
    tags: &'static [&'static str],
}

const BAPE_CATEGORIES: &[StorefrontCategory] = &[
    StorefrontCategory {
        key: "mens",
        filter: "filter.p.m.bape_data.type=%E3%83%A1%E3%83%B3%E3%82%BA&filter.v.availability=1",
        tags: &["BAPE", "A BATHING APE", "男裝"],
    },
    StorefrontCategory {
        key: "womens",
        filter: "filter.p.m.bape_data.type=%E3%83%AC%E3%83%87%E3%82%A3%E3%83%BC%E3%82%B9&filter.v.availability=1",
        tags: &["BAPE", "A BATHING APE", "女裝"],
    },
    StorefrontCategory {
        key: "kids",
        filter: "filter.p.m.bape_data.type=%E3%82%AD%E3%83%83%E3%82%BA&filter.v.availability=1",
        tags: &["BAPE", "A BATHING APE", "童裝", "兒童"],
    },
];

const HUMANMADE_CATEGORIES: &[StorefrontCategory] = &[StorefrontCategory {
    key: "all",
    filter: "",
    tags: &["HUMAN MADE"],
}];

fn categories(vendor: Vendor) -> &'static [StorefrontCategory] {
    match vendor {
        Vendor::HumanMade => HUMANMADE_CATEGORIES,
        _ => BAPE_CATEGORIES,
    }
}

fn page_size(vendor: Vendor) -> usize {
    match vendor {
        Vendor::HumanMade => 250,
        _ => 50,
    }
}

pub(super) fn category_keys(vendor: Vendor) -> Vec<&'static str> {
    categories(vendor).iter().map(|c| c.key).collect()
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<StorefrontProduct>,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    product: StorefrontProduct,
}

#[derive(Debug, Deserialize)]
struct StorefrontProduct {
    handle: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body_html: Option<String>,
    #[serde(default)]
    options: Vec<StorefrontOption>,
    #[serde(default)]
    images: Vec<StorefrontImage>,
    #[serde(default)]
    variants: Vec<StorefrontVariant>,
}

/// Product-level option. The admin feed returns objects, the public feed
/// sometimes returns bare names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StorefrontOption {
    Named { name: String },
    Bare(String),
}

impl StorefrontOption {
    fn name(&self) -> &str {
        match self {
            Self::Named { name } | Self::Bare(name) => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StorefrontVariant {
    id: i64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    price: Option<serde_json::Value>,
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    option1: Option<String>,
    #[serde(default)]
    option2: Option<String>,
    #[serde(default)]
    option3: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorefrontImage {
    src: String,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    variant_ids: Vec<i64>,
}

/// Missing `available` means the theme predates the field; treat as sellable.
fn default_available() -> bool {
    true
}

pub(super) async fn list_page(
    session: &VendorSession,
    base: &str,
    vendor: Vendor,
    category: &str,
    page: u32,
) -> Result<ListingPage, VendorError> {
    let cat = categories(vendor)
        .iter()
        .find(|c| c.key == category)
        .ok_or_else(|| VendorError::UnknownCategory {
            vendor: vendor.tag().to_owned(),
            category: category.to_owned(),
        })?;

    let limit = page_size(vendor);
    let mut url = format!("{base}/collections/all/products.json?");
    if !cat.filter.is_empty() {
        url.push_str(cat.filter);
        url.push('&');
    }
    url.push_str(&format!("page={page}&limit={limit}"));

    let body: ProductsResponse = session.get_json(&url).await?;
    let has_more = body.products.len() >= limit;
    let tags: Vec<String> = cat.tags.iter().map(|t| (*t).to_owned()).collect();
    let items = body
        .products
        .into_iter()
        .map(|p| Listing::Complete(Box::new(to_raw(base, p, &tags))))
        .collect();
    Ok(ListingPage { items, has_more })
}

/// Fetches one product through its `.json` detail endpoint.
pub(super) async fn fetch_detail(
    session: &VendorSession,
    base: &str,
    url: &str,
    tags: &[String],
) -> Result<RawProduct, VendorError> {
    let json_url = format!("{}.json", url.trim_end_matches('/').trim_end_matches(".json"));
    let body: ProductResponse = session.get_json(&json_url).await?;
    Ok(to_raw(base, body.product, tags))
}

fn to_raw(base: &str, product: StorefrontProduct, tags: &[String]) -> RawProduct {
    let option_names: Vec<String> = product
        .options
        .iter()
        .map(|o| o.name().to_owned())
        .collect();

    let variants = product
        .variants
        .iter()
        .map(|v| {
            let values = [&v.option1, &v.option2, &v.option3];
            let options = values
                .iter()
                .enumerate()
                .filter_map(|(i, value)| {
                    let value = value.as_deref()?.trim();
                    if value.is_empty() || value.eq_ignore_ascii_case("Default Title") {
                        return None;
                    }
                    let name = option_names
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("option{}", i + 1));
                    Some((name, value.to_owned()))
                })
                .collect();
            let image_index = product
                .images
                .iter()
                .position(|img| img.variant_ids.contains(&v.id));
            RawVariant {
                options,
                sku: v.sku.clone().filter(|s| !s.trim().is_empty()),
                price: v.price.as_ref().and_then(price_text),
                available: v.available,
                image_index,
            }
        })
        .collect();

    let images = product
        .images
        .into_iter()
        .map(|img| ImageDescriptor {
            url: img.src,
            alt: img.alt.filter(|a| !a.trim().is_empty()),
        })
        .collect();

    RawProduct {
        source_url: format!("{base}/products/{}", product.handle),
        source_id: product.handle,
        title: product.title,
        description: product.body_html.unwrap_or_default(),
        images,
        variants,
        tags: tags.to_vec(),
    }
}

/// Prices arrive as `"12100.00"` on the public feed and as integers on
/// some admin-flavoured themes.
fn price_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
