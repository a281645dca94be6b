//! Onitsuka Tiger: a commerce GraphQL endpoint returning whole products,
//! including configurable variants and their stock status.

use std::collections::HashMap;

use jpsync_core::{ImageDescriptor, Vendor};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};
use serde::Deserialize;

use crate::error::VendorError;
use crate::raw::{Listing, ListingPage, RawProduct, RawVariant};
use crate::session::VendorSession;

const PAGE_SIZE: u32 = 48;
const SIZE_CODES: &[&str] = &["size", "shoe_size", "clothing_size"];

/// `(key, category url_path, tags)`.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    ("men", "store/men", &["Onitsuka Tiger", "男裝"]),
    ("women", "store/women", &["Onitsuka Tiger", "女裝"]),
];

pub(super) fn category_keys() -> Vec<&'static str> {
    CATEGORIES.iter().map(|c| c.0).collect()
}

const CATEGORY_TREE_QUERY: &str = r"{
  categories(filters: {}, pageSize: 50, currentPage: 1) {
    items {
      uid url_path
      children { uid url_path children { uid url_path } }
    }
  }
}";

fn products_query(uid: &str, page: u32) -> String {
    format!(
        r#"{{
  products(filter: {{ category_uid: {{ eq: "{uid}" }} }}, pageSize: {PAGE_SIZE}, currentPage: {page}, sort: {{ position: ASC }}) {{
    items {{
      sku name url_key stock_status
      price_range {{ minimum_price {{ regular_price {{ value }} final_price {{ value }} }} }}
      image {{ url label }}
      media_gallery {{ url label position }}
      description {{ html }}
      ... on ConfigurableProduct {{
        variants {{
          product {{ sku stock_status }}
          attributes {{ code label }}
        }}
      }}
    }}
    page_info {{ current_page total_pages }}
  }}
}}"#
    )
}

#[derive(Debug, Deserialize)]
struct CategoriesData {
    categories: CategoryList,
}

#[derive(Debug, Deserialize)]
struct CategoryList {
    #[serde(default)]
    items: Vec<CategoryNode>,
}

#[derive(Debug, Deserialize)]
struct CategoryNode {
    uid: String,
    #[serde(default)]
    url_path: Option<String>,
    #[serde(default)]
    children: Vec<CategoryNode>,
}

fn find_uid<'a>(nodes: &'a [CategoryNode], path: &str) -> Option<&'a str> {
    nodes.iter().find_map(|node| {
        if node.url_path.as_deref() == Some(path) {
            Some(node.uid.as_str())
        } else {
            find_uid(&node.children, path)
        }
    })
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: ProductPage,
}

#[derive(Debug, Deserialize)]
struct ProductPage {
    #[serde(default)]
    items: Vec<GqlProduct>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    current_page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct GqlProduct {
    sku: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url_key: Option<String>,
    #[serde(default)]
    stock_status: Option<String>,
    #[serde(default)]
    price_range: Option<PriceRange>,
    #[serde(default)]
    image: Option<GqlImage>,
    #[serde(default)]
    media_gallery: Vec<GqlImage>,
    #[serde(default)]
    description: Option<HtmlField>,
    #[serde(default)]
    variants: Vec<GqlVariant>,
}

#[derive(Debug, Deserialize)]
struct PriceRange {
    minimum_price: MinimumPrice,
}

#[derive(Debug, Deserialize)]
struct MinimumPrice {
    #[serde(default)]
    regular_price: Option<Money>,
    #[serde(default)]
    final_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
struct Money {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GqlImage {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    position: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct HtmlField {
    #[serde(default)]
    html: String,
}

#[derive(Debug, Deserialize)]
struct GqlVariant {
    product: VariantProduct,
    #[serde(default)]
    attributes: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
struct VariantProduct {
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    stock_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Attribute {
    #[serde(default)]
    code: String,
    #[serde(default)]
    label: String,
}

fn in_stock(status: Option<&str>) -> bool {
    status == Some("IN_STOCK")
}

/// Category uid cache, resolved on first use.
#[derive(Debug, Default)]
pub struct OnitsukaState {
    uids: HashMap<&'static str, String>,
}

impl OnitsukaState {
    fn headers(base: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("store"), HeaderValue::from_static("default"));
        if let Ok(referer) = HeaderValue::from_str(&format!("{base}/jp/ja-jp/")) {
            headers.insert(REFERER, referer);
        }
        if let Ok(origin) = HeaderValue::from_str(base) {
            headers.insert(ORIGIN, origin);
        }
        headers
    }

    async fn resolve_uid(
        &mut self,
        session: &VendorSession,
        base: &str,
        key: &'static str,
        path: &str,
    ) -> Result<String, VendorError> {
        if let Some(uid) = self.uids.get(key) {
            return Ok(uid.clone());
        }
        let endpoint = format!("{base}/jp/ja-jp/graphql");
        let data: CategoriesData = session
            .post_graphql(&endpoint, &Self::headers(base), CATEGORY_TREE_QUERY)
            .await?;
        for &(k, p, _) in CATEGORIES {
            if let Some(uid) = find_uid(&data.categories.items, p) {
                self.uids.insert(k, uid.to_owned());
            }
        }
        self.uids.get(key).cloned().ok_or_else(|| VendorError::GraphQl {
            url: endpoint,
            message: format!("no category with url_path `{path}`"),
        })
    }

    pub(super) async fn list_page(
        &mut self,
        session: &VendorSession,
        base: &str,
        category: &str,
        page: u32,
    ) -> Result<ListingPage, VendorError> {
        let &(key, path, tags) = CATEGORIES
            .iter()
            .find(|c| c.0 == category)
            .ok_or_else(|| VendorError::UnknownCategory {
                vendor: Vendor::Onitsuka.tag().to_owned(),
                category: category.to_owned(),
            })?;
        let uid = self.resolve_uid(session, base, key, path).await?;

        let endpoint = format!("{base}/jp/ja-jp/graphql");
        let data: ProductsData = session
            .post_graphql(&endpoint, &Self::headers(base), &products_query(&uid, page))
            .await?;

        let has_more = data
            .products
            .page_info
            .as_ref()
            .is_some_and(|info| info.current_page.max(page) < info.total_pages);
        let tags: Vec<String> = tags.iter().map(|t| (*t).to_owned()).collect();
        let items = data
            .products
            .items
            .into_iter()
            .filter(|p| !p.sku.trim().is_empty())
            .map(|p| Listing::Complete(Box::new(to_raw(base, p, &tags))))
            .collect();
        Ok(ListingPage { items, has_more })
    }
}

fn to_raw(base: &str, product: GqlProduct, tags: &[String]) -> RawProduct {
    let price = product.price_range.as_ref().and_then(|range| {
        let final_price = range.minimum_price.final_price.as_ref().and_then(|m| m.value);
        let regular = range.minimum_price.regular_price.as_ref().and_then(|m| m.value);
        final_price.filter(|v| *v > 0.0).or(regular).map(|v| v.to_string())
    });

    let variants: Vec<RawVariant> = if product.variants.is_empty() {
        vec![RawVariant {
            options: Vec::new(),
            sku: Some(product.sku.clone()),
            price: price.clone(),
            available: in_stock(product.stock_status.as_deref()),
            image_index: None,
        }]
    } else {
        product
            .variants
            .iter()
            .filter_map(|v| {
                let size = v
                    .attributes
                    .iter()
                    .find(|a| SIZE_CODES.contains(&a.code.to_ascii_lowercase().as_str()))
                    .or_else(|| v.attributes.first())?;
                Some(RawVariant {
                    options: vec![("size".to_owned(), size.label.clone())],
                    sku: v.product.sku.clone(),
                    price: price.clone(),
                    available: in_stock(v.product.stock_status.as_deref()),
                    image_index: None,
                })
            })
            .collect()
    };

    let mut gallery = product.media_gallery;
    gallery.sort_by_key(|m| m.position.unwrap_or(99));
    let mut images: Vec<ImageDescriptor> = gallery
        .into_iter()
        .filter_map(|m| {
            Some(ImageDescriptor {
                url: m.url?,
                alt: m.label,
            })
        })
        .collect();
    if images.is_empty() {
        if let Some(image) = product.image {
            if let Some(url) = image.url {
                images.push(ImageDescriptor {
                    url,
                    alt: image.label,
                });
            }
        }
    }

    let source_url = product
        .url_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map_or_else(
            || format!("{base}/jp/ja-jp/"),
            |k| format!("{base}/jp/ja-jp/{k}.html"),
        );

    RawProduct {
        source_id: product.sku,
        source_url,
        title: product.name,
        description: product.description.map(|d| d.html).unwrap_or_default(),
        images,
        variants,
        tags: tags.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_lookup_walks_children() {
        let data: CategoriesData = serde_json::from_str(
            r#"{"categories":{"items":[{"uid":"root","url_path":null,"children":[
                {"uid":"MTI=","url_path":"store","children":[
                    {"uid":"MTM=","url_path":"store/men"},
                    {"uid":"MTQ=","url_path":"store/women"}
                ]}
            ]}]}}"#,
        )
        .unwrap();
        assert_eq!(find_uid(&data.categories.items, "store/men"), Some("MTM="));
        assert_eq!(find_uid(&data.categories.items, "store/kids"), None);
    }

    #[test]
    fn configurable_product_maps_size_variants() {
        let product: GqlProduct = serde_json::from_str(
            r#"{
                "sku": "1183A201_100",
                "name": "MEXICO 66",
                "url_key": "mexico-66",
                "stock_status": "IN_STOCK",
                "price_range": {"minimum_price": {"regular_price": {"value": 14300}, "final_price": {"value": 14300}}},
                "media_gallery": [
                    {"url": "https://cdn.example/b.jpg", "position": 2},
                    {"url": "https://cdn.example/a.jpg", "position": 1}
                ],
                "description": {"html": "<p>定番モデル</p>"},
                "variants": [
                    {"product": {"sku": "1183A201_100_230", "stock_status": "IN_STOCK"},
                     "attributes": [{"code": "color", "label": "WHITE"}, {"code": "shoe_size", "label": "23.0"}]},
                    {"product": {"sku": "1183A201_100_240", "stock_status": "OUT_OF_STOCK"},
                     "attributes": [{"code": "shoe_size", "label": "24.0"}]}
                ]
            }"#,
        )
        .unwrap();
        let raw = to_raw("https://www.onitsukatiger.com", product, &[]);
        assert_eq!(raw.source_id, "1183A201_100");
        assert_eq!(raw.source_url, "https://www.onitsukatiger.com/jp/ja-jp/mexico-66.html");
        assert_eq!(raw.variants.len(), 2);
        assert_eq!(raw.variants[0].options, vec![("size".to_owned(), "23.0".to_owned())]);
        assert!(raw.variants[0].available);
        assert!(!raw.variants[1].available);
        assert_eq!(raw.variants[0].price.as_deref(), Some("14300"));
        assert_eq!(raw.images[0].url, "https://cdn.example/a.jpg");
    }

    #[test]
    fn simple_product_becomes_single_variant() {
        let product: GqlProduct = serde_json::from_str(
            r#"{"sku": "3183A001_001", "name": "TOTE", "stock_status": "OUT_OF_STOCK",
                "image": {"url": "https://cdn.example/tote.jpg", "label": "tote"}}"#,
        )
        .unwrap();
        let raw = to_raw("https://www.onitsukatiger.com", product, &[]);
        assert_eq!(raw.variants.len(), 1);
        assert!(!raw.variants[0].available);
        assert!(raw.variants[0].price.is_none());
        assert_eq!(raw.images[0].alt.as_deref(), Some("tote"));
    }
}
