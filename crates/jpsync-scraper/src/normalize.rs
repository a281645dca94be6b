//! Normalization from [`RawProduct`] to the canonical [`ProductRecord`].

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use chrono::Utc;
use jpsync_core::{ImageDescriptor, ProductRecord, VariantRecord, Vendor};
use regex::Regex;

use crate::error::VendorError;
use crate::raw::{RawProduct, RawVariant};

/// Conventional token every one-size spelling collapses to.
pub const ONE_SIZE: &str = "ONE SIZE";

/// Images kept per product, in source order.
pub const MAX_IMAGES: usize = 10;

const ONE_SIZE_TOKENS: &[&str] = &[
    "free",
    "f",
    "one size",
    "onesize",
    "os",
    "o/s",
    "default title",
    "フリー",
    "フリーサイズ",
    "ワンサイズ",
];

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)(?:\.(\d+))?").expect("valid regex"));

/// Parses a yen price from vendor text: `"¥12,100"`, `"12100.00"`,
/// `"12,100円(税込)"`. Fractions are rounded half up.
#[must_use]
pub fn parse_price_jpy(text: &str) -> Option<i64> {
    let caps = PRICE_RE.captures(text)?;
    let whole: i64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let round_up = caps
        .get(2)
        .and_then(|f| f.as_str().chars().next())
        .and_then(|d| d.to_digit(10))
        .is_some_and(|d| d >= 5);
    Some(if round_up { whole + 1 } else { whole })
}

/// Maps vendor option labels onto `color` / `size`; anything else is lowercased.
#[must_use]
pub fn canonical_option_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "color" | "colour" | "カラー" | "色" | "colors" => "color".to_owned(),
        "size" | "サイズ" | "title" | "sizes" | "shoe_size" | "clothing_size" => "size".to_owned(),
        other => other.to_owned(),
    }
}

fn canonical_option_value(name: &str, raw: &str) -> String {
    let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name == "size" && is_one_size(&value) {
        return ONE_SIZE.to_owned();
    }
    value
}

fn is_one_size(value: &str) -> bool {
    let lower = value.to_lowercase();
    ONE_SIZE_TOKENS.contains(&lower.as_str())
}

/// Collapses a scraped product into a [`ProductRecord`].
///
/// Variants without a positive price, below `min_source_price`, or with an
/// empty option value are dropped. Duplicate option tuples keep the first
/// occurrence.
///
/// # Errors
///
/// Returns [`VendorError::MalformedSource`] when the product has no
/// source id or title, or when no variant survives.
pub fn normalize(
    vendor: Vendor,
    raw: RawProduct,
    min_source_price: i64,
) -> Result<ProductRecord, VendorError> {
    let source_id = raw.source_id.trim().to_owned();
    let malformed = |reason: String| VendorError::MalformedSource {
        source_product_id: if source_id.is_empty() {
            raw.source_url.clone()
        } else {
            source_id.clone()
        },
        reason,
    };

    if source_id.is_empty() {
        return Err(malformed("missing source id".to_owned()));
    }
    let title = raw.title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Err(malformed("missing title".to_owned()));
    }

    let images = normalize_images(&raw.images);

    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut option_names: Option<Vec<String>> = None;
    let mut variants = Vec::with_capacity(raw.variants.len());
    let mut dropped = 0usize;

    for variant in &raw.variants {
        let Some(record) = normalize_variant(variant, min_source_price, images.len()) else {
            dropped += 1;
            continue;
        };
        let names: Vec<String> = record.option_values.iter().map(|(k, _)| k.clone()).collect();
        match &option_names {
            None => option_names = Some(names),
            Some(expected) if *expected != names => {
                dropped += 1;
                continue;
            }
            Some(_) => {}
        }
        if !seen.insert(record.option_key()) {
            tracing::debug!(
                vendor = %vendor,
                source_id = %source_id,
                options = %record.title(),
                "duplicate option tuple dropped"
            );
            continue;
        }
        variants.push(record);
    }

    if variants.is_empty() {
        return Err(malformed(format!(
            "no usable variant ({dropped} dropped, minimum price ¥{min_source_price})"
        )));
    }

    let mut categories: BTreeSet<String> = raw
        .tags
        .iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect();
    categories.insert(vendor.brand().to_owned());

    Ok(ProductRecord {
        source_id,
        source_url: raw.source_url.trim().to_owned(),
        vendor,
        title_src: title,
        title_tgt: None,
        description_src: raw.description.trim().to_owned(),
        description_tgt: None,
        images,
        variants,
        categories,
        fetched_at: Utc::now(),
    })
}

fn normalize_images(images: &[ImageDescriptor]) -> Vec<ImageDescriptor> {
    let mut seen = HashSet::new();
    images
        .iter()
        .filter(|img| !img.url.trim().is_empty())
        .filter(|img| seen.insert(img.url.trim().to_owned()))
        .take(MAX_IMAGES)
        .map(|img| ImageDescriptor {
            url: absolutize_protocol(img.url.trim()),
            alt: img.alt.clone().filter(|a| !a.trim().is_empty()),
        })
        .collect()
}

/// CDN image URLs are often protocol-relative (`//cdn.shopify.com/...`).
fn absolutize_protocol(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_owned()
    }
}

fn normalize_variant(
    variant: &RawVariant,
    min_source_price: i64,
    image_count: usize,
) -> Option<VariantRecord> {
    let source_price = variant.price.as_deref().and_then(parse_price_jpy)?;
    if source_price <= 0 || source_price < min_source_price {
        return None;
    }

    let option_values: Vec<(String, String)> = if variant.options.is_empty() {
        vec![("size".to_owned(), ONE_SIZE.to_owned())]
    } else {
        let mut values = Vec::with_capacity(variant.options.len());
        for (name, value) in &variant.options {
            let name = canonical_option_name(name);
            let value = canonical_option_value(&name, value);
            if name.is_empty() || value.is_empty() {
                return None;
            }
            values.push((name, value));
        }
        values
    };

    Some(VariantRecord {
        option_values,
        sku: variant
            .sku
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        source_price,
        target_price: 0,
        available: variant.available,
        image_index: variant.image_index.filter(|&i| i < image_count),
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
