//! BEAMS: category pages filtered by `sex`, paginated with `p`. Item links
//! have the shape `/item/{label}/{type}/{code}/`.

use std::collections::HashSet;
use std::sync::LazyLock;

use jpsync_core::{ImageDescriptor, Vendor};
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::VendorError;
use crate::html::{absolutize, first_text, sel, text_of, visible_text};
use crate::raw::{Listing, ListingPage, RawProduct, RawVariant};
use crate::session::VendorSession;

const CDN_URL: &str = "https://cdn.beams.co.jp";

/// `(key, path, sex, type tag)`. `sex` is the listing filter: M, W or K.
const CATEGORIES: &[(&str, &str, char, &str)] = &[
    ("men_tshirt", "/category/t-shirt/", 'M', "T恤"),
    ("men_shirt", "/category/shirt/", 'M', "襯衫"),
    ("men_tops", "/category/tops/", 'M', "上衣"),
    ("men_jacket", "/category/jacket/", 'M', "外套"),
    ("men_blouson", "/category/blouson/", 'M', "夾克"),
    ("men_coat", "/category/coat/", 'M', "大衣"),
    ("men_pants", "/category/pants/", 'M', "褲子"),
    ("men_bag", "/category/bag/", 'M', "包包"),
    ("men_shoes", "/category/shoes/", 'M', "鞋子"),
    ("men_hat", "/category/hat/", 'M', "帽子"),
    ("men_accessory", "/category/accessory/", 'M', "飾品"),
    ("men_wallet", "/category/wallet/", 'M', "皮夾"),
    ("men_watch", "/category/watch/", 'M', "手錶"),
    ("women_tshirt", "/category/t-shirt/", 'W', "T恤"),
    ("women_shirt", "/category/shirt/", 'W', "襯衫"),
    ("women_tops", "/category/tops/", 'W', "上衣"),
    ("women_jacket", "/category/jacket/", 'W', "外套"),
    ("women_skirt", "/category/skirt/", 'W', "裙子"),
    ("women_onepiece", "/category/one-piece/", 'W', "洋裝"),
    ("women_pants", "/category/pants/", 'W', "褲子"),
    ("women_bag", "/category/bag/", 'W', "包包"),
    ("women_shoes", "/category/shoes/", 'W', "鞋子"),
    ("kids_tshirt", "/category/t-shirt/", 'K', "T恤"),
    ("kids_tops", "/category/tops/", 'K', "上衣"),
    ("kids_pants", "/category/pants/", 'K', "褲子"),
];

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/item/([^/]+)/([^/]+)/(\d+)").expect("valid regex"));
static YEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[¥￥]\s*([\d,]+)").expect("valid regex"));
static TITLE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[|｜].*$").expect("valid regex"));
static COLOR_SRC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_C_\d+").expect("valid regex"));
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(XXS|XS|S|M|L|XL|XXL|FREE|F|\d{2,3})$").expect("valid regex")
});
static CART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)カートへ入れる|ADD TO CART").expect("valid regex"));
static SOLD_OUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)品切れ|SOLD\s*OUT").expect("valid regex"));

static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a[href]"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("h1"));
static HEAD_TITLE: LazyLock<Selector> = LazyLock::new(|| sel("title"));
static IMG: LazyLock<Selector> = LazyLock::new(|| sel("img"));
static SIZE_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| sel("option, label, span"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    sel("div[class*='item-desc'], div[class*='item_desc'], div[class*='product-desc'], div[class*='detail']")
});

pub(super) fn category_keys() -> Vec<&'static str> {
    CATEGORIES.iter().map(|c| c.0).collect()
}

fn sex_tag(sex: char) -> &'static str {
    match sex {
        'W' => "女裝",
        'K' => "童裝",
        _ => "男裝",
    }
}

pub(super) async fn list_page(
    session: &VendorSession,
    base: &str,
    category_key: &str,
    page: u32,
) -> Result<ListingPage, VendorError> {
    let &(_, path, sex, type_tag) = CATEGORIES
        .iter()
        .find(|c| c.0 == category_key)
        .ok_or_else(|| VendorError::UnknownCategory {
            vendor: Vendor::Beams.tag().to_owned(),
            category: category_key.to_owned(),
        })?;

    let mut url = format!("{base}{path}?sex={sex}");
    if page > 1 {
        url.push_str(&format!("&p={page}"));
    }
    let body = session.get_text(&url).await?;
    let tags = vec![
        "BEAMS".to_owned(),
        sex_tag(sex).to_owned(),
        type_tag.to_owned(),
    ];
    Ok(parse_listing(base, &body, &tags))
}

fn parse_listing(base: &str, body: &str, tags: &[String]) -> ListingPage {
    let doc = Html::parse_document(body);
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for a in doc.select(&LINK) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Some(caps) = ITEM_RE.captures(href) else {
            continue;
        };
        let (label, code) = (&caps[1], &caps[3]);
        if !seen.insert(code.to_owned()) {
            continue;
        }
        let Some(url) = absolutize(base, &format!("/item/{label}/{}/{code}/", &caps[2])) else {
            continue;
        };
        let mut item_tags = tags.to_vec();
        let label = label.to_uppercase();
        if !item_tags.contains(&label) {
            item_tags.push(label);
        }
        items.push(Listing::Detail {
            url,
            tags: item_tags,
        });
    }

    // BEAMS exposes no page count; an empty page ends the category.
    ListingPage {
        has_more: !items.is_empty(),
        items,
    }
}

pub(super) async fn fetch_detail(
    session: &VendorSession,
    url: &str,
    tags: &[String],
) -> Result<RawProduct, VendorError> {
    let body = session.get_text(url).await?;
    parse_detail(url, &body, tags)
}

fn parse_detail(url: &str, body: &str, tags: &[String]) -> Result<RawProduct, VendorError> {
    let code = ITEM_RE
        .captures(url)
        .map(|c| c[3].to_owned())
        .ok_or_else(|| VendorError::MalformedSource {
            source_product_id: url.to_owned(),
            reason: "item code missing from URL".to_owned(),
        })?;

    let doc = Html::parse_document(body);
    let title = first_text(&doc, &TITLE)
        .or_else(|| first_text(&doc, &HEAD_TITLE))
        .map(|t| TITLE_SUFFIX_RE.replace(&t, "").into_owned())
        .unwrap_or_default();

    let text = visible_text(&doc);
    let price = YEN_RE.captures(&text).map(|c| c[1].to_owned());
    let available = CART_RE.is_match(&text) && !SOLD_OUT_RE.is_match(&text);

    let description = doc
        .select(&DESCRIPTION)
        .map(text_of)
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let mut colors: Vec<String> = Vec::new();
    let mut image_urls: Vec<String> = Vec::new();
    for img in doc.select(&IMG) {
        let attrs = img.value();
        let Some(src) = attrs.attr("src").or_else(|| attrs.attr("data-src")) else {
            continue;
        };
        if src.is_empty() || src.contains("svg") {
            continue;
        }
        if COLOR_SRC_RE.is_match(src) {
            if let Some(alt) = attrs.attr("alt").map(str::trim).filter(|a| !a.is_empty()) {
                if !colors.iter().any(|c| c == alt) {
                    colors.push(alt.to_owned());
                }
            }
        }
        if src.contains(code.as_str()) {
            let full = if src.starts_with("http") {
                src.to_owned()
            } else {
                format!("https:{src}")
            };
            let full = full.replace("/S1/", "/L1/").replace("/S2/", "/L1/");
            if !image_urls.contains(&full) {
                image_urls.push(full);
            }
        }
    }
    if image_urls.is_empty() {
        image_urls = ["C_1", "C_2", "C_3", "D_1", "D_2", "D_3"]
            .iter()
            .map(|suffix| format!("{CDN_URL}/img/goods/{code}/L1/{code}_{suffix}.jpg"))
            .collect();
    }

    let mut sizes: Vec<String> = Vec::new();
    for el in doc.select(&SIZE_CANDIDATES) {
        let value = text_of(el);
        if SIZE_RE.is_match(&value) {
            let value = value.to_uppercase();
            if !sizes.contains(&value) {
                sizes.push(value);
            }
        }
    }

    let variants = combine(&colors, &sizes)
        .into_iter()
        .map(|options| RawVariant {
            options,
            sku: None,
            price: price.clone(),
            available,
            image_index: None,
        })
        .collect();

    Ok(RawProduct {
        source_id: code,
        source_url: url.to_owned(),
        title,
        description,
        images: image_urls
            .into_iter()
            .map(|url| ImageDescriptor { url, alt: None })
            .collect(),
        variants,
        tags: tags.to_vec(),
    })
}

/// Color × size option combinations. Missing axes are left out so the
/// normalizer can apply its single-size default.
fn combine(colors: &[String], sizes: &[String]) -> Vec<Vec<(String, String)>> {
    match (colors.is_empty(), sizes.is_empty()) {
        (false, false) => colors
            .iter()
            .flat_map(|c| {
                sizes.iter().map(move |s| {
                    vec![("color".to_owned(), c.clone()), ("size".to_owned(), s.clone())]
                })
            })
            .collect(),
        (false, true) => colors
            .iter()
            .map(|c| vec![("color".to_owned(), c.clone())])
            .collect(),
        (true, false) => sizes
            .iter()
            .map(|s| vec![("size".to_owned(), s.clone())])
            .collect(),
        (true, true) => vec![Vec::new()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.beams.co.jp";

    #[test]
    fn listing_dedupes_by_item_code_and_strips_query() {
        let body = r#"
            <a href="/item/beams/t-shirt/11041456366/?color=10">A</a>
            <a href="/item/beams/t-shirt/11041456366/?color=20">A other color</a>
            <a href="/item/beamsplus/t-shirt/11041000001/">B</a>
            <a href="/news/">news</a>
        "#;
        let page = parse_listing(BASE, body, &["BEAMS".to_owned()]);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        let Listing::Detail { url, tags } = &page.items[1] else {
            panic!("expected detail listing");
        };
        assert_eq!(url, "https://www.beams.co.jp/item/beamsplus/t-shirt/11041000001/");
        assert!(tags.contains(&"BEAMSPLUS".to_owned()));
    }

    #[test]
    fn empty_listing_ends_category() {
        assert!(!parse_listing(BASE, "<p>該当する商品がありません</p>", &[]).has_more);
    }

    #[test]
    fn detail_extracts_title_price_colors_and_sizes() {
        let body = r#"
            <title>ポケット Tシャツ | BEAMS</title>
            <h1>ポケット Tシャツ ｜ BEAMS</h1>
            <p class="price">¥ 7,700 (税込)</p>
            <img src="//cdn.beams.co.jp/img/goods/11041456366/S1/11041456366_C_1.jpg" alt="WHITE">
            <img src="//cdn.beams.co.jp/img/goods/11041456366/S1/11041456366_C_2.jpg" alt="BLACK">
            <select><option>選択してください</option><option>S</option><option>M</option></select>
            <button>カートへ入れる</button>
        "#;
        let url = "https://www.beams.co.jp/item/beams/t-shirt/11041456366/";
        let raw = parse_detail(url, body, &[]).unwrap();
        assert_eq!(raw.source_id, "11041456366");
        assert_eq!(raw.title, "ポケット Tシャツ");
        assert_eq!(raw.variants.len(), 4);
        assert!(raw.variants.iter().all(|v| v.available));
        assert_eq!(raw.variants[0].price.as_deref(), Some("7,700"));
        assert_eq!(
            raw.images[0].url,
            "https://cdn.beams.co.jp/img/goods/11041456366/L1/11041456366_C_1.jpg"
        );
    }

    #[test]
    fn sold_out_detail_is_unavailable_with_cdn_fallback_images() {
        let body = "<h1>ニット</h1><p>¥12,100</p><p>SOLD OUT</p>";
        let url = "https://www.beams.co.jp/item/beams/knit/11150000001/";
        let raw = parse_detail(url, body, &[]).unwrap();
        assert!(!raw.variants[0].available);
        assert!(raw.variants[0].options.is_empty());
        assert_eq!(raw.images.len(), 6);
        assert!(raw.images[0].url.starts_with("https://cdn.beams.co.jp/img/goods/11150000001/L1/"));
    }
}
