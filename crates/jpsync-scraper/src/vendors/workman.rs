//! WORKMAN: server-rendered category pages linking to `/shop/g/` detail
//! pages. Colors, sizes and images are scraped from the detail page.

use std::collections::HashSet;
use std::sync::LazyLock;

use jpsync_core::{ImageDescriptor, StockVerdict, Vendor};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::VendorError;
use crate::html::{absolutize, dd_for_dt, first_text, sel, text_of};
use crate::raw::{Listing, ListingPage, RawProduct, RawVariant};
use crate::session::VendorSession;
use crate::stock::classify;

const DEFAULT_COLOR: &str = "標準";
const DEFAULT_SIZE: &str = "FREE";

struct WorkmanCategory {
    key: &'static str,
    code: &'static str,
    tags: &'static [&'static str],
}

const CATEGORIES: &[WorkmanCategory] = &[
    WorkmanCategory {
        key: "work",
        code: "c51",
        tags: &["WORKMAN", "作業服", "工作服"],
    },
    WorkmanCategory {
        key: "mens",
        code: "c52",
        tags: &["WORKMAN", "男裝"],
    },
    WorkmanCategory {
        key: "womens",
        code: "c53",
        tags: &["WORKMAN", "女裝"],
    },
    WorkmanCategory {
        key: "kids",
        code: "c54",
        tags: &["WORKMAN", "兒童", "童裝"],
    },
];

static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_p(\d+)/").expect("valid regex"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/g/g(\d+)/").expect("valid regex"));

static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a[href]"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("h1.block-goods-name"));
static ANY_H1: LazyLock<Selector> = LazyLock::new(|| sel("h1"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| sel("p.block-goods-price"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| sel("dl.block-goods-comment1 dd.js-goods-tabContents"));
static SPEC_TABLE: LazyLock<Selector> =
    LazyLock::new(|| sel("dl.block-goods-comment2 dd.js-goods-tabContents table"));
static COLOR_NAME: LazyLock<Selector> = LazyLock::new(|| {
    sel("li.block-goods-gallery--color-variation-src p.block-goods-detail--color-variation-goods-color-name")
});
static SLIDER_IMG: LazyLock<Selector> =
    LazyLock::new(|| sel("div.js-goods-detail-goods-slider img.js-zoom"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| sel("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| sel("tr"));
static TH: LazyLock<Selector> = LazyLock::new(|| sel("th"));

pub(super) fn category_keys() -> Vec<&'static str> {
    CATEGORIES.iter().map(|c| c.key).collect()
}

fn category(key: &str) -> Result<&'static WorkmanCategory, VendorError> {
    CATEGORIES
        .iter()
        .find(|c| c.key == key)
        .ok_or_else(|| VendorError::UnknownCategory {
            vendor: Vendor::Workman.tag().to_owned(),
            category: key.to_owned(),
        })
}

fn page_url(base: &str, code: &str, page: u32) -> String {
    if page <= 1 {
        format!("{base}/shop/c/{code}/")
    } else {
        format!("{base}/shop/c/{code}_p{page}/")
    }
}

pub(super) async fn list_page(
    session: &VendorSession,
    base: &str,
    category_key: &str,
    page: u32,
) -> Result<ListingPage, VendorError> {
    let cat = category(category_key)?;
    let url = page_url(base, cat.code, page);
    let body = session.get_text(&url).await?;
    let tags: Vec<String> = cat.tags.iter().map(|t| (*t).to_owned()).collect();
    Ok(parse_listing(base, &url, &body, page, &tags))
}

fn parse_listing(base: &str, page_url: &str, body: &str, page: u32, tags: &[String]) -> ListingPage {
    let doc = Html::parse_document(body);
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let mut last_page = page;

    for a in doc.select(&LINK) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if let Some(n) = PAGE_RE
            .captures(href)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            last_page = last_page.max(n);
        }
        if !href.contains("/shop/g/") {
            continue;
        }
        let Some(url) = absolutize(page_url, href).or_else(|| absolutize(base, href)) else {
            continue;
        };
        if seen.insert(url.clone()) {
            items.push(Listing::Detail {
                url,
                tags: tags.to_vec(),
            });
        }
    }

    ListingPage {
        has_more: page < last_page,
        items,
    }
}

pub(super) async fn fetch_detail(
    session: &VendorSession,
    base: &str,
    url: &str,
    tags: &[String],
) -> Result<RawProduct, VendorError> {
    let body = session.get_text(url).await?;
    parse_detail(base, url, &body, tags)
}

fn parse_detail(base: &str, url: &str, body: &str, tags: &[String]) -> Result<RawProduct, VendorError> {
    let doc = Html::parse_document(body);

    let code = dd_for_dt(&doc, "管理番号")
        .map(text_of)
        .filter(|c| !c.is_empty())
        .or_else(|| {
            CODE_RE
                .captures(url)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_owned())
        })
        .ok_or_else(|| VendorError::MalformedSource {
            source_product_id: url.to_owned(),
            reason: "no 管理番号 on page or in URL".to_owned(),
        })?;

    let title = first_text(&doc, &TITLE)
        .or_else(|| first_text(&doc, &ANY_H1))
        .unwrap_or_default();
    let price = first_text(&doc, &PRICE);

    let mut description = doc
        .select(&DESCRIPTION)
        .next()
        .map(description_html)
        .unwrap_or_default();
    if let Some(table) = doc.select(&SPEC_TABLE).next() {
        if !description.is_empty() {
            description.push('\n');
        }
        description.push_str(&table.html());
    }

    let mut colors: Vec<String> = Vec::new();
    for name in doc.select(&COLOR_NAME).map(text_of) {
        if !name.is_empty() && !colors.contains(&name) {
            colors.push(name);
        }
    }
    if colors.is_empty() {
        colors.push(DEFAULT_COLOR.to_owned());
    }

    let mut sizes = size_headers(&doc);
    if sizes.is_empty() {
        sizes.push(DEFAULT_SIZE.to_owned());
    }

    let images = images(&doc, base, &code);

    let keywords = Vendor::Workman.default_stock_keywords();
    let available = matches!(classify(200, body, &keywords), StockVerdict::Available);

    let mut variants = Vec::with_capacity(colors.len() * sizes.len());
    for color in &colors {
        for size in &sizes {
            variants.push(RawVariant {
                options: vec![
                    ("color".to_owned(), color.clone()),
                    ("size".to_owned(), size.clone()),
                ],
                sku: None,
                price: price.clone(),
                available,
                image_index: None,
            });
        }
    }

    Ok(RawProduct {
        source_id: code,
        source_url: url.to_owned(),
        title,
        description,
        images,
        variants,
        tags: tags.to_vec(),
    })
}

/// Paragraph and div children of the description block, as HTML.
fn description_html(dd: ElementRef<'_>) -> String {
    dd.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "p" | "div"))
        .filter(|el| !text_of(*el).is_empty())
        .map(|el| el.html())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Size names are the header cells of the size table's first row, skipping
/// the corner cell.
fn size_headers(doc: &Html) -> Vec<String> {
    let Some(table) = dd_for_dt(doc, "サイズ・スペック").and_then(|dd| dd.select(&TABLE).next()) else {
        return Vec::new();
    };
    let Some(first_row) = table.select(&ROW).next() else {
        return Vec::new();
    };
    let mut sizes = Vec::new();
    for size in first_row.select(&TH).skip(1).map(text_of) {
        if !size.is_empty() && !sizes.contains(&size) {
            sizes.push(size);
        }
    }
    sizes
}

/// Slider images, main (`_t1`) shot first. Falls back to the CDN path
/// derived from the item code.
fn images(doc: &Html, base: &str, code: &str) -> Vec<ImageDescriptor> {
    let mut urls: Vec<String> = Vec::new();
    for img in doc.select(&SLIDER_IMG) {
        let Some(url) = img.value().attr("src").and_then(|src| absolutize(base, src)) else {
            continue;
        };
        if urls.contains(&url) {
            continue;
        }
        if url.contains("_t1.") {
            urls.insert(0, url);
        } else {
            urls.push(url);
        }
    }
    if urls.is_empty() {
        urls.push(format!("{base}/img/goods/L/{code}_t1.jpg"));
    }
    urls.into_iter()
        .map(|url| ImageDescriptor { url, alt: None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://workman.jp";

    #[test]
    fn page_urls_follow_suffix_scheme() {
        assert_eq!(page_url(BASE, "c52", 1), "https://workman.jp/shop/c/c52/");
        assert_eq!(page_url(BASE, "c52", 3), "https://workman.jp/shop/c/c52_p3/");
    }

    #[test]
    fn listing_collects_detail_links_and_last_page() {
        let body = r#"
            <a href="/shop/g/g2300068265020/">A</a>
            <a href="/shop/g/g2300068265020/">A again</a>
            <a href="https://workman.jp/shop/g/g2300011111111/">B</a>
            <a href="/shop/c/c52_p2/">2</a>
            <a href="/shop/c/c52_p7/">最後</a>
            <a href="/shop/pages/guide.aspx">guide</a>
        "#;
        let page = parse_listing(BASE, "https://workman.jp/shop/c/c52/", body, 1, &["WORKMAN".to_owned()]);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.items[0].dedupe_key(), "https://workman.jp/shop/g/g2300068265020/");

        let last = parse_listing(BASE, "https://workman.jp/shop/c/c52_p7/", body, 7, &[]);
        assert!(!last.has_more);
    }

    #[test]
    fn detail_builds_color_size_matrix() {
        let body = r#"
            <h1 class="block-goods-name">防水防寒ジャケット</h1>
            <p class="block-goods-price">2,900円(税込)</p>
            <dl><dt>管理番号</dt><dd>2300068265020</dd></dl>
            <dl class="block-goods-comment1"><dd class="js-goods-tabContents"><p>軽くて暖かい</p><p></p></dd></dl>
            <ul class="js-goods-detail-gallery-slider">
              <li class="block-goods-gallery--color-variation-src"><p class="block-goods-detail--color-variation-goods-color-name">ブラック</p></li>
              <li class="block-goods-gallery--color-variation-src"><p class="block-goods-detail--color-variation-goods-color-name">ネイビー</p></li>
            </ul>
            <dl><dt>サイズ・スペック</dt><dd><table><tr><th>サイズ</th><th>M</th><th>L</th></tr><tr><td>着丈</td><td>70</td><td>72</td></tr></table></dd></dl>
            <div class="js-goods-detail-goods-slider">
              <img class="js-zoom" src="/img/goods/L/2300068265020_t2.jpg">
              <img class="js-zoom" src="/img/goods/L/2300068265020_t1.jpg">
            </div>
            <button>カートに入れる</button>
        "#;
        let raw = parse_detail(BASE, "https://workman.jp/shop/g/g2300068265020/", body, &[]).unwrap();
        assert_eq!(raw.source_id, "2300068265020");
        assert_eq!(raw.title, "防水防寒ジャケット");
        assert_eq!(raw.description, "<p>軽くて暖かい</p>");
        assert_eq!(raw.variants.len(), 4);
        assert!(raw.variants.iter().all(|v| v.available));
        assert_eq!(raw.variants[0].price.as_deref(), Some("2,900円(税込)"));
        assert_eq!(
            raw.variants[1].options,
            vec![
                ("color".to_owned(), "ブラック".to_owned()),
                ("size".to_owned(), "L".to_owned())
            ]
        );
        assert!(raw.images[0].url.ends_with("_t1.jpg"));
    }

    #[test]
    fn detail_falls_back_to_url_code_and_defaults() {
        let body = "<h1>ソックス</h1><p class=\"block-goods-price\">580円</p><p>店舗在庫を確認する</p>";
        let raw = parse_detail(BASE, "https://workman.jp/shop/g/g4500000000001/", body, &[]).unwrap();
        assert_eq!(raw.source_id, "4500000000001");
        assert_eq!(raw.variants.len(), 1);
        assert_eq!(raw.variants[0].options[0].1, "標準");
        assert_eq!(raw.variants[0].options[1].1, "FREE");
        assert!(!raw.variants[0].available);
        assert_eq!(raw.images[0].url, "https://workman.jp/img/goods/L/4500000000001_t1.jpg");
    }

    #[test]
    fn detail_without_code_is_malformed() {
        let err = parse_detail(BASE, "https://workman.jp/shop/pages/x.aspx", "<h1>x</h1>", &[]).unwrap_err();
        assert!(matches!(err, VendorError::MalformedSource { .. }));
    }
}
