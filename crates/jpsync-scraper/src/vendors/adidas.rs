//! adidas: listing and detail pages only render in a browser. Pages are
//! loaded through a WebDriver session opened on first use and parsed from
//! the rendered DOM.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use jpsync_core::{ImageDescriptor, Vendor};
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::VendorError;
use crate::html::{absolutize, first_text, sel, text_of};
use crate::raw::{Listing, ListingPage, RawProduct, RawVariant};
use crate::webdriver::WebDriverSession;

const PAGE_SIZE: u32 = 48;
const UNAVAILABLE_LABEL: &str = "ご購入いただけません";

/// `(key, percent-encoded listing path, tags)`.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "men_originals",
        "/%E3%83%A1%E3%83%B3%E3%82%BA-%E3%82%B7%E3%83%A5%E3%83%BC%E3%82%BA%E3%83%BB%E9%9D%B4-%E3%82%AA%E3%83%AA%E3%82%B8%E3%83%8A%E3%83%AB%E3%82%B9",
        &["adidas", "Originals", "男鞋"],
    ),
    (
        "women_originals",
        "/%E3%83%AC%E3%83%87%E3%82%A3%E3%83%BC%E3%82%B9-%E3%82%B7%E3%83%A5%E3%83%BC%E3%82%BA%E3%83%BB%E9%9D%B4-%E3%82%AA%E3%83%AA%E3%82%B8%E3%83%8A%E3%83%AB%E3%82%B9",
        &["adidas", "Originals", "女鞋"],
    ),
];

static SKU_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([A-Z0-9]{5,10})\.html").expect("valid regex"));
static ASSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://assets\.adidas\.com/images/h_(?:2000|840)[^"'>\s]+\.jpg"#).expect("valid regex")
});

static CARD: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-testid="plp-product-card"]"#));
static CARD_LINK: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[data-testid="product-card-image-link"]"#));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"h1[data-auto-id="product-title"], h1"#));
static PRICE: LazyLock<Selector> = LazyLock::new(|| sel(r#"[data-testid="main-price"] span"#));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"[data-testid="product-description"], [class*="description_description"]"#)
});
static SPECS: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"[data-testid="specifications-section"] li, [data-auto-id="specifications-section"] li"#)
});
static HIRES: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"img[data-testid="pdp__image-viewer__desktop-zoom__hi-res-image"]"#));
static SIZE_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[data-auto-id="size-selector"] button[role="radio"]"#));
static COLOR_LABEL: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[data-auto-id="color-label"], [data-testid="color-label"]"#));

pub(super) fn category_keys() -> Vec<&'static str> {
    CATEGORIES.iter().map(|c| c.0).collect()
}

/// Browser session state for one adidas run.
pub struct AdidasState {
    webdriver_url: String,
    user_agent: String,
    timeout: Duration,
    render_wait: Duration,
    browser: Option<WebDriverSession>,
}

impl AdidasState {
    pub(super) fn new(
        webdriver_url: String,
        user_agent: String,
        timeout: Duration,
        render_wait: Duration,
    ) -> Self {
        Self {
            webdriver_url,
            user_agent,
            timeout,
            render_wait,
            browser: None,
        }
    }

    async fn browser(&mut self) -> Result<&WebDriverSession, VendorError> {
        if self.browser.is_none() {
            let session = WebDriverSession::start(
                &self.webdriver_url,
                &self.user_agent,
                self.timeout,
                self.render_wait,
            )
            .await?;
            self.browser = Some(session);
        }
        self.browser.as_ref().ok_or_else(|| VendorError::Browser {
            reason: "browser session unavailable".to_owned(),
        })
    }

    /// Loads `url` in the browser. A driver-side failure (crashed tab, dead
    /// session) restarts the browser once before giving up.
    async fn render(&mut self, url: &str) -> Result<String, VendorError> {
        let first = self.browser().await?.page_source(url).await;
        match first {
            Ok(html) => Ok(html),
            Err(VendorError::Browser { reason }) => {
                tracing::warn!(url, reason = %reason, "browser failed, restarting session");
                self.close().await;
                self.browser().await?.page_source(url).await
            }
            Err(e) => Err(e),
        }
    }

    pub(super) async fn list_page(
        &mut self,
        base: &str,
        category: &str,
        page: u32,
    ) -> Result<ListingPage, VendorError> {
        let &(_, path, tags) = CATEGORIES
            .iter()
            .find(|c| c.0 == category)
            .ok_or_else(|| VendorError::UnknownCategory {
                vendor: Vendor::Adidas.tag().to_owned(),
                category: category.to_owned(),
            })?;
        let start = page.saturating_sub(1) * PAGE_SIZE;
        let url = format!("{base}{path}?start={start}");
        let html = self.render(&url).await?;
        let tags: Vec<String> = tags.iter().map(|t| (*t).to_owned()).collect();
        Ok(parse_listing(base, &html, &tags))
    }

    pub(super) async fn fetch_detail(&mut self, url: &str, tags: &[String]) -> Result<RawProduct, VendorError> {
        let html = self.render(url).await?;
        parse_detail(url, &html, tags)
    }

    pub(super) async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            browser.close().await;
        }
    }
}

fn parse_listing(base: &str, html: &str, tags: &[String]) -> ListingPage {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let mut cards = 0usize;
    for card in doc.select(&CARD) {
        cards += 1;
        let Some(href) = card
            .select(&CARD_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        if !SKU_RE.is_match(href) {
            continue;
        }
        let Some(url) = absolutize(base, href) else {
            continue;
        };
        let url = url.split('?').next().unwrap_or(&url).to_owned();
        if seen.insert(url.clone()) {
            items.push(Listing::Detail {
                url,
                tags: tags.to_vec(),
            });
        }
    }
    ListingPage {
        has_more: cards >= PAGE_SIZE as usize,
        items,
    }
}

fn parse_detail(url: &str, html: &str, tags: &[String]) -> Result<RawProduct, VendorError> {
    let sku = SKU_RE
        .captures(url)
        .map(|c| c[1].to_owned())
        .ok_or_else(|| VendorError::MalformedSource {
            source_product_id: url.to_owned(),
            reason: "article number missing from URL".to_owned(),
        })?;
    let doc = Html::parse_document(html);

    let title = first_text(&doc, &TITLE).unwrap_or_default();
    let price = doc
        .select(&PRICE)
        .map(text_of)
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .last();

    let mut description = first_text(&doc, &DESCRIPTION)
        .map(|d| format!("<p>{d}</p>"))
        .unwrap_or_default();
    let specs: Vec<String> = doc
        .select(&SPECS)
        .map(text_of)
        .filter(|s| !s.is_empty())
        .map(|s| format!("<li>{s}</li>"))
        .collect();
    if !specs.is_empty() {
        description.push_str(&format!("<ul>{}</ul>", specs.concat()));
    }

    let mut image_urls: Vec<String> = Vec::new();
    for img in doc.select(&HIRES) {
        if let Some(src) = img.value().attr("src") {
            if src.contains(sku.as_str()) && !image_urls.iter().any(|u| u == src) {
                image_urls.push(src.to_owned());
            }
        }
    }
    if image_urls.is_empty() {
        for m in ASSET_RE.find_iter(html) {
            let src = m.as_str();
            if src.contains(sku.as_str()) && !image_urls.iter().any(|u| u == src) {
                image_urls.push(src.to_owned());
            }
        }
    }

    let color = first_text(&doc, &COLOR_LABEL);
    let variants = doc
        .select(&SIZE_BUTTON)
        .filter_map(|button| {
            let size = text_of(button);
            if size.is_empty() {
                return None;
            }
            let attrs = button.value();
            let unavailable = attrs.attr("class").is_some_and(|c| c.contains("unavailable"))
                || attrs
                    .attr("aria-label")
                    .is_some_and(|l| l.contains(UNAVAILABLE_LABEL));
            let mut options = Vec::with_capacity(2);
            if let Some(color) = &color {
                options.push(("color".to_owned(), color.clone()));
            }
            options.push(("size".to_owned(), size));
            Some(RawVariant {
                options,
                sku: None,
                price: price.clone(),
                available: !unavailable,
                image_index: None,
            })
        })
        .collect();

    Ok(RawProduct {
        source_id: sku,
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

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.adidas.jp";

    #[test]
    fn listing_reads_product_cards() {
        let html = r#"
            <div data-testid="plp-product-card"><a data-testid="product-card-image-link" href="/サンバ-og-samba-og/B75806.html?pr=1">x</a></div>
            <div data-testid="plp-product-card"><a data-testid="product-card-image-link" href="/gazelle/BB5476.html">y</a></div>
            <div data-testid="plp-product-card"><a data-testid="product-card-image-link" href="/help">z</a></div>
        "#;
        let page = parse_listing(BASE, html, &["adidas".to_owned()]);
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
        assert!(page.items[0].dedupe_key().ends_with("/B75806.html"));
    }

    #[test]
    fn detail_reads_sizes_and_availability() {
        let html = r#"
            <h1 data-auto-id="product-title">サンバ OG / Samba OG</h1>
            <div data-testid="main-price"><span>価格</span><span>¥16,500</span></div>
            <div data-auto-id="color-label">コアブラック</div>
            <div data-testid="product-description">定番のインドアシューズ</div>
            <div data-testid="specifications-section"><ul><li>レギュラーフィット</li><li>ラバーアウトソール</li></ul></div>
            <img data-testid="pdp__image-viewer__desktop-zoom__hi-res-image" src="https://assets.adidas.com/images/h_2000,f_auto/abc/Samba_OG_B75806_01.jpg">
            <div data-auto-id="size-selector">
              <button role="radio">26.0 cm</button>
              <button role="radio" class="size unavailable">26.5 cm</button>
              <button role="radio" aria-label="27.0 cm ご購入いただけません">27.0 cm</button>
            </div>
        "#;
        let raw = parse_detail("https://www.adidas.jp/samba-og/B75806.html", html, &[]).unwrap();
        assert_eq!(raw.source_id, "B75806");
        assert_eq!(raw.title, "サンバ OG / Samba OG");
        assert_eq!(raw.variants.len(), 3);
        assert_eq!(raw.variants[0].price.as_deref(), Some("¥16,500"));
        assert!(raw.variants[0].available);
        assert!(!raw.variants[1].available);
        assert!(!raw.variants[2].available);
        assert_eq!(raw.variants[0].options[0].1, "コアブラック");
        assert_eq!(raw.images.len(), 1);
        assert!(raw.description.contains("<li>ラバーアウトソール</li>"));
    }

    #[test]
    fn detail_falls_back_to_asset_urls_in_source() {
        let html = r#"<h1>Gazelle</h1><script>var imgs = ["https://assets.adidas.com/images/h_2000,f_auto/x/Gazelle_BB5476_01.jpg", "https://assets.adidas.com/images/h_2000,f_auto/x/Other_ZZ0000_01.jpg"];</script>"#;
        let raw = parse_detail("https://www.adidas.jp/gazelle/BB5476.html", html, &[]).unwrap();
        assert_eq!(raw.images.len(), 1);
        assert!(raw.variants.is_empty());
    }
}
