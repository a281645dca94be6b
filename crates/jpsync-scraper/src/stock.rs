//! Availability probe for a single vendor product page.

use jpsync_core::StockVerdict;
use scraper::Html;

use crate::error::VendorError;
use crate::html::visible_text;
use crate::session::{SessionConfig, VendorSession};

const SOLD_OUT_WORDS: &[&str] = &["売り切れ", "品切れ"];
const CART_MARKERS: &[&str] = &[
    "カートに入れる",
    "カートへ入れる",
    "カートに追加",
    "ADD TO CART",
    "ADD TO BAG",
];
const SOLD_OUT_MARKERS: &[&str] = &["SOLD OUT", "SOLDOUT", "在庫なし", "在庫切れ", "完売"];

/// Fetches a product page and classifies it into a [`StockVerdict`].
pub struct StockProbe {
    session: VendorSession,
    keywords: Vec<String>,
}

impl StockProbe {
    /// `keywords` are the terminal phrases meaning the item will not return
    /// online (see `Vendor::default_stock_keywords`).
    ///
    /// # Errors
    ///
    /// Returns [`VendorError::Http`] if the HTTP client cannot be built.
    pub fn new(cfg: &SessionConfig, keywords: Vec<String>) -> Result<Self, VendorError> {
        Ok(Self {
            session: VendorSession::new(cfg)?,
            keywords,
        })
    }

    /// Probes `url`. Never fails: transport problems and timeouts come back
    /// as [`StockVerdict::Unknown`].
    pub async fn probe(&self, url: &str) -> StockVerdict {
        self.session.pace_detail().await;
        let response = match self.session.client().get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                tracing::warn!(url, "stock probe timed out");
                return StockVerdict::Unknown("timeout".to_owned());
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "stock probe request failed");
                return StockVerdict::Unknown(format!("request failed: {e}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return classify(status.as_u16(), "", &self.keywords);
        }
        match response.text().await {
            Ok(body) => classify(status.as_u16(), &body, &self.keywords),
            Err(e) if e.is_timeout() => StockVerdict::Unknown("timeout".to_owned()),
            Err(e) => StockVerdict::Unknown(format!("body read failed: {e}")),
        }
    }
}

/// Maps an HTTP status and page body to a verdict, in priority order:
/// 404/410, other non-2xx, terminal keyword, explicit sold-out wording,
/// missing cart control with a sold-out marker, otherwise available.
#[must_use]
pub fn classify(status: u16, body: &str, keywords: &[String]) -> StockVerdict {
    if status == 404 || status == 410 {
        return StockVerdict::PageGone(format!("HTTP {status}"));
    }
    if !(200..300).contains(&status) {
        return StockVerdict::Unknown(format!("HTTP {status}"));
    }

    let text = visible_text(&Html::parse_document(body));
    if let Some(keyword) = keywords
        .iter()
        .find(|k| !k.is_empty() && text.contains(k.as_str()))
    {
        return StockVerdict::OutOfStock(keyword.clone());
    }
    if let Some(word) = SOLD_OUT_WORDS.iter().find(|w| text.contains(**w)) {
        return StockVerdict::OutOfStock((*word).to_owned());
    }

    let upper = text.to_uppercase();
    let has_cart = CART_MARKERS.iter().any(|m| upper.contains(m));
    if !has_cart {
        if let Some(marker) = SOLD_OUT_MARKERS.iter().find(|m| upper.contains(**m)) {
            return StockVerdict::OutOfStock((*marker).to_owned());
        }
    }
    StockVerdict::Available
}
