use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::pricing::PriceParams;
use crate::vendor::Vendor;

/// Which machine-translation backend the translator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorProvider {
    /// No backend: every call reports the translation as unavailable and
    /// callers keep the source text.
    None,
    OpenAi,
}

impl std::fmt::Display for TranslatorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslatorProvider::None => write!(f, "none"),
            TranslatorProvider::OpenAi => write!(f, "openai"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub shopify_shop: String,
    pub shopify_access_token: String,
    pub shopify_api_version: String,
    pub shopify_location_id: Option<i64>,
    pub price: PriceParams,
    pub translator_provider: TranslatorProvider,
    pub translator_key: Option<String>,
    pub translator_model: String,
    pub translator_target_lang: String,
    pub in_stock_quantity: i64,
    pub min_source_price_jpy: i64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub detail_delay_ms: u64,
    pub catalog_page_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub webdriver_url: String,
    pub bind_addr: SocketAddr,
    pub api_keys: Vec<String>,
    pub reconcile_cron: Option<String>,
    pub log_level: String,
    pub vendor_categories: BTreeMap<Vendor, Vec<String>>,
    pub vendor_stock_keywords: BTreeMap<Vendor, Vec<String>>,
}

impl AppConfig {
    /// Categories to crawl for `vendor`: `{VENDOR}_CATEGORIES` when set,
    /// otherwise the vendor's defaults.
    #[must_use]
    pub fn categories_for(&self, vendor: Vendor) -> Vec<String> {
        self.vendor_categories.get(&vendor).cloned().unwrap_or_else(|| {
            vendor
                .default_categories()
                .iter()
                .map(|c| (*c).to_string())
                .collect()
        })
    }

    #[must_use]
    pub fn stock_keywords_for(&self, vendor: Vendor) -> Vec<String> {
        self.vendor_stock_keywords
            .get(&vendor)
            .cloned()
            .unwrap_or_else(|| vendor.default_stock_keywords())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    #[must_use]
    pub fn catalog_page_delay(&self) -> Duration {
        Duration::from_millis(self.catalog_page_delay_ms)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("shopify_shop", &self.shopify_shop)
            .field("shopify_access_token", &"[redacted]")
            .field("shopify_api_version", &self.shopify_api_version)
            .field("shopify_location_id", &self.shopify_location_id)
            .field("price", &self.price)
            .field("translator_provider", &self.translator_provider)
            .field(
                "translator_key",
                &self.translator_key.as_ref().map(|_| "[redacted]"),
            )
            .field("translator_model", &self.translator_model)
            .field("translator_target_lang", &self.translator_target_lang)
            .field("in_stock_quantity", &self.in_stock_quantity)
            .field("min_source_price_jpy", &self.min_source_price_jpy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("detail_delay_ms", &self.detail_delay_ms)
            .field("catalog_page_delay_ms", &self.catalog_page_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("webdriver_url", &self.webdriver_url)
            .field("bind_addr", &self.bind_addr)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("reconcile_cron", &self.reconcile_cron)
            .field("log_level", &self.log_level)
            .field("vendor_categories", &self.vendor_categories)
            .field("vendor_stock_keywords", &self.vendor_stock_keywords)
            .finish()
    }
}
