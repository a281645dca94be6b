use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::app_config::{AppConfig, TranslatorProvider};
use crate::pricing::{PriceParams, Rounding};
use crate::vendor::Vendor;
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MIN_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 60;
const MIN_DETAIL_DELAY_MS: u64 = 1_000;
const MIN_CATALOG_PAGE_DELAY_MS: u64 = 500;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Holds all parsing and validation so callers (and tests in other crates)
/// can feed a plain `HashMap` instead of mutating the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let non_empty = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let require = |var: &str| -> Result<String, ConfigError> {
        non_empty(var).ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default =
        |var: &str, default: &str| -> String { non_empty(var).unwrap_or_else(|| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_decimal = |var: &str| -> Result<Decimal, ConfigError> {
        let raw = require(var)?;
        Decimal::from_str(&raw).map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let require_i64 = |var: &str| -> Result<i64, ConfigError> {
        require(var)?
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let shopify_shop = normalize_shop(&require("SHOPIFY_SHOP")?);
    let shopify_access_token = require("SHOPIFY_ACCESS_TOKEN")?;

    let fx_rate = parse_decimal("FX_JPY_TO_TWD")?;
    let commission = parse_decimal("COMMISSION_RATE")?;
    let shipping = require_i64("SHIPPING_PER_UNIT_TWD")?;
    let round_unit = require_i64("PRICE_ROUND_UNIT_TWD")?;
    let rounding = Rounding::from_str(&or_default("PRICE_ROUNDING", "up"))
        .map_err(|reason| invalid("PRICE_ROUNDING", reason))?;
    let price = PriceParams::new(fx_rate, commission, shipping, round_unit, rounding)?;

    let translator_provider = parse_translator_provider(&or_default("TRANSLATOR_PROVIDER", "none"))
        .ok_or_else(|| {
            invalid(
                "TRANSLATOR_PROVIDER",
                "expected `none` or `openai`".to_string(),
            )
        })?;
    let translator_key = non_empty("TRANSLATOR_KEY");
    if translator_provider == TranslatorProvider::OpenAi && translator_key.is_none() {
        return Err(ConfigError::MissingEnvVar("TRANSLATOR_KEY".to_string()));
    }
    let translator_model = or_default("TRANSLATOR_MODEL", "gpt-4o-mini");
    let translator_target_lang = or_default("TRANSLATOR_TARGET_LANG", "zh-TW");

    let shopify_api_version = or_default("SHOPIFY_API_VERSION", "2024-01");
    let shopify_location_id = non_empty("SHOPIFY_LOCATION_ID")
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|e| invalid("SHOPIFY_LOCATION_ID", e.to_string()))
        })
        .transpose()?;

    let in_stock_quantity = parse_i64("IN_STOCK_QUANTITY", "2")?;
    let min_source_price_jpy = parse_i64("MIN_SOURCE_PRICE_JPY", "1000")?;

    let request_timeout_secs = parse_u64("JPSYNC_REQUEST_TIMEOUT_SECS", "30")?
        .clamp(MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS);
    let user_agent = or_default("JPSYNC_USER_AGENT", DEFAULT_USER_AGENT);
    let detail_delay_ms = parse_u64("JPSYNC_DETAIL_DELAY_MS", "1000")?.max(MIN_DETAIL_DELAY_MS);
    let catalog_page_delay_ms =
        parse_u64("JPSYNC_CATALOG_PAGE_DELAY_MS", "500")?.max(MIN_CATALOG_PAGE_DELAY_MS);
    let max_retries = parse_u32("JPSYNC_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("JPSYNC_RETRY_BACKOFF_BASE_MS", "1000")?;
    let webdriver_url = or_default("WEBDRIVER_URL", "http://localhost:4444");

    let bind_addr = or_default("JPSYNC_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("JPSYNC_BIND_ADDR", e.to_string()))?;
    let api_keys = non_empty("JPSYNC_API_KEYS")
        .map(|raw| split_list(&raw))
        .unwrap_or_default();
    let reconcile_cron = non_empty("JPSYNC_RECONCILE_CRON");
    let log_level = or_default("JPSYNC_LOG_LEVEL", "info");

    let mut vendor_categories = BTreeMap::new();
    let mut vendor_stock_keywords = BTreeMap::new();
    for vendor in Vendor::ALL {
        let prefix = vendor.env_prefix();
        if let Some(raw) = non_empty(&format!("{prefix}_CATEGORIES")) {
            vendor_categories.insert(vendor, split_list(&raw));
        }
        if let Some(raw) = non_empty(&format!("{prefix}_STOCK_KEYWORDS")) {
            vendor_stock_keywords.insert(vendor, split_list(&raw));
        }
    }

    Ok(AppConfig {
        shopify_shop,
        shopify_access_token,
        shopify_api_version,
        shopify_location_id,
        price,
        translator_provider,
        translator_key,
        translator_model,
        translator_target_lang,
        in_stock_quantity,
        min_source_price_jpy,
        request_timeout_secs,
        user_agent,
        detail_delay_ms,
        catalog_page_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        webdriver_url,
        bind_addr,
        api_keys,
        reconcile_cron,
        log_level,
        vendor_categories,
        vendor_stock_keywords,
    })
}

/// Accepts `my-shop`, `my-shop.myshopify.com` or a full admin URL and keeps
/// only the shop name.
fn normalize_shop(raw: &str) -> String {
    let without_scheme = raw
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.trim_end_matches(".myshopify.com").to_string()
}

fn parse_translator_provider(s: &str) -> Option<TranslatorProvider> {
    match s.to_ascii_lowercase().as_str() {
        "none" | "off" | "" => Some(TranslatorProvider::None),
        "openai" => Some(TranslatorProvider::OpenAi),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
