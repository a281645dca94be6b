use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal keywords shared by every vendor: any of these on a product page
/// means the item will never come back online.
pub const TERMINAL_STOCK_KEYWORDS: &[&str] = &[
    "店舗のみのお取り扱い",
    "オンラインストア販売終了",
    "販売を終了",
    "受付終了",
];

/// The Japanese retail sites this service mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Bape,
    #[serde(rename = "humanmade")]
    HumanMade,
    Workman,
    Beams,
    Onitsuka,
    Adidas,
}

impl Vendor {
    pub const ALL: [Vendor; 6] = [
        Vendor::Bape,
        Vendor::HumanMade,
        Vendor::Workman,
        Vendor::Beams,
        Vendor::Onitsuka,
        Vendor::Adidas,
    ];

    /// Stable lowercase tag used in handles, env-var prefixes and the API.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Bape => "bape",
            Self::HumanMade => "humanmade",
            Self::Workman => "workman",
            Self::Beams => "beams",
            Self::Onitsuka => "onitsuka",
            Self::Adidas => "adidas",
        }
    }

    /// Display brand, written to the downstream `vendor` field and used as
    /// the title prefix.
    #[must_use]
    pub fn brand(self) -> &'static str {
        match self {
            Self::Bape => "BAPE",
            Self::HumanMade => "HUMAN MADE",
            Self::Workman => "WORKMAN",
            Self::Beams => "BEAMS",
            Self::Onitsuka => "Onitsuka Tiger",
            Self::Adidas => "adidas",
        }
    }

    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Bape => "https://jp.bape.com",
            Self::HumanMade => "https://humanmade.jp",
            Self::Workman => "https://workman.jp",
            Self::Beams => "https://www.beams.co.jp",
            Self::Onitsuka => "https://www.onitsukatiger.com",
            Self::Adidas => "https://www.adidas.jp",
        }
    }

    /// Uppercase prefix for per-vendor env vars such as `BAPE_CATEGORIES`.
    #[must_use]
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Bape => "BAPE",
            Self::HumanMade => "HUMANMADE",
            Self::Workman => "WORKMAN",
            Self::Beams => "BEAMS",
            Self::Onitsuka => "ONITSUKA",
            Self::Adidas => "ADIDAS",
        }
    }

    /// Categories crawled when neither the caller nor the environment names any.
    #[must_use]
    pub fn default_categories(self) -> &'static [&'static str] {
        match self {
            Self::Bape => &["mens", "womens", "kids"],
            Self::HumanMade => &["all"],
            Self::Workman => &["work", "mens", "womens", "kids"],
            Self::Beams => &["men_tshirt", "men_shirt", "men_tops", "men_jacket", "men_pants"],
            Self::Onitsuka => &["men", "women"],
            Self::Adidas => &["men_originals", "women_originals"],
        }
    }

    /// Terminal keyword list used by the stock probe unless overridden
    /// through `{VENDOR}_STOCK_KEYWORDS`.
    #[must_use]
    pub fn default_stock_keywords(self) -> Vec<String> {
        let mut keywords: Vec<String> = TERMINAL_STOCK_KEYWORDS
            .iter()
            .map(|k| (*k).to_string())
            .collect();
        if self == Self::Workman {
            keywords.push("店舗在庫を確認する".to_string());
        }
        keywords
    }

    /// Minimum spacing between two detail-page fetches for this vendor.
    /// BEAMS throttles harder than the others.
    #[must_use]
    pub fn detail_spacing(self, configured: Duration) -> Duration {
        match self {
            Self::Beams => configured.max(Duration::from_secs(2)),
            _ => configured.max(Duration::from_secs(1)),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vendor `{0}`")]
pub struct UnknownVendor(pub String);

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|v| v.tag() == normalized)
            .ok_or_else(|| UnknownVendor(s.to_string()))
    }
}
