//! Vendor-agnostic shape emitted by the fetchers before normalization.

use jpsync_core::ImageDescriptor;

/// A product as scraped, with prices still as the vendor printed them.
#[derive(Debug, Clone, Default)]
pub struct RawProduct {
    pub source_id: String,
    pub source_url: String,
    pub title: String,
    pub description: String,
    pub images: Vec<ImageDescriptor>,
    pub variants: Vec<RawVariant>,
    /// Canonical tags contributed by the category this product was found in.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawVariant {
    /// Option name → value pairs in vendor order; names are canonicalised
    /// by the normalizer.
    pub options: Vec<(String, String)>,
    pub sku: Option<String>,
    /// Price text such as `"¥12,100"` or `"12100.00"`. `None` when the
    /// vendor did not show one.
    pub price: Option<String>,
    pub available: bool,
    pub image_index: Option<usize>,
}

/// One entry of a category listing page.
#[derive(Debug, Clone)]
pub enum Listing {
    /// The listing already carries everything (JSON and GraphQL vendors).
    Complete(Box<RawProduct>),
    /// Only a detail URL is known; the detail page must be fetched.
    Detail { url: String, tags: Vec<String> },
}

impl Listing {
    /// Stable key used to drop duplicates across categories.
    #[must_use]
    pub fn dedupe_key(&self) -> &str {
        match self {
            Listing::Complete(raw) => &raw.source_id,
            Listing::Detail { url, .. } => url,
        }
    }
}

/// One page of a category listing.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub items: Vec<Listing>,
    pub has_more: bool,
}
