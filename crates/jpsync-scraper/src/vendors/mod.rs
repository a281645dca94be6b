//! Per-vendor fetchers behind a single tagged dispatch.
//!
//! Every vendor answers the same two questions: what is on listing page N of
//! a category, and what does a product detail page contain. JSON and GraphQL
//! vendors answer the first with complete products; HTML and browser vendors
//! answer it with detail URLs that [`ProductStream`] fetches one by one.

mod adidas;
mod beams;
mod onitsuka;
mod storefront;
mod workman;

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use jpsync_core::{AppConfig, ProductRecord, Vendor};

use crate::error::VendorError;
use crate::normalize::normalize;
use crate::raw::{Listing, ListingPage, RawProduct};
use crate::session::{SessionConfig, VendorSession};

use adidas::AdidasState;
use onitsuka::OnitsukaState;

/// Upper bound on listing pages per category. Guards against vendors that
/// keep serving the last page for any page number.
pub const MAX_PAGES: u32 = 200;

/// Everything needed to build a [`VendorFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub vendor: Vendor,
    /// Vendor origin, overridable for tests.
    pub base_url: String,
    pub session: SessionConfig,
    pub min_source_price: i64,
    pub webdriver_url: String,
    /// Time the browser is given to run vendor scripts after navigation.
    pub render_wait: Duration,
}

impl FetcherConfig {
    #[must_use]
    pub fn from_app_config(cfg: &AppConfig, vendor: Vendor) -> Self {
        Self {
            vendor,
            base_url: vendor.base_url().to_owned(),
            session: SessionConfig::from_app_config(cfg, vendor),
            min_source_price: cfg.min_source_price_jpy,
            webdriver_url: cfg.webdriver_url.clone(),
            render_wait: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

enum Strategy {
    Storefront,
    Workman,
    Beams,
    Onitsuka(OnitsukaState),
    Adidas(AdidasState),
}

/// Fetcher for one vendor. Owns the outbound session (and, for adidas, the
/// browser session) for the duration of a run.
pub struct VendorFetcher {
    vendor: Vendor,
    base_url: String,
    session: VendorSession,
    min_source_price: i64,
    strategy: Strategy,
}

impl VendorFetcher {
    /// # Errors
    ///
    /// Returns [`VendorError::Http`] if the HTTP client cannot be built.
    pub fn new(cfg: FetcherConfig) -> Result<Self, VendorError> {
        let session = VendorSession::new(&cfg.session)?;
        let strategy = match cfg.vendor {
            Vendor::Bape | Vendor::HumanMade => Strategy::Storefront,
            Vendor::Workman => Strategy::Workman,
            Vendor::Beams => Strategy::Beams,
            Vendor::Onitsuka => Strategy::Onitsuka(OnitsukaState::default()),
            Vendor::Adidas => Strategy::Adidas(AdidasState::new(
                cfg.webdriver_url,
                cfg.session.user_agent.clone(),
                cfg.session.timeout,
                cfg.render_wait,
            )),
        };
        Ok(Self {
            vendor: cfg.vendor,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            session,
            min_source_price: cfg.min_source_price,
            strategy,
        })
    }

    #[must_use]
    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Category keys this vendor understands.
    #[must_use]
    pub fn known_categories(&self) -> Vec<&'static str> {
        match self.vendor {
            Vendor::Bape | Vendor::HumanMade => storefront::category_keys(self.vendor),
            Vendor::Workman => workman::category_keys(),
            Vendor::Beams => beams::category_keys(),
            Vendor::Onitsuka => onitsuka::category_keys(),
            Vendor::Adidas => adidas::category_keys(),
        }
    }

    /// Fetches listing page `page` (1-based) of `category`.
    ///
    /// # Errors
    ///
    /// [`VendorError::UnknownCategory`] for keys the vendor does not know;
    /// otherwise whatever the request or parse produced after retries.
    pub async fn list_page(&mut self, category: &str, page: u32) -> Result<ListingPage, VendorError> {
        let vendor = self.vendor;
        let base = self.base_url.as_str();
        let session = &self.session;
        match &mut self.strategy {
            Strategy::Storefront => storefront::list_page(session, base, vendor, category, page).await,
            Strategy::Workman => workman::list_page(session, base, category, page).await,
            Strategy::Beams => beams::list_page(session, base, category, page).await,
            Strategy::Onitsuka(state) => state.list_page(session, base, category, page).await,
            Strategy::Adidas(state) => state.list_page(base, category, page).await,
        }
    }

    /// Fetches and parses one product detail page. Waits for the per-vendor
    /// detail spacing first.
    ///
    /// # Errors
    ///
    /// Request failures after retries, or [`VendorError::MalformedSource`]
    /// when the page lacks the fields a product needs.
    pub async fn fetch_detail(&mut self, url: &str, tags: &[String]) -> Result<RawProduct, VendorError> {
        self.session.pace_detail().await;
        let base = self.base_url.as_str();
        let session = &self.session;
        match &mut self.strategy {
            Strategy::Workman => workman::fetch_detail(session, base, url, tags).await,
            Strategy::Beams => beams::fetch_detail(session, url, tags).await,
            Strategy::Adidas(state) => state.fetch_detail(url, tags).await,
            Strategy::Storefront => storefront::fetch_detail(session, base, url, tags).await,
            Strategy::Onitsuka(_) => Err(VendorError::MalformedSource {
                source_product_id: url.to_owned(),
                reason: "onitsuka products come complete from the listing".to_owned(),
            }),
        }
    }

    /// Lazily walks `categories` (the vendor defaults when empty), yielding
    /// one normalized product at a time in emission order.
    pub fn enumerate(&mut self, categories: &[String]) -> ProductStream<'_> {
        let categories: VecDeque<String> = if categories.is_empty() {
            self.vendor
                .default_categories()
                .iter()
                .map(|c| (*c).to_owned())
                .collect()
        } else {
            categories.iter().cloned().collect()
        };
        ProductStream {
            fetcher: self,
            categories,
            current: None,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            truncated: None,
        }
    }

    /// Releases run-scoped resources (the adidas browser session).
    pub async fn shutdown(&mut self) {
        if let Strategy::Adidas(state) = &mut self.strategy {
            state.close().await;
        }
    }
}

/// Finite, non-restartable sequence of products for one run.
pub struct ProductStream<'a> {
    fetcher: &'a mut VendorFetcher,
    categories: VecDeque<String>,
    current: Option<(String, u32)>,
    pending: VecDeque<Listing>,
    seen: HashSet<String>,
    truncated: Option<String>,
}

impl ProductStream<'_> {
    /// Next product, or `None` once every category is exhausted.
    ///
    /// An `Err` item is a single-product or single-category failure; the
    /// stream stays usable and continues with the next product (or the next
    /// category when a listing page failed after its retries). A category cut
    /// off at [`MAX_PAGES`] yields [`VendorError::PaginationLimit`] after its
    /// last product.
    pub async fn next(&mut self) -> Option<Result<ProductRecord, VendorError>> {
        let vendor = self.fetcher.vendor;
        loop {
            if let Some(item) = self.pending.pop_front() {
                let raw = match item {
                    Listing::Complete(raw) => *raw,
                    Listing::Detail { url, tags } => {
                        match self.fetcher.fetch_detail(&url, &tags).await {
                            Ok(raw) => raw,
                            Err(e) => return Some(Err(e)),
                        }
                    }
                };
                return Some(normalize(vendor, raw, self.fetcher.min_source_price));
            }
            if let Some(category) = self.truncated.take() {
                return Some(Err(VendorError::PaginationLimit {
                    category,
                    max_pages: MAX_PAGES,
                }));
            }

            let (category, page) = match self.current.take() {
                Some(next) => next,
                None => (self.categories.pop_front()?, 1),
            };
            if page > 1 {
                self.fetcher.session.pace_page().await;
            }

            let listing = match self.fetcher.list_page(&category, page).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::error!(
                        vendor = %vendor,
                        category = %category,
                        page,
                        error = %e,
                        "listing page failed, abandoning category"
                    );
                    return Some(Err(e));
                }
            };

            let listed = listing.items.len();
            let mut fresh = 0usize;
            for item in listing.items {
                if self.seen.insert(item.dedupe_key().to_owned()) {
                    fresh += 1;
                    self.pending.push_back(item);
                }
            }
            tracing::info!(
                vendor = %vendor,
                category = %category,
                page,
                listed,
                queued = self.pending.len(),
                "listing page fetched"
            );

            if listing.has_more && fresh > 0 {
                if page >= MAX_PAGES {
                    tracing::warn!(vendor = %vendor, category = %category, max_pages = MAX_PAGES, "pagination limit reached");
                    self.truncated = Some(category);
                } else {
                    self.current = Some((category, page + 1));
                }
            }
        }
    }
}
