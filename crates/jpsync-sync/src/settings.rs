//! Per-job construction of vendor fetchers and stock probes.

use std::collections::HashMap;
use std::sync::Arc;

use jpsync_core::{AppConfig, PriceParams, Vendor};
use jpsync_scraper::{FetcherConfig, SessionConfig, StockProbe, VendorError};

/// Read-only inputs every job needs, derived from [`AppConfig`].
///
/// Tests point vendors at mock servers through [`JobSettings::with_base_url`]
/// and drop pacing through [`JobSettings::with_session`].
#[derive(Clone)]
pub struct JobSettings {
    app: Arc<AppConfig>,
    base_urls: HashMap<Vendor, String>,
    session: Option<SessionConfig>,
}

impl JobSettings {
    #[must_use]
    pub fn new(app: Arc<AppConfig>) -> Self {
        Self {
            app,
            base_urls: HashMap::new(),
            session: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, vendor: Vendor, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(vendor, base_url.into());
        self
    }

    /// Replaces the per-vendor session settings for every vendor.
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    #[must_use]
    pub fn price(&self) -> &PriceParams {
        &self.app.price
    }

    /// `requested` when non-empty, otherwise the configured categories.
    #[must_use]
    pub fn categories_for(&self, vendor: Vendor, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.app.categories_for(vendor)
        } else {
            requested.to_vec()
        }
    }

    fn session_for(&self, vendor: Vendor) -> SessionConfig {
        self.session
            .clone()
            .unwrap_or_else(|| SessionConfig::from_app_config(&self.app, vendor))
    }

    #[must_use]
    pub fn fetcher_config(&self, vendor: Vendor) -> FetcherConfig {
        let mut cfg = FetcherConfig::from_app_config(&self.app, vendor);
        cfg.session = self.session_for(vendor);
        match self.base_urls.get(&vendor) {
            Some(base_url) => cfg.with_base_url(base_url.clone()),
            None => cfg,
        }
    }

    /// # Errors
    ///
    /// Returns [`VendorError::Http`] if the HTTP client cannot be built.
    pub fn stock_probe(&self, vendor: Vendor) -> Result<StockProbe, VendorError> {
        StockProbe::new(&self.session_for(vendor), self.app.stock_keywords_for(vendor))
    }
}
