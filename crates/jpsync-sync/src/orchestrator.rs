//! Single-worker job runner for ingest and reconcile.
//!
//! At most one job runs per process. [`Orchestrator::start_ingest`] and
//! [`Orchestrator::start_reconcile`] claim the worker synchronously, so a
//! second caller gets [`SyncError::AlreadyRunning`] before anything is
//! spawned. Cancellation is cooperative and checked between products.

use std::sync::Arc;

use jpsync_core::{AppConfig, PriceParams, ProductRecord, Vendor};
use jpsync_scraper::{VendorError, VendorFetcher};
use jpsync_shopify::{Catalog, CatalogConfig, CatalogError, ShopifyClient};
use tokio::task::JoinHandle;

use crate::engine::{Outcome, UpsertEngine};
use crate::error::SyncError;
use crate::progress::{
    Counters, ErrorKind, JobKind, JobOutcome, Phase, Progress, ProgressRecord,
};
use crate::settings::JobSettings;
use crate::translate::Translator;

/// Consecutive transient catalog failures after which a job gives up.
pub const MAX_CONSECUTIVE_CATALOG_FAILURES: u32 = 20;

/// Summary returned by a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: JobKind,
    pub vendor: Vendor,
    pub counters: Counters,
}

struct Inner {
    settings: JobSettings,
    catalog: Arc<dyn Catalog>,
    engine: UpsertEngine,
    translator: Translator,
    progress: Progress,
}

/// Cheap to clone; clones share the worker and its progress record.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(settings: JobSettings, catalog: Arc<dyn Catalog>, translator: Translator) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                engine: UpsertEngine::new(Arc::clone(&catalog)),
                catalog,
                translator,
                progress: Progress::new(),
            }),
        }
    }

    /// Wires the Shopify client and the configured translator.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Catalog`] or [`SyncError::Translate`] when either
    /// client cannot be built.
    pub fn from_app_config(app: Arc<AppConfig>) -> Result<Self, SyncError> {
        let catalog = ShopifyClient::new(&CatalogConfig::from_app_config(&app))?;
        let translator = Translator::from_app_config(&app)?;
        Ok(Self::new(JobSettings::new(app), Arc::new(catalog), translator))
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.inner.progress.snapshot()
    }

    /// Requests cancellation of the running job. Returns `false` when idle.
    pub fn cancel(&self) -> bool {
        let accepted = self.inner.progress.request_cancel();
        if accepted {
            tracing::info!("cancellation requested");
        }
        accepted
    }

    /// Starts an ingest in the background.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] when a job holds the worker.
    pub fn start_ingest(
        &self,
        vendor: Vendor,
        categories: Vec<String>,
    ) -> Result<JoinHandle<Result<JobReport, SyncError>>, SyncError> {
        self.inner.progress.begin(JobKind::Ingest, vendor)?;
        let this = self.clone();
        Ok(tokio::spawn(async move {
            let result = this.ingest(vendor, &categories).await;
            this.finish(JobKind::Ingest, vendor, result)
        }))
    }

    /// Starts a reconcile in the background.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] when a job holds the worker.
    pub fn start_reconcile(
        &self,
        vendor: Vendor,
    ) -> Result<JoinHandle<Result<JobReport, SyncError>>, SyncError> {
        self.inner.progress.begin(JobKind::Reconcile, vendor)?;
        let this = self.clone();
        Ok(tokio::spawn(async move {
            let result = this.reconcile(vendor).await;
            this.finish(JobKind::Reconcile, vendor, result)
        }))
    }

    /// Runs an ingest on the current task.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyRunning`], [`SyncError::Cancelled`], or the fatal
    /// error that stopped the job.
    pub async fn run_ingest(
        &self,
        vendor: Vendor,
        categories: &[String],
    ) -> Result<JobReport, SyncError> {
        self.inner.progress.begin(JobKind::Ingest, vendor)?;
        let result = self.ingest(vendor, categories).await;
        self.finish(JobKind::Ingest, vendor, result)
    }

    /// Runs a reconcile on the current task.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyRunning`], [`SyncError::Cancelled`], or the fatal
    /// error that stopped the job.
    pub async fn run_reconcile(&self, vendor: Vendor) -> Result<JobReport, SyncError> {
        self.inner.progress.begin(JobKind::Reconcile, vendor)?;
        let result = self.reconcile(vendor).await;
        self.finish(JobKind::Reconcile, vendor, result)
    }

    fn finish(
        &self,
        job: JobKind,
        vendor: Vendor,
        result: Result<(), SyncError>,
    ) -> Result<JobReport, SyncError> {
        let progress = &self.inner.progress;
        match &result {
            Ok(()) => progress.finish(JobOutcome::Succeeded),
            Err(SyncError::Cancelled) => progress.finish(JobOutcome::Cancelled),
            Err(e) => {
                progress.record_error(None, ErrorKind::Fatal, e.to_string());
                progress.finish(JobOutcome::Failed);
            }
        }

        let counters = progress.snapshot().counters;
        match &result {
            Ok(()) => tracing::info!(
                job = %job,
                vendor = vendor.tag(),
                checked = counters.checked,
                created = counters.created,
                updated = counters.updated,
                drafted = counters.drafted,
                deleted = counters.deleted,
                errors = counters.errors,
                "job completed"
            ),
            Err(SyncError::Cancelled) => {
                tracing::warn!(job = %job, vendor = vendor.tag(), "job cancelled");
            }
            Err(e) => tracing::error!(job = %job, vendor = vendor.tag(), error = %e, "job failed"),
        }
        result.map(|()| JobReport {
            job,
            vendor,
            counters,
        })
    }

    async fn ingest(&self, vendor: Vendor, requested: &[String]) -> Result<(), SyncError> {
        let settings = &self.inner.settings;
        self.inner.translator.reset();
        let categories = settings.categories_for(vendor, requested);
        tracing::info!(vendor = vendor.tag(), categories = ?categories, "ingest started");

        let mut fetcher = VendorFetcher::new(settings.fetcher_config(vendor))?;
        let result = self.drive_ingest(&mut fetcher, &categories).await;
        fetcher.shutdown().await;
        result
    }

    async fn drive_ingest(
        &self,
        fetcher: &mut VendorFetcher,
        categories: &[String],
    ) -> Result<(), SyncError> {
        let progress = &self.inner.progress;
        let price = self.inner.settings.price().clone();
        let mut streak = 0u32;
        let mut stream = fetcher.enumerate(categories);

        loop {
            if progress.cancel_requested() {
                return Err(SyncError::Cancelled);
            }
            progress.set_phase(Phase::Fetching);
            let Some(item) = stream.next().await else {
                return Ok(());
            };
            let mut record = match item {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping vendor item");
                    progress.record_error(
                        vendor_error_item(&e),
                        ErrorKind::of_vendor(&e),
                        e.to_string(),
                    );
                    progress.advance();
                    continue;
                }
            };

            let handle = record.handle();
            progress.set_current(handle.clone());

            progress.set_phase(Phase::Translating);
            for warning in self.inner.translator.translate_record(&mut record).await {
                progress.record_error(
                    Some(&handle),
                    ErrorKind::of_translate(&warning),
                    warning.to_string(),
                );
            }
            apply_prices(&mut record, &price);

            progress.set_phase(Phase::Upserting);
            let result = self.inner.engine.apply(&record, None).await;
            self.record_outcome(&handle, result, &mut streak)?;
            progress.advance();
        }
    }

    async fn reconcile(&self, vendor: Vendor) -> Result<(), SyncError> {
        let progress = &self.inner.progress;
        progress.set_phase(Phase::Reconciling);

        let products = self.inner.catalog.list_products(vendor).await?;
        progress.set_total(u64::try_from(products.len()).unwrap_or(u64::MAX));
        tracing::info!(vendor = vendor.tag(), products = products.len(), "reconcile started");

        let probe = self.inner.settings.stock_probe(vendor)?;
        let mut streak = 0u32;
        for product in &products {
            if progress.cancel_requested() {
                return Err(SyncError::Cancelled);
            }
            progress.set_current(product.handle.clone());

            let Some(url) = product.source_url.as_deref() else {
                tracing::warn!(handle = %product.handle, "no source URL, skipping");
                progress.record_error(
                    Some(&product.handle),
                    ErrorKind::MissingSourceUrl,
                    "product has no vendor source URL",
                );
                progress.advance();
                continue;
            };

            let verdict = probe.probe(url).await;
            tracing::debug!(handle = %product.handle, verdict = verdict.label(), "probed");
            let result = self.inner.engine.reconcile(product, &verdict).await;
            self.record_outcome(&product.handle, result, &mut streak)?;
            progress.advance();
        }
        Ok(())
    }

    /// Records one product's outcome. Aborts the job once transient catalog
    /// failures have happened [`MAX_CONSECUTIVE_CATALOG_FAILURES`] times in
    /// a row.
    fn record_outcome(
        &self,
        handle: &str,
        result: Result<Outcome, CatalogError>,
        streak: &mut u32,
    ) -> Result<(), SyncError> {
        let progress = &self.inner.progress;
        match result {
            Ok(outcome) => {
                *streak = 0;
                tracing::info!(
                    handle,
                    action = ?outcome.action,
                    product_id = ?outcome.product_id,
                    "{}",
                    outcome.message
                );
                progress.record_action(handle, outcome.action, outcome.message);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(handle, error = %e, "catalog write failed");
                progress.record_error(Some(handle), ErrorKind::of_catalog(&e), e.to_string());
                if !e.is_transient() {
                    *streak = 0;
                    return Ok(());
                }
                *streak += 1;
                if *streak >= MAX_CONSECUTIVE_CATALOG_FAILURES {
                    return Err(SyncError::CatalogUnreachable {
                        consecutive: *streak,
                        last: e,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Fills every variant's `target_price` from its `source_price`.
pub fn apply_prices(record: &mut ProductRecord, price: &PriceParams) {
    for variant in &mut record.variants {
        variant.target_price = price.target_price(variant.source_price);
    }
}

fn vendor_error_item(err: &VendorError) -> Option<&str> {
    match err {
        VendorError::NotFound { url } | VendorError::UnexpectedStatus { url, .. } => Some(url),
        VendorError::MalformedSource {
            source_product_id, ..
        } => Some(source_product_id),
        VendorError::UnknownCategory { category, .. }
        | VendorError::PaginationLimit { category, .. } => Some(category),
        _ => None,
    }
}
