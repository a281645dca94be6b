//! Job command handlers for the CLI.
//!
//! Each handler runs one job on a background task and waits for it. The
//! first Ctrl-C asks the worker to stop after the product in flight.

use std::sync::Arc;

use jpsync_core::{AppConfig, PriceParams, Vendor};
use jpsync_sync::{JobReport, Orchestrator, SyncError};
use tokio::task::JoinHandle;

/// Runs an ingest for `vendor` and waits for it.
///
/// # Errors
///
/// Returns an error if the clients cannot be built, the job fails, or it
/// is cancelled. Per-product failures are logged, not propagated.
pub(crate) async fn run_ingest(
    config: Arc<AppConfig>,
    vendor: Vendor,
    categories: Vec<String>,
) -> anyhow::Result<JobReport> {
    let orchestrator = Orchestrator::from_app_config(config)?;
    let handle = orchestrator.start_ingest(vendor, categories)?;
    wait_for(&orchestrator, handle).await
}

/// Runs a reconcile for `vendor` and waits for it.
///
/// # Errors
///
/// Same as [`run_ingest`].
pub(crate) async fn run_reconcile(
    config: Arc<AppConfig>,
    vendor: Vendor,
) -> anyhow::Result<JobReport> {
    let orchestrator = Orchestrator::from_app_config(config)?;
    let handle = orchestrator.start_reconcile(vendor)?;
    wait_for(&orchestrator, handle).await
}

async fn wait_for(
    orchestrator: &Orchestrator,
    mut handle: JoinHandle<Result<JobReport, SyncError>>,
) -> anyhow::Result<JobReport> {
    let joined = tokio::select! {
        joined = &mut handle => joined,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received, cancelling after the current product");
            orchestrator.cancel();
            handle.await
        }
    };
    Ok(joined??)
}

pub(crate) fn price_line(price: &PriceParams, jpy: i64) -> String {
    format!(
        "{jpy} JPY -> {} TWD (fx {}, commission {}, shipping {}, unit {}, rounding {:?})",
        price.target_price(jpy),
        price.fx_rate(),
        price.commission(),
        price.shipping(),
        price.round_unit(),
        price.rounding(),
    )
}

pub(crate) fn print_report(report: &JobReport) {
    let c = &report.counters;
    println!(
        "{} {}: checked {}, created {}, updated {}, drafted {}, deleted {}, errors {}",
        report.job,
        report.vendor,
        c.checked,
        c.created,
        c.updated,
        c.drafted,
        c.deleted,
        c.errors
    );
}
