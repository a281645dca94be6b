//! Scheduled reconcile sweep.
//!
//! When `JPSYNC_RECONCILE_CRON` is set, a [`JobScheduler`] reconciles every
//! vendor in turn on that schedule (six-field cron, seconds first, UTC).

use jpsync_core::Vendor;
use jpsync_sync::{Orchestrator, SyncError};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the scheduler, or returns `None` when no schedule is
/// configured.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts the scheduler down.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler fails to start.
pub async fn build_scheduler(
    orchestrator: Orchestrator,
    cron: Option<&str>,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(cron) = cron else {
        tracing::info!("scheduler: JPSYNC_RECONCILE_CRON not set; scheduled reconcile disabled");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let orchestrator = orchestrator.clone();
        Box::pin(async move {
            tracing::info!("scheduler: starting reconcile sweep");
            reconcile_all(&orchestrator).await;
            tracing::info!("scheduler: reconcile sweep complete");
        })
    })?;
    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered reconcile job");

    scheduler.start().await?;
    Ok(Some(scheduler))
}

/// Reconciles every vendor in turn. A vendor failure is logged and the sweep
/// moves on; a busy worker or a cancel ends the sweep.
pub(crate) async fn reconcile_all(orchestrator: &Orchestrator) {
    for vendor in Vendor::ALL {
        match orchestrator.run_reconcile(vendor).await {
            Ok(report) => tracing::info!(
                vendor = vendor.tag(),
                deleted = report.counters.deleted,
                drafted = report.counters.drafted,
                errors = report.counters.errors,
                "scheduler: vendor reconciled"
            ),
            Err(SyncError::AlreadyRunning { job, vendor: busy }) => {
                tracing::warn!(job = %job, vendor = %busy, "scheduler: worker busy, skipping sweep");
                return;
            }
            Err(SyncError::Cancelled) => {
                tracing::warn!(vendor = vendor.tag(), "scheduler: sweep cancelled");
                return;
            }
            Err(e) => {
                tracing::error!(vendor = vendor.tag(), error = %e, "scheduler: reconcile failed");
            }
        }
    }
}
