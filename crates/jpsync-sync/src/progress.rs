//! Shared progress record for the single background worker.
//!
//! The worker mutates the record through [`Progress`]; readers only ever see
//! cloned snapshots. Every access goes through one mutex and none of the
//! critical sections await.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use jpsync_core::Vendor;
use jpsync_scraper::VendorError;
use jpsync_shopify::CatalogError;
use serde::Serialize;

use crate::error::{SyncError, TranslateError};

pub const RECENT_DETAILS_CAPACITY: usize = 50;
pub const ERROR_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Translating,
    Upserting,
    Reconciling,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Ingest,
    Reconcile,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Ingest => write!(f, "ingest"),
            JobKind::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// What the upsert engine did with one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Checked,
    Created,
    Updated,
    Drafted,
    Deleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub checked: u64,
    pub created: u64,
    pub updated: u64,
    pub drafted: u64,
    pub deleted: u64,
    pub errors: u64,
}

impl Counters {
    fn bump(&mut self, action: Action) {
        match action {
            Action::Checked => self.checked += 1,
            Action::Created => self.created += 1,
            Action::Updated => self.updated += 1,
            Action::Drafted => self.drafted += 1,
            Action::Deleted => self.deleted += 1,
        }
    }
}

/// Error classification recorded in the error log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    VendorTransient,
    VendorPermanent,
    MalformedSource,
    TranslationUnavailable,
    CatalogTransient,
    CatalogPermanent,
    MissingSourceUrl,
    Fatal,
}

impl ErrorKind {
    #[must_use]
    pub fn of_vendor(err: &VendorError) -> Self {
        match err {
            VendorError::MalformedSource { .. } => Self::MalformedSource,
            e if e.is_transient() => Self::VendorTransient,
            _ => Self::VendorPermanent,
        }
    }

    #[must_use]
    pub fn of_catalog(err: &CatalogError) -> Self {
        if err.is_transient() {
            Self::CatalogTransient
        } else {
            Self::CatalogPermanent
        }
    }

    #[must_use]
    pub fn of_translate(_: &TranslateError) -> Self {
        Self::TranslationUnavailable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    pub at: DateTime<Utc>,
    pub handle: String,
    pub action: Action,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub at: DateTime<Utc>,
    /// Handle, source id or URL of the product the error belongs to, when
    /// there is one.
    pub item: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

/// How the last job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    pub running: bool,
    pub cancel_requested: bool,
    pub phase: Phase,
    pub job: Option<JobKind>,
    pub vendor: Option<Vendor>,
    pub current_item: Option<String>,
    /// Products to process when known up front (reconcile), otherwise the
    /// number seen so far.
    pub total: u64,
    pub progress: u64,
    pub counters: Counters,
    pub recent_details: VecDeque<Detail>,
    pub error_log: VecDeque<ErrorEntry>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<JobOutcome>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            running: false,
            cancel_requested: false,
            phase: Phase::Idle,
            job: None,
            vendor: None,
            current_item: None,
            total: 0,
            progress: 0,
            counters: Counters::default(),
            recent_details: VecDeque::with_capacity(RECENT_DETAILS_CAPACITY),
            error_log: VecDeque::with_capacity(ERROR_LOG_CAPACITY),
            started_at: None,
            finished_at: None,
            outcome: None,
        }
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, capacity: usize) {
    if buf.len() == capacity {
        buf.pop_front();
    }
    buf.push_back(item);
}

/// Owner of the live [`ProgressRecord`].
#[derive(Debug, Default)]
pub struct Progress {
    inner: Mutex<ProgressRecord>,
}

impl Progress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProgressRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Immutable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.lock().clone()
    }

    /// Claims the worker for a new job and resets the record.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] when another job holds it.
    pub fn begin(&self, job: JobKind, vendor: Vendor) -> Result<(), SyncError> {
        let mut record = self.lock();
        if record.running {
            return Err(SyncError::AlreadyRunning {
                job: record.job.map_or_else(String::new, |j| j.to_string()),
                vendor: record.vendor.map_or_else(String::new, |v| v.tag().to_owned()),
            });
        }
        *record = ProgressRecord {
            running: true,
            phase: match job {
                JobKind::Ingest => Phase::Fetching,
                JobKind::Reconcile => Phase::Reconciling,
            },
            job: Some(job),
            vendor: Some(vendor),
            started_at: Some(Utc::now()),
            ..ProgressRecord::default()
        };
        Ok(())
    }

    /// Releases the worker. Phase becomes `completed`, `idle` (cancelled)
    /// or `error`.
    pub fn finish(&self, outcome: JobOutcome) {
        let mut record = self.lock();
        record.running = false;
        record.current_item = None;
        record.phase = match outcome {
            JobOutcome::Succeeded => Phase::Completed,
            JobOutcome::Cancelled => Phase::Idle,
            JobOutcome::Failed => Phase::Error,
        };
        record.outcome = Some(outcome);
        record.finished_at = Some(Utc::now());
    }

    /// Asks the running job to stop between products. Returns `false` when
    /// nothing is running.
    pub fn request_cancel(&self) -> bool {
        let mut record = self.lock();
        if record.running {
            record.cancel_requested = true;
        }
        record.running
    }

    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.lock().cancel_requested
    }

    pub fn set_phase(&self, phase: Phase) {
        self.lock().phase = phase;
    }

    pub fn set_current(&self, item: impl Into<String>) {
        self.lock().current_item = Some(item.into());
    }

    pub fn set_total(&self, total: u64) {
        self.lock().total = total;
    }

    /// Marks one more product as processed; grows `total` for streams of
    /// unknown length.
    pub fn advance(&self) {
        let mut record = self.lock();
        record.progress += 1;
        if record.progress > record.total {
            record.total = record.progress;
        }
    }

    pub fn record_action(&self, handle: &str, action: Action, message: impl Into<String>) {
        let mut record = self.lock();
        record.counters.bump(action);
        push_bounded(
            &mut record.recent_details,
            Detail {
                at: Utc::now(),
                handle: handle.to_owned(),
                action,
                message: message.into(),
            },
            RECENT_DETAILS_CAPACITY,
        );
    }

    /// Appends to the error log. Translation warnings are logged without
    /// bumping the error counter since the product still goes through.
    pub fn record_error(&self, item: Option<&str>, kind: ErrorKind, message: impl Into<String>) {
        let mut record = self.lock();
        if kind != ErrorKind::TranslationUnavailable {
            record.counters.errors += 1;
        }
        push_bounded(
            &mut record.error_log,
            ErrorEntry {
                at: Utc::now(),
                item: item.map(str::to_owned),
                kind,
                message: message.into(),
            },
            ERROR_LOG_CAPACITY,
        );
    }
}
