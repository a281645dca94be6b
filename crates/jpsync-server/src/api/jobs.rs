//! Job control handlers: start, cancel, and progress polling.

use axum::{extract::State, http::StatusCode, Extension, Json};
use jpsync_core::Vendor;
use jpsync_sync::{JobKind, ProgressRecord, SyncError};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct IngestRequest {
    vendor: String,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReconcileRequest {
    vendor: String,
}

#[derive(Debug, Serialize)]
pub(super) struct JobAccepted {
    job: JobKind,
    vendor: Vendor,
}

#[derive(Debug, Serialize)]
pub(super) struct CancelAccepted {
    cancel_requested: bool,
}

type Accepted<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn parse_vendor(request_id: &str, raw: &str) -> Result<Vendor, ApiError> {
    raw.parse::<Vendor>()
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))
}

fn map_start_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::AlreadyRunning { .. } => {
            ApiError::new(request_id, "already_running", error.to_string())
        }
        other => {
            tracing::error!(error = %other, "failed to start job");
            ApiError::new(request_id, "internal_error", "failed to start job")
        }
    }
}

fn accepted<T: Serialize>(request_id: String, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(request_id),
        }),
    )
}

pub(super) async fn start_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<IngestRequest>,
) -> Accepted<JobAccepted> {
    let vendor = parse_vendor(&req_id.0, &body.vendor)?;
    // The job runs detached; its result lands in the progress record.
    state
        .orchestrator
        .start_ingest(vendor, body.categories)
        .map_err(|e| map_start_error(req_id.0.clone(), &e))?;
    tracing::info!(vendor = vendor.tag(), request_id = %req_id.0, "ingest accepted");
    Ok(accepted(
        req_id.0,
        JobAccepted {
            job: JobKind::Ingest,
            vendor,
        },
    ))
}

pub(super) async fn start_reconcile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ReconcileRequest>,
) -> Accepted<JobAccepted> {
    let vendor = parse_vendor(&req_id.0, &body.vendor)?;
    state
        .orchestrator
        .start_reconcile(vendor)
        .map_err(|e| map_start_error(req_id.0.clone(), &e))?;
    tracing::info!(vendor = vendor.tag(), request_id = %req_id.0, "reconcile accepted");
    Ok(accepted(
        req_id.0,
        JobAccepted {
            job: JobKind::Reconcile,
            vendor,
        },
    ))
}

pub(super) async fn cancel(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<ApiResponse<CancelAccepted>>) {
    let cancel_requested = state.orchestrator.cancel();
    accepted(req_id.0, CancelAccepted { cancel_requested })
}

pub(super) async fn progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ProgressRecord>> {
    Json(ApiResponse {
        data: state.orchestrator.snapshot(),
        meta: ResponseMeta::new(req_id.0),
    })
}
