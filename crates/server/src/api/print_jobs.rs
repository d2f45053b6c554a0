//! Print job API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use raffle_core::{PrintJob, PrintJobOrchestrator, PrintRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for job queries
const MAX_LIMIT: i64 = 500;

/// Default limit for job queries
const DEFAULT_LIMIT: i64 = 50;

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
}

/// Job with its in-process run state.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: PrintJob,
    pub running: bool,
}

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub limit: i64,
    pub offset: i64,
}

fn orchestrator(state: &AppState) -> Result<&Arc<PrintJobOrchestrator>, ApiError> {
    state.orchestrator().ok_or_else(ApiError::printing_unavailable)
}

fn job_response(orch: &PrintJobOrchestrator, job: PrintJob) -> JobResponse {
    let running = orch.is_running(&job.id);
    JobResponse { job, running }
}

/// Create a print job and start it in the background
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PrintRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), ApiError> {
    let orch = orchestrator(&state)?;
    let job_id = orch.request_print_job(&body)?;
    Ok((StatusCode::ACCEPTED, Json(CreateJobResponse { job_id })))
}

/// List jobs, newest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let orch = orchestrator(&state)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let jobs = orch
        .list_jobs(limit, offset)?
        .into_iter()
        .map(|job| job_response(orch, job))
        .collect();

    Ok(Json(ListJobsResponse {
        jobs,
        limit,
        offset,
    }))
}

/// Get a job's status and progress
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let orch = orchestrator(&state)?;
    let job = orch.get_job_status(&id)?;
    Ok(Json(job_response(orch, job)))
}

/// Request cancellation
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let orch = orchestrator(&state)?;
    let job = orch.cancel(&id)?;
    Ok(Json(job_response(orch, job)))
}

/// Re-run a failed job in the background
pub async fn retry_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let orch = orchestrator(&state)?;
    let job = orch.request_retry(&id)?;
    Ok((StatusCode::ACCEPTED, Json(job_response(orch, job))))
}
