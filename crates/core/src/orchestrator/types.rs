//! Types for the print job orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Category;
use crate::job::{JobError, JobStatus};
use crate::ticket::{CodeAssignmentError, TicketError};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No printable ticket in the requested range.
    #[error("no printable tickets in {category} {start}..={end}")]
    EmptyRange {
        category: Category,
        start: u32,
        end: u32,
    },

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Operation not allowed in the job's current status.
    #[error("cannot {operation} job {job_id}: status is {status}")]
    InvalidState {
        job_id: String,
        status: JobStatus,
        operation: String,
    },

    /// Another run of the same job is in progress.
    #[error("job {0} is already running")]
    AlreadyRunning(String),

    /// Operator-initiated cancellation.
    #[error("Cancelled")]
    Cancelled,

    #[error("ticket store error: {0}")]
    TicketStore(#[from] TicketError),

    #[error("job store error: {0}")]
    JobStore(JobError),

    #[error("code assignment error: {0}")]
    CodeAssignment(#[from] CodeAssignmentError),
}

impl From<JobError> for OrchestratorError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(id) => OrchestratorError::JobNotFound(id),
            JobError::InvalidState {
                job_id,
                current,
                operation,
            } => OrchestratorError::InvalidState {
                job_id,
                status: current,
                operation,
            },
            other => OrchestratorError::JobStore(other),
        }
    }
}

/// A request to print one category range on one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRequest {
    pub category: Category,
    pub range_start: u32,
    pub range_end: u32,
    pub template: String,
}

impl PrintRequest {
    pub fn new(category: Category, range_start: u32, range_end: u32, template: &str) -> Self {
        Self {
            category,
            range_start,
            range_end,
            template: template.to_string(),
        }
    }
}

/// Ticket that could not be migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationItemError {
    pub ticket_id: String,
    pub ticket_number: String,
    pub message: String,
}

/// Outcome of a legacy migration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Tickets given a canonical barcode and flagged invalid.
    pub converted: usize,
    /// Won tickets left untouched.
    pub skipped: usize,
    pub errors: Vec<MigrationItemError>,
}
