//! Job storage trait.

use thiserror::Error;

use super::{JobItemError, JobStatus, PrintJob};

/// Error type for job storage.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("cannot {operation} job {job_id}: current status is {current}")]
    InvalidState {
        job_id: String,
        current: JobStatus,
        operation: String,
    },

    #[error("database error: {0}")]
    Database(String),
}

/// Persistence for print jobs. Every status change is a conditional update
/// guarded by the current status.
pub trait JobStore: Send + Sync {
    /// Persist a freshly created job.
    fn create(&self, job: &PrintJob) -> Result<(), JobError>;

    /// Get a job by id, with its recorded item errors.
    fn get(&self, id: &str) -> Result<Option<PrintJob>, JobError>;

    /// Most recently created jobs first.
    fn list(&self, limit: i64, offset: i64) -> Result<Vec<PrintJob>, JobError>;

    /// Move a job to `to` if its status is one of `from`.
    ///
    /// Entering `generating` stamps `started_at` on the first run and clears
    /// the previous error; leaving `failed` also clears the cancel flag.
    /// Entering a terminal status stamps `completed_at`.
    fn transition(&self, id: &str, from: &[JobStatus], to: JobStatus)
        -> Result<PrintJob, JobError>;

    /// Move a non-terminal job to `failed` with `message`.
    fn fail(&self, id: &str, message: &str) -> Result<PrintJob, JobError>;

    /// Raise progress to `percent`; never lowers it. Returns the stored value.
    fn raise_progress(&self, id: &str, percent: u8) -> Result<u8, JobError>;

    /// Append per-ticket errors.
    fn record_errors(&self, id: &str, errors: &[JobItemError]) -> Result<(), JobError>;

    /// Drop per-ticket errors from earlier runs.
    fn clear_errors(&self, id: &str) -> Result<(), JobError>;

    /// Store how many tickets this job has marked printed.
    fn set_printed_count(&self, id: &str, count: u32) -> Result<(), JobError>;

    /// Flag a non-terminal job for cooperative cancellation.
    fn request_cancel(&self, id: &str) -> Result<PrintJob, JobError>;

    fn is_cancel_requested(&self, id: &str) -> Result<bool, JobError>;
}
