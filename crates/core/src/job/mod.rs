//! Print job records.
//!
//! A job moves `scheduled → generating → printing → completed`, and may
//! fail from any non-terminal state. Only the orchestrator mutates jobs.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{JobError, JobStore};
pub use types::{JobItemError, JobItemErrorKind, JobStatus, PrintJob};
