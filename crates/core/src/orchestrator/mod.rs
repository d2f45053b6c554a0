//! Print job orchestration.
//!
//! Drives a job through its phases:
//! - **Generating**: assigns missing canonical barcodes, progress 10..40%
//! - **Printing**: lays out the batch once, renders every placement
//!   (bounded fan-out, per-call timeout, one retry), progress 50..95%
//! - **Completed**: marks rendered tickets printed in one transaction, 100%
//!
//! Cancellation is checked between batches. The legacy migration pass lives
//! here as well since it shares the code-assignment path.

mod config;
mod migration;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::PrintJobOrchestrator;
pub use types::{MigrationItemError, MigrationReport, OrchestratorError, PrintRequest};
