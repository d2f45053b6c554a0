//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the print job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum concurrent code-assignment or renderer calls per job.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Timeout for a single renderer call (milliseconds).
    /// A timed-out call is retried once.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,

    /// Tickets processed between cancellation checks.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Minimum progress increase (percent) worth persisting.
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
}

fn default_max_concurrency() -> usize {
    8
}

fn default_call_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_batch_size() -> usize {
    100
}

fn default_progress_step() -> u8 {
    1
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            call_timeout_ms: default_call_timeout(),
            batch_size: default_batch_size(),
            progress_step: default_progress_step(),
        }
    }
}
