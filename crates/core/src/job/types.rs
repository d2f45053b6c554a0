//! Print job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::Category;

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Scheduled,
    Generating,
    Printing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::Generating => "generating",
            JobStatus::Printing => "printing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(JobStatus::Scheduled),
            "generating" => Some(JobStatus::Generating),
            "printing" => Some(JobStatus::Printing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Completed and failed are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Statuses from which a job may fail.
    pub const ACTIVE: [JobStatus; 3] = [
        JobStatus::Scheduled,
        JobStatus::Generating,
        JobStatus::Printing,
    ];
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong for a single ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobItemErrorKind {
    /// Barcode could not be generated or stored.
    CodeAssignment,
    /// The renderer failed twice for one of the ticket's placements.
    Rendering,
}

impl JobItemErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobItemErrorKind::CodeAssignment => "code_assignment",
            JobItemErrorKind::Rendering => "rendering",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code_assignment" => Some(JobItemErrorKind::CodeAssignment),
            "rendering" => Some(JobItemErrorKind::Rendering),
            _ => None,
        }
    }
}

/// Per-ticket error collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobItemError {
    pub ticket_id: String,
    /// Human-readable ticket number, e.g. `A000042`.
    pub ticket_number: String,
    pub kind: JobItemErrorKind,
    pub message: String,
}

/// A print job over one category range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    pub category: Category,
    pub range_start: u32,
    pub range_end: u32,
    pub template: String,
    pub total_tickets: u32,
    /// Sheets needed, `ceil(total_tickets / tickets_per_page)`.
    pub total_pages: u32,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub printed_count: u32,
    pub cancel_requested: bool,
    /// Terminal failure reason.
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Vec<JobItemError>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PrintJob {
    /// New job in `scheduled`.
    pub fn new(
        category: Category,
        range_start: u32,
        range_end: u32,
        template: &str,
        total_tickets: u32,
        total_pages: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category,
            range_start,
            range_end,
            template: template.to_string(),
            total_tickets,
            total_pages,
            status: JobStatus::Scheduled,
            progress_percent: 0,
            printed_count: 0,
            cancel_requested: false,
            error: None,
            errors: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
