//! Ticket storage trait and types.

use std::fmt;

use crate::codec::{CanonicalBarcode, Category, LegacyBarcode, TicketIdentifier};
use crate::ticket::{Ticket, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug)]
pub enum TicketError {
    /// Ticket not found.
    NotFound(String),
    /// A uniqueness constraint rejected the write (barcode or identifier
    /// already taken).
    Conflict { ticket_id: String, reason: String },
    /// Cannot perform operation due to current status.
    InvalidState {
        ticket_id: String,
        current_state: String,
        operation: String,
    },
    /// Database error.
    Database(String),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::NotFound(id) => write!(f, "Ticket not found: {}", id),
            TicketError::Conflict { ticket_id, reason } => {
                write!(f, "Conflict on ticket {}: {}", ticket_id, reason)
            }
            TicketError::InvalidState {
                ticket_id,
                current_state,
                operation,
            } => write!(
                f,
                "Cannot {} ticket {}: current state is {}",
                operation, ticket_id, current_state
            ),
            TicketError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TicketError {}

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by category.
    pub category: Option<Category>,
    /// Inclusive sequence range.
    pub sequence_range: Option<(u32, u32)>,
    /// Filter by status.
    pub status: Option<TicketStatus>,
    /// Exclude a status.
    pub exclude_status: Option<TicketStatus>,
    /// Only tickets carrying a legacy barcode.
    pub legacy_only: bool,
    /// Only tickets created under the canonical scheme.
    pub native_only: bool,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    /// Tickets of `category` with sequence in `first..=last`.
    pub fn in_range(category: Category, first: u32, last: u32) -> Self {
        Self::new().with_category(category).with_sequence_range(first, last)
    }

    /// Filter by category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Filter by inclusive sequence range.
    pub fn with_sequence_range(mut self, first: u32, last: u32) -> Self {
        self.sequence_range = Some((first, last));
        self
    }

    /// Filter by status.
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Exclude a status.
    pub fn without_status(mut self, status: TicketStatus) -> Self {
        self.exclude_status = Some(status);
        self
    }

    /// Only tickets imported with a legacy barcode.
    pub fn legacy_only(mut self) -> Self {
        self.legacy_only = true;
        self
    }

    /// Only tickets created under the canonical scheme.
    pub fn native_only(mut self) -> Self {
        self.native_only = true;
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for ticket storage backends.
///
/// Implementations enforce uniqueness of the canonical barcode and of the
/// identifier, and guard status transitions by the current status.
pub trait TicketStore: Send + Sync {
    /// Create AVAILABLE tickets for `category` sequences `first..=last`.
    /// Existing identifiers are skipped. Returns the number created.
    fn create_pool(&self, category: Category, first: u32, last: u32) -> Result<usize, TicketError>;

    /// Create a ticket imported from the legacy system.
    fn create_legacy(
        &self,
        identifier: TicketIdentifier,
        legacy_barcode: LegacyBarcode,
    ) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Get a ticket by its identifier.
    fn find_by_identifier(&self, identifier: &TicketIdentifier)
        -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter, ordered by category then sequence.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (ignores limit/offset).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// Assign barcode and verification reference to a ticket that has none.
    ///
    /// Assigning the same barcode again is a no-op. Any other collision is a
    /// [`TicketError::Conflict`].
    fn assign_codes(
        &self,
        id: &str,
        barcode: &CanonicalBarcode,
        verification_ref: &str,
    ) -> Result<Ticket, TicketError>;

    /// Move a ticket to `new_status` if its current status is one of `from`.
    fn transition_status(
        &self,
        id: &str,
        from: &[TicketStatus],
        new_status: TicketStatus,
    ) -> Result<Ticket, TicketError>;

    /// Mark tickets printed for `job_id`, all or nothing.
    ///
    /// A ticket already marked by the same job is left untouched. Returns the
    /// number of tickets newly marked.
    fn mark_printed(&self, job_id: &str, ticket_ids: &[String]) -> Result<usize, TicketError>;

    /// Number of tickets marked printed by `job_id`.
    fn printed_by_job(&self, job_id: &str) -> Result<i64, TicketError>;
}
