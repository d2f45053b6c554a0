//! Core ticket data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{CanonicalBarcode, LegacyBarcode, TicketIdentifier};

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a ticket. Tickets are never deleted, only moved
/// between these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// In the pool, may be sold.
    Available,
    /// Sold to a customer.
    Sold,
    /// Drawn as a winner.
    Won,
    /// Superseded by a barcode-scheme migration, pending reissue.
    Invalid,
}

impl TicketStatus {
    /// Stable string used in storage and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Available => "available",
            TicketStatus::Sold => "sold",
            TicketStatus::Won => "won",
            TicketStatus::Invalid => "invalid",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(TicketStatus::Available),
            "sold" => Some(TicketStatus::Sold),
            "won" => Some(TicketStatus::Won),
            "invalid" => Some(TicketStatus::Invalid),
            _ => None,
        }
    }

    /// Whether a print run may include this ticket.
    pub fn is_printable(&self) -> bool {
        !matches!(self, TicketStatus::Invalid)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Physical print state. Both fields only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintState {
    pub printed: bool,
    pub print_count: u32,
}

/// A numbered raffle ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket ID (UUID).
    pub id: String,
    /// Category and sequence, fixed at pool initialization.
    pub identifier: TicketIdentifier,
    /// Canonical barcode, assigned lazily on first print or sale.
    pub barcode: Option<CanonicalBarcode>,
    /// Barcode carried over from the deprecated 8-digit scheme, kept for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_barcode: Option<LegacyBarcode>,
    /// URL-shaped verification reference, assigned alongside the barcode.
    pub verification_ref: Option<String>,
    /// Lifecycle status.
    pub status: TicketStatus,
    /// Print state.
    pub print: PrintState,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether the canonical barcode still needs to be generated.
    pub fn needs_codes(&self) -> bool {
        self.barcode.is_none() || self.verification_ref.is_none()
    }
}
