//! Sale decision types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::{CodeAssignmentError, Ticket, TicketError};

/// Why a scanned barcode may not be sold. Surfaced verbatim to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleRejection {
    /// Not a valid canonical barcode.
    InvalidFormat,
    /// Well-formed, but no ticket carries that identifier.
    NotFound,
    /// The ticket was invalidated by a barcode-scheme migration.
    SupersededTicket,
    /// The ticket has already been sold.
    AlreadySold,
}

impl SaleRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleRejection::InvalidFormat => "invalid_format",
            SaleRejection::NotFound => "not_found",
            SaleRejection::SupersededTicket => "superseded_ticket",
            SaleRejection::AlreadySold => "already_sold",
        }
    }

    /// Operator-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            SaleRejection::InvalidFormat => "Barcode is not a valid ticket code",
            SaleRejection::NotFound => "No ticket exists for this barcode",
            SaleRejection::SupersededTicket => {
                "Ticket was superseded by a barcode migration and must be reissued"
            }
            SaleRejection::AlreadySold => "Ticket has already been sold",
        }
    }
}

/// Outcome of a sale check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SaleDecision {
    /// The ticket may be sold.
    Accepted { ticket: Ticket },
    /// The ticket may not be sold. Superseded rejections carry the ticket for
    /// audit display.
    Rejected {
        reason: SaleRejection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ticket: Option<Ticket>,
    },
}

impl SaleDecision {
    pub(crate) fn reject(reason: SaleRejection) -> Self {
        SaleDecision::Rejected {
            reason,
            ticket: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SaleDecision::Accepted { .. })
    }

    /// Rejection reason, if rejected.
    pub fn rejection(&self) -> Option<SaleRejection> {
        match self {
            SaleDecision::Accepted { .. } => None,
            SaleDecision::Rejected { reason, .. } => Some(*reason),
        }
    }

    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            SaleDecision::Accepted { .. } => "accepted",
            SaleDecision::Rejected { reason, .. } => reason.as_str(),
        }
    }
}

/// Infrastructure failures while deciding a sale. Rejections are not errors.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("ticket store error: {0}")]
    Store(#[from] TicketError),

    #[error("code assignment failed: {0}")]
    CodeAssignment(#[from] CodeAssignmentError),
}
