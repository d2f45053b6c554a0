//! Legacy-aware sale guard.

use std::sync::Arc;

use tracing::{debug, info};

use super::{SaleDecision, SaleError, SaleRejection};
use crate::codec::IdentifierCodec;
use crate::metrics::SALE_DECISIONS;
use crate::ticket::{ensure_codes, Ticket, TicketError, TicketStatus, TicketStore};

/// Decides whether a scanned barcode may be sold, and performs the sale.
pub struct SaleGuard {
    codec: Arc<IdentifierCodec>,
    ticket_store: Arc<dyn TicketStore>,
}

impl SaleGuard {
    pub fn new(codec: Arc<IdentifierCodec>, ticket_store: Arc<dyn TicketStore>) -> Self {
        Self {
            codec,
            ticket_store,
        }
    }

    /// Classifies `barcode` for sale. First matching rule wins:
    ///
    /// 1. fails codec validation: `InvalidFormat`
    /// 2. no ticket for the identifier: `NotFound`
    /// 3. ticket `INVALID`, or imported under the legacy scheme and not yet
    ///    migrated: `SupersededTicket`, with the ticket attached
    /// 4. ticket `SOLD`: `AlreadySold`
    /// 5. otherwise accepted
    pub fn validate_for_sale(&self, barcode: &str) -> Result<SaleDecision, SaleError> {
        let decision = self.decide(barcode)?;
        SALE_DECISIONS.with_label_values(&[decision.outcome()]).inc();
        Ok(decision)
    }

    fn decide(&self, barcode: &str) -> Result<SaleDecision, SaleError> {
        let Some(identifier) = self.codec.decode(barcode) else {
            return Ok(SaleDecision::reject(SaleRejection::InvalidFormat));
        };

        let Some(ticket) = self.ticket_store.find_by_identifier(&identifier)? else {
            return Ok(SaleDecision::reject(SaleRejection::NotFound));
        };

        let decision = match ticket.status {
            TicketStatus::Invalid => SaleDecision::Rejected {
                reason: SaleRejection::SupersededTicket,
                ticket: Some(ticket),
            },
            _ if pending_migration(&ticket) => SaleDecision::Rejected {
                reason: SaleRejection::SupersededTicket,
                ticket: Some(ticket),
            },
            TicketStatus::Sold => SaleDecision::reject(SaleRejection::AlreadySold),
            TicketStatus::Available | TicketStatus::Won => SaleDecision::Accepted { ticket },
        };

        debug!(barcode = barcode, outcome = decision.outcome(), "Sale check");
        Ok(decision)
    }

    /// Validates `barcode` and, if accepted, moves the ticket from AVAILABLE
    /// to SOLD. Codes are assigned on the way if the ticket was never printed.
    ///
    /// Losing a race against a concurrent sale yields `AlreadySold`.
    pub fn sell(&self, barcode: &str) -> Result<SaleDecision, SaleError> {
        let ticket = match self.validate_for_sale(barcode)? {
            SaleDecision::Accepted { ticket } => ticket,
            rejected => return Ok(rejected),
        };

        let ticket = ensure_codes(self.ticket_store.as_ref(), &self.codec, ticket)?;

        match self.ticket_store.transition_status(
            &ticket.id,
            &[TicketStatus::Available],
            TicketStatus::Sold,
        ) {
            Ok(sold) => {
                info!(ticket_id = %sold.id, identifier = %sold.identifier, "Ticket sold");
                Ok(SaleDecision::Accepted { ticket: sold })
            }
            Err(TicketError::InvalidState { .. }) => {
                Ok(SaleDecision::reject(SaleRejection::AlreadySold))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Legacy import whose canonical code was never issued on paper.
fn pending_migration(ticket: &Ticket) -> bool {
    ticket.legacy_barcode.is_some() && !ticket.print.printed && ticket.status != TicketStatus::Won
}
