//! Legacy barcode migration.
//!
//! Tickets imported from the 8-digit scheme get their canonical barcode and
//! are flagged `INVALID`. A scan of the new code at the point of sale is
//! answered with `SupersededTicket` until the ticket is reissued; the old
//! 8-digit code no longer validates at all.
//!
//! Job creation runs the same pass over the requested range, so a legacy
//! ticket is never printed under its canonical code before it is flagged.

use tracing::{info, warn};

use crate::codec::Category;
use crate::metrics::LEGACY_MIGRATIONS;
use crate::ticket::{ensure_codes, Ticket, TicketError, TicketFilter, TicketStatus};

use super::runner::PrintJobOrchestrator;
use super::types::{MigrationItemError, MigrationReport, OrchestratorError};

enum Outcome {
    Converted,
    Skipped,
}

impl PrintJobOrchestrator {
    /// Converts every ticket still carrying a legacy barcode and not yet
    /// flagged `INVALID`. Won tickets, and tickets already printed under
    /// their canonical code, are left alone and counted as skipped.
    ///
    /// Safe to run repeatedly: converted tickets drop out of the scan.
    pub fn migrate_legacy(&self) -> Result<MigrationReport, OrchestratorError> {
        let report = self.migrate_matching(TicketFilter::new())?;
        info!(
            converted = report.converted,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Legacy migration finished"
        );
        Ok(report)
    }

    /// Legacy detection for one range, run before a print job is created.
    pub(super) fn migrate_range(
        &self,
        category: Category,
        first: u32,
        last: u32,
    ) -> Result<MigrationReport, OrchestratorError> {
        let report = self.migrate_matching(TicketFilter::in_range(category, first, last))?;
        if report.converted > 0 || !report.errors.is_empty() {
            info!(
                category = %category,
                first,
                last,
                converted = report.converted,
                errors = report.errors.len(),
                "Legacy tickets detected in print range"
            );
        }
        Ok(report)
    }

    fn migrate_matching(&self, base: TicketFilter) -> Result<MigrationReport, OrchestratorError> {
        let page_size = self.config().batch_size.max(1) as i64;
        let mut report = MigrationReport::default();
        let mut offset = 0;

        loop {
            let filter = base
                .clone()
                .legacy_only()
                .without_status(TicketStatus::Invalid)
                .with_limit(page_size)
                .with_offset(offset);
            let tickets = self.ticket_store().list(&filter)?;
            if tickets.is_empty() {
                break;
            }

            for ticket in tickets {
                let ticket_id = ticket.id.clone();
                let ticket_number = ticket.identifier.ticket_number();

                match self.migrate_one(ticket) {
                    Ok(Outcome::Converted) => {
                        LEGACY_MIGRATIONS.with_label_values(&["converted"]).inc();
                        report.converted += 1;
                    }
                    Ok(Outcome::Skipped) => {
                        LEGACY_MIGRATIONS.with_label_values(&["skipped"]).inc();
                        report.skipped += 1;
                        offset += 1;
                    }
                    Err(message) => {
                        LEGACY_MIGRATIONS.with_label_values(&["error"]).inc();
                        warn!(ticket_id = %ticket_id, error = %message, "Legacy migration failed");
                        report.errors.push(MigrationItemError {
                            ticket_id,
                            ticket_number,
                            message,
                        });
                        offset += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    fn migrate_one(&self, ticket: Ticket) -> Result<Outcome, String> {
        // A printed ticket is already out under its canonical code.
        if ticket.status == TicketStatus::Won || ticket.print.printed {
            return Ok(Outcome::Skipped);
        }

        if let Some(legacy) = &ticket.legacy_barcode {
            if legacy.identifier() != Some(ticket.identifier) {
                return Err(format!(
                    "legacy barcode {} does not match ticket {}",
                    legacy, ticket.identifier
                ));
            }
        }

        let ticket = ensure_codes(self.ticket_store(), self.codec(), ticket)
            .map_err(|e| e.to_string())?;

        match self.ticket_store().transition_status(
            &ticket.id,
            &[TicketStatus::Available, TicketStatus::Sold],
            TicketStatus::Invalid,
        ) {
            Ok(_) => Ok(Outcome::Converted),
            // Drawn in the meantime.
            Err(TicketError::InvalidState { .. }) => Ok(Outcome::Skipped),
            Err(e) => Err(e.to_string()),
        }
    }
}
