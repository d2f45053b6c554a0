//! Point-of-sale integration tests.
//!
//! Covers the guard against printed, sold and migrated tickets sharing one
//! store with the orchestrator.

use std::sync::Arc;

use raffle_core::{
    testing::{fixtures, MockImageRenderer},
    Category, LegacyBarcode, OrchestratorConfig, PrintRequest, SaleDecision, SaleGuard,
    SaleRejection, TicketIdentifier, TicketStatus, TicketStore,
};

struct TestHarness {
    inner: fixtures::OrchestratorHarness,
    guard: SaleGuard,
}

impl TestHarness {
    fn new(first: u32, last: u32) -> Self {
        let inner = fixtures::orchestrator(
            OrchestratorConfig::default(),
            Arc::new(MockImageRenderer::new()),
            Category::A,
            first,
            last,
        );
        let guard = SaleGuard::new(
            Arc::clone(&inner.codec),
            Arc::clone(&inner.tickets) as Arc<dyn TicketStore>,
        );
        Self { inner, guard }
    }

    fn barcode(&self, category: Category, sequence: u32) -> String {
        self.inner
            .codec
            .encode(category, sequence)
            .unwrap()
            .into_string()
    }

    fn import_legacy(&self, category: Category, sequence: u32) {
        let identifier = TicketIdentifier::new(category, sequence);
        let legacy = LegacyBarcode::from_identifier(&identifier).unwrap();
        self.inner
            .tickets
            .create_legacy(identifier, legacy)
            .unwrap();
    }
}

#[test]
fn test_checksum_is_enforced() {
    let h = TestHarness::new(1, 5);

    // Well-formed but no such ticket in the pool.
    let decision = h.guard.validate_for_sale("9780011234564").unwrap();
    assert_eq!(decision.rejection(), Some(SaleRejection::NotFound));

    // Same digits with a wrong check digit.
    let decision = h.guard.validate_for_sale("9780011234567").unwrap();
    assert_eq!(decision.rejection(), Some(SaleRejection::InvalidFormat));
}

#[test]
fn test_sell_then_resell() {
    let h = TestHarness::new(1, 5);
    let barcode = h.barcode(Category::A, 3);

    let sold = h.guard.sell(&barcode).unwrap();
    let SaleDecision::Accepted { ticket } = sold else {
        panic!("expected sale to be accepted, got {:?}", sold);
    };
    assert_eq!(ticket.status, TicketStatus::Sold);
    assert_eq!(ticket.barcode.map(|b| b.into_string()), Some(barcode.clone()));

    assert_eq!(
        h.guard.sell(&barcode).unwrap().rejection(),
        Some(SaleRejection::AlreadySold)
    );
    assert_eq!(
        h.guard.validate_for_sale(&barcode).unwrap().rejection(),
        Some(SaleRejection::AlreadySold)
    );
}

#[tokio::test]
async fn test_printed_ticket_sells_with_printed_code() {
    let h = TestHarness::new(1, 3);
    let job = h
        .inner
        .orchestrator
        .create_job(&PrintRequest::new(Category::A, 1, 3, "a4-grid-3x8"))
        .unwrap();
    h.inner.orchestrator.run(&job.id).await.unwrap();

    let printed = fixtures::ticket(h.inner.tickets.as_ref(), Category::A, 2);
    let barcode = printed.barcode.clone().unwrap().into_string();

    let SaleDecision::Accepted { ticket } = h.guard.sell(&barcode).unwrap() else {
        panic!("printed ticket should sell");
    };
    assert_eq!(ticket.id, printed.id);
    assert_eq!(ticket.verification_ref, printed.verification_ref);
    assert_eq!(ticket.print.print_count, 1);
}

#[test]
fn test_migrated_ticket_is_superseded() {
    let h = TestHarness::new(1, 2);
    h.import_legacy(Category::C, 7);
    h.import_legacy(Category::C, 8);

    let report = h.inner.orchestrator.migrate_legacy().unwrap();
    assert_eq!(report.converted, 2);

    let barcode = h.barcode(Category::C, 7);
    let decision = h.guard.validate_for_sale(&barcode).unwrap();
    let SaleDecision::Rejected {
        reason: SaleRejection::SupersededTicket,
        ticket: Some(ticket),
    } = decision
    else {
        panic!("expected superseded rejection, got {:?}", decision);
    };
    assert_eq!(ticket.identifier, TicketIdentifier::new(Category::C, 7));
    assert_eq!(
        ticket.legacy_barcode.map(|b| b.as_str().to_string()),
        Some("30000007".to_string())
    );

    // Selling is refused the same way and leaves the ticket untouched.
    assert_eq!(
        h.guard.sell(&barcode).unwrap().rejection(),
        Some(SaleRejection::SupersededTicket)
    );
    assert_eq!(
        fixtures::ticket(h.inner.tickets.as_ref(), Category::C, 7).status,
        TicketStatus::Invalid
    );

    // The retired 8-digit code is not a valid barcode.
    assert_eq!(
        h.guard.validate_for_sale("30000007").unwrap().rejection(),
        Some(SaleRejection::InvalidFormat)
    );
}

#[test]
fn test_migrated_tickets_excluded_from_print_jobs() {
    let h = TestHarness::new(1, 2);
    h.import_legacy(Category::C, 1);
    h.import_legacy(Category::C, 2);
    h.inner.orchestrator.migrate_legacy().unwrap();

    let result = h
        .inner
        .orchestrator
        .create_job(&PrintRequest::new(Category::C, 1, 2, "a4-grid-3x8"));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_legacy_ticket_in_print_range_is_migrated_not_printed() {
    let h = TestHarness::new(1, 2);
    h.import_legacy(Category::C, 5);
    h.inner.tickets.create_pool(Category::C, 1, 10).unwrap();

    // Not migrated yet, but the legacy import is still refused.
    let barcode = h.barcode(Category::C, 5);
    assert_eq!(
        h.guard.validate_for_sale(&barcode).unwrap().rejection(),
        Some(SaleRejection::SupersededTicket)
    );

    let job = h
        .inner
        .orchestrator
        .create_job(&PrintRequest::new(Category::C, 1, 10, "a4-grid-3x8"))
        .unwrap();
    assert_eq!(job.total_tickets, 9);

    let job = h.inner.orchestrator.run(&job.id).await.unwrap();
    assert_eq!(job.printed_count, 9);

    let legacy = fixtures::ticket(h.inner.tickets.as_ref(), Category::C, 5);
    assert_eq!(legacy.status, TicketStatus::Invalid);
    assert!(!legacy.print.printed);
    assert_eq!(legacy.print.print_count, 0);
    assert_eq!(legacy.barcode.map(|b| b.into_string()), Some(barcode.clone()));

    // Nothing left for a later global pass.
    let report = h.inner.orchestrator.migrate_legacy().unwrap();
    assert_eq!(report.converted, 0);

    let neighbour = h.barcode(Category::C, 6);
    assert!(h.guard.validate_for_sale(&neighbour).unwrap().is_accepted());
}

#[tokio::test]
async fn test_migration_skips_ticket_printed_under_canonical_code() {
    let h = TestHarness::new(1, 2);
    h.import_legacy(Category::B, 3);

    // Printed under its canonical code by an earlier job.
    let ticket = fixtures::ticket(h.inner.tickets.as_ref(), Category::B, 3);
    raffle_core::ticket::ensure_codes(h.inner.tickets.as_ref(), &h.inner.codec, ticket.clone())
        .unwrap();
    h.inner
        .tickets
        .mark_printed("earlier-job", &[ticket.id.clone()])
        .unwrap();

    let report = h.inner.orchestrator.migrate_legacy().unwrap();
    assert_eq!(report.converted, 0);
    assert_eq!(report.skipped, 1);

    let barcode = h.barcode(Category::B, 3);
    assert!(h.guard.validate_for_sale(&barcode).unwrap().is_accepted());
}
