//! Testing utilities and mock implementations.
//!
//! Provides a mock image renderer and fixtures for wiring the orchestrator,
//! sale guard and stores against in-memory SQLite.
//!
//! # Example
//!
//! ```rust,ignore
//! use raffle_core::testing::{fixtures, MockImageRenderer};
//!
//! let tickets = fixtures::ticket_store_with_pool(Category::A, 1, 50);
//! let renderer = Arc::new(MockImageRenderer::new());
//!
//! // Configure failures
//! renderer.fail_ticket(&ticket_id).await;
//! ```

mod mock_renderer;

pub use mock_renderer::MockImageRenderer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::codec::{Category, CodecConfig, IdentifierCodec, TicketIdentifier};
    use crate::job::SqliteJobStore;
    use crate::orchestrator::{OrchestratorConfig, PrintJobOrchestrator};
    use crate::renderer::ImageRenderer;
    use crate::template::TemplateCatalog;
    use crate::ticket::{SqliteTicketStore, Ticket, TicketStore};

    /// Codec with the default deployment prefix and category codes.
    pub fn codec() -> IdentifierCodec {
        IdentifierCodec::new(&CodecConfig::default()).unwrap()
    }

    /// In-memory ticket store holding `category` tickets `first..=last`.
    pub fn ticket_store_with_pool(category: Category, first: u32, last: u32) -> SqliteTicketStore {
        let store = SqliteTicketStore::in_memory().unwrap();
        store.create_pool(category, first, last).unwrap();
        store
    }

    /// Looks up a ticket that must exist.
    pub fn ticket(store: &dyn TicketStore, category: Category, sequence: u32) -> Ticket {
        store
            .find_by_identifier(&TicketIdentifier::new(category, sequence))
            .unwrap()
            .unwrap_or_else(|| panic!("ticket {}-{} missing", category, sequence))
    }

    /// Orchestrator config with small batches for exercising cancellation
    /// and progress coalescing.
    pub fn small_batch_config(batch_size: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrency: 4,
            call_timeout_ms: 1_000,
            batch_size,
            progress_step: 1,
        }
    }

    /// Everything an orchestrator test needs, sharing one set of stores.
    pub struct OrchestratorHarness {
        pub orchestrator: Arc<PrintJobOrchestrator>,
        pub tickets: Arc<SqliteTicketStore>,
        pub jobs: Arc<SqliteJobStore>,
        pub codec: Arc<IdentifierCodec>,
    }

    /// Orchestrator over in-memory stores seeded with `category`
    /// tickets `first..=last` and the built-in templates.
    pub fn orchestrator(
        config: OrchestratorConfig,
        renderer: Arc<dyn ImageRenderer>,
        category: Category,
        first: u32,
        last: u32,
    ) -> OrchestratorHarness {
        let tickets = Arc::new(ticket_store_with_pool(category, first, last));
        let jobs = Arc::new(SqliteJobStore::in_memory().unwrap());
        let codec = Arc::new(codec());

        let orchestrator = Arc::new(PrintJobOrchestrator::new(
            config,
            Arc::clone(&codec),
            Arc::new(TemplateCatalog::builtin()),
            tickets.clone(),
            jobs.clone(),
            renderer,
        ));

        OrchestratorHarness {
            orchestrator,
            tickets,
            jobs,
            codec,
        }
    }
}
