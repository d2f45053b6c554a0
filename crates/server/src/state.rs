use std::sync::Arc;

use raffle_core::{
    Config, IdentifierCodec, PrintJobOrchestrator, SaleGuard, SanitizedConfig, TemplateCatalog,
    TicketStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    config_hash: String,
    codec: Arc<IdentifierCodec>,
    templates: Arc<TemplateCatalog>,
    ticket_store: Arc<dyn TicketStore>,
    sale_guard: SaleGuard,
    /// Present only when an image renderer is configured.
    orchestrator: Option<Arc<PrintJobOrchestrator>>,
}

impl AppState {
    pub fn new(
        config: Config,
        config_hash: String,
        codec: Arc<IdentifierCodec>,
        templates: Arc<TemplateCatalog>,
        ticket_store: Arc<dyn TicketStore>,
        orchestrator: Option<Arc<PrintJobOrchestrator>>,
    ) -> Self {
        let sale_guard = SaleGuard::new(Arc::clone(&codec), Arc::clone(&ticket_store));
        Self {
            config,
            config_hash,
            codec,
            templates,
            ticket_store,
            sale_guard,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Short hash of the loaded configuration, for correlating deployments.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn ticket_store(&self) -> &dyn TicketStore {
        self.ticket_store.as_ref()
    }

    pub fn sale_guard(&self) -> &SaleGuard {
        &self.sale_guard
    }

    pub fn orchestrator(&self) -> Option<&Arc<PrintJobOrchestrator>> {
        self.orchestrator.as_ref()
    }
}
