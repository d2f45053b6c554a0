pub mod codec;
pub mod config;
pub mod job;
pub mod layout;
pub mod metrics;
pub mod orchestrator;
pub mod renderer;
pub mod sale;
pub mod template;
pub mod testing;
pub mod ticket;

pub use codec::{
    CanonicalBarcode, Category, CodecConfig, CodecError, IdentifierCodec, IdentifierEncoding,
    LegacyBarcode, TicketIdentifier,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RendererConfig,
    SanitizedConfig,
};
pub use job::{JobError, JobItemError, JobStatus, JobStore, PrintJob, SqliteJobStore};
pub use layout::{Face, LayoutPlan, PageLayoutEngine, Placement};
pub use orchestrator::{
    MigrationReport, OrchestratorConfig, OrchestratorError, PrintJobOrchestrator, PrintRequest,
};
pub use renderer::{HttpImageRenderer, ImageRenderer, RenderRequest, RendererError, Symbology};
pub use sale::{SaleDecision, SaleError, SaleGuard, SaleRejection};
pub use template::{PaperTemplate, TemplateCatalog, TemplateError};
pub use ticket::{SqliteTicketStore, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore};
