use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raffle_core::{
    load_config, validate_config, HttpImageRenderer, IdentifierCodec, ImageRenderer, JobStore,
    PrintJobOrchestrator, SqliteJobStore, SqliteTicketStore, TemplateCatalog, TicketStore,
};
use raffle_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("RAFFLE_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run() -> Result<()> {
    init_logging();

    // Determine config path
    let config_path = std::env::var("RAFFLE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash = config_hash[..16].to_string();
    info!(config_hash = %config_hash, "Configuration fingerprint");

    let codec = Arc::new(
        IdentifierCodec::new(&config.codec).context("Failed to build identifier codec")?,
    );
    let templates = Arc::new(
        TemplateCatalog::with_extra(config.templates.clone())
            .context("Failed to load paper templates")?,
    );
    info!("Template catalog loaded with {} templates", templates.len());

    let busy_timeout = Duration::from_millis(config.database.busy_timeout_ms);

    // Create SQLite ticket store
    let ticket_store: Arc<dyn TicketStore> = Arc::new(
        SqliteTicketStore::with_busy_timeout(&config.database.path, busy_timeout)
            .context("Failed to create ticket store")?,
    );
    info!("Ticket store initialized");

    // Create SQLite job store
    let job_store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::with_busy_timeout(&config.database.path, busy_timeout)
            .context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Printing needs a renderer
    let orchestrator = match &config.renderer {
        Some(renderer_config) => {
            info!("Initializing HTTP image renderer at {}", renderer_config.url);
            let renderer: Arc<dyn ImageRenderer> = Arc::new(
                HttpImageRenderer::new(renderer_config)
                    .context("Failed to create image renderer")?,
            );
            Some(Arc::new(PrintJobOrchestrator::new(
                config.orchestrator.clone(),
                Arc::clone(&codec),
                Arc::clone(&templates),
                Arc::clone(&ticket_store),
                job_store,
                renderer,
            )))
        }
        None => {
            warn!("No renderer configured, print jobs and legacy migration are disabled");
            None
        }
    };

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        config_hash,
        codec,
        templates,
        ticket_store,
        orchestrator,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
