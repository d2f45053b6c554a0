use super::{types::Config, ConfigError};
use crate::codec::IdentifierCodec;
use crate::template::TemplateCatalog;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Codec prefix and category codes (via the codec itself)
/// - Orchestrator limits are positive
/// - Renderer URL is http(s)
/// - Extra templates tile their pages and do not clash with built-ins
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    IdentifierCodec::new(&config.codec)
        .map_err(|e| ConfigError::ValidationError(format!("codec: {}", e)))?;

    let orchestrator = &config.orchestrator;
    if orchestrator.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_concurrency must be at least 1".to_string(),
        ));
    }
    if orchestrator.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.batch_size must be at least 1".to_string(),
        ));
    }
    if orchestrator.call_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.call_timeout_ms cannot be 0".to_string(),
        ));
    }

    if let Some(renderer) = &config.renderer {
        if !renderer.url.starts_with("http://") && !renderer.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "renderer.url must be an http(s) URL, got {:?}",
                renderer.url
            )));
        }
    }

    TemplateCatalog::with_extra(config.templates.clone())
        .map_err(|e| ConfigError::ValidationError(format!("templates: {}", e)))?;

    Ok(())
}
