use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::codec::{Category, CodecConfig};
use crate::orchestrator::OrchestratorConfig;
use crate::template::PaperTemplate;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// External image renderer. Without it the server cannot print.
    #[serde(default)]
    pub renderer: Option<RendererConfig>,
    /// Paper templates added to the built-in catalog.
    #[serde(default)]
    pub templates: Vec<PaperTemplate>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long a write waits for the database lock (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("raffle.db")
}

fn default_busy_timeout() -> u64 {
    5000
}

/// HTTP image renderer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RendererConfig {
    /// Base URL, e.g. `http://localhost:9000`
    pub url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: SanitizedDatabaseConfig,
    pub codec: SanitizedCodecConfig,
    pub orchestrator: OrchestratorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<SanitizedRendererConfig>,
    /// Names of configured extra templates.
    pub templates: Vec<String>,
}

/// Database settings without the file location.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDatabaseConfig {
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCodecConfig {
    pub prefix: String,
    pub verification_base_url: String,
    /// Mapped categories only.
    pub categories: Vec<SanitizedCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCategory {
    pub category: Category,
    pub code: String,
    pub max_sequence: u32,
}

/// Sanitized renderer config (URL hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRendererConfig {
    pub configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: SanitizedDatabaseConfig {
                busy_timeout_ms: config.database.busy_timeout_ms,
            },
            codec: SanitizedCodecConfig {
                prefix: config.codec.prefix.clone(),
                verification_base_url: config.codec.verification_base_url.clone(),
                categories: config
                    .codec
                    .categories
                    .entries()
                    .map(|(category, c)| SanitizedCategory {
                        category,
                        code: c.code.clone(),
                        max_sequence: c.max_sequence,
                    })
                    .collect(),
            },
            orchestrator: config.orchestrator.clone(),
            renderer: config.renderer.as_ref().map(|r| SanitizedRendererConfig {
                configured: !r.url.is_empty(),
                timeout_secs: r.timeout_secs,
            }),
            templates: config.templates.iter().map(|t| t.name.clone()).collect(),
        }
    }
}
