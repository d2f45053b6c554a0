//! Error types for the template catalog.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No template with that name.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Geometry violates the tiling contract.
    #[error("template {name} has invalid geometry: {reason}")]
    InvalidGeometry { name: String, reason: String },

    /// Two templates share a name.
    #[error("duplicate template name: {0}")]
    Duplicate(String),
}
