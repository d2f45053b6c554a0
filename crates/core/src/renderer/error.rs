use thiserror::Error;

/// Errors returned by an image renderer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RendererError {
    #[error("renderer timed out")]
    Timeout,

    #[error("renderer connection failed: {0}")]
    ConnectionFailed(String),

    #[error("renderer rejected request: {0}")]
    Rejected(String),

    #[error("renderer API error: {0}")]
    ApiError(String),
}
