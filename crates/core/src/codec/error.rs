//! Error types for the identifier codec.

use thiserror::Error;

use super::Category;

/// Errors raised when the codec is misused. These are caller errors and are
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The category is unknown or has no code mapped in this deployment.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// The sequence is zero or exceeds the category's capacity.
    #[error("sequence {sequence} out of range for category {category} (1..={max})")]
    SequenceOutOfRange {
        category: Category,
        sequence: u32,
        max: u32,
    },

    /// The codec configuration is not usable.
    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),
}
