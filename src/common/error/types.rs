//! Unified error types for Quince.
//!
//! Corpus construction problems are reported once, by
//! [`IdentifierBuilder::build`](crate::IdentifierBuilder::build). The only
//! error an identification call can return is a failure of its byte source.
use crate::identifier::FormatId;
use thiserror::Error;

/// Main error type for Quince operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading the byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pattern notation or segment list is malformed
    #[error("Invalid pattern `{notation}`: {reason}")]
    InvalidPattern { notation: String, reason: String },

    /// Signature violates an anchoring or offset invariant
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Format identity is not of the form `namespace/code`
    #[error("Invalid format identity `{0}`")]
    InvalidFormatId(String),

    /// Two formats were registered under the same identity
    #[error("Duplicate format: {0}")]
    DuplicateFormat(FormatId),

    /// A priority relation names a format the corpus does not contain
    #[error("Format {format} declares priority over unknown format {target}")]
    UnknownPriority { format: FormatId, target: FormatId },

    /// The priority graph is not acyclic
    #[error("Priority cycle through {0}")]
    PriorityCycle(FormatId),

    /// Container could not be opened or a member could not be read
    #[error("Container error: {0}")]
    Container(String),

    /// Configuration could not be parsed or serialized
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_pattern(notation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPattern {
            notation: notation.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for Quince operations.
pub type Result<T> = std::result::Result<T, Error>;
