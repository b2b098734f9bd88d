//! Error types for decoding and compaction

use thiserror::Error;

/// Errors raised by the builder, the extent list and the compactors
#[derive(Error, Debug)]
pub enum CompactError {
    /// Disk map contains a character other than a decimal digit
    #[error("Malformed input: unexpected character {found:?} at offset {offset} in {input:?}")]
    MalformedInput {
        input: String,
        offset: usize,
        found: char,
    },

    /// List structure broken by an edit; always a bug in this crate
    #[error("Invariant violation (internal bug, please report): {0}")]
    InvariantViolation(String),

    /// Reading input or configuration failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CompactError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        CompactError::InvariantViolation(message.into())
    }

    /// True for errors that indicate a bug in this crate rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, CompactError::InvariantViolation(_))
    }
}

impl From<toml::de::Error> for CompactError {
    fn from(err: toml::de::Error) -> Self {
        CompactError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompactError>;
