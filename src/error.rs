//! # Errors
//!
//! Configuration-level failures. These are the only errors that escape the
//! conversion pipeline; per-identity data problems are recorded on the
//! identity itself and logged instead.

use crate::vocabulary::Vocabulary;
use thiserror::Error;

/// Fatal errors that stop a conversion run.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("malformed {vocabulary} vocabulary at line {line}: {content:?}")]
    MalformedVocabulary {
        vocabulary: Vocabulary,
        line: usize,
        content: String,
    },

    #[error("{vocabulary} vocabulary has not been loaded")]
    MissingVocabulary { vocabulary: Vocabulary },

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("invalid date window: from ({from}) must be before until ({until})")]
    InvalidDateWindow { from: time::Date, until: time::Date },

    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConversionError>;
