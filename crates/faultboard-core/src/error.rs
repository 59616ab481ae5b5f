//! Error types for board sessions and configuration
//!
//! [`BoardError`] wraps the lower layers and adds the link preconditions a
//! session checks before asking the mutator to write.

use faultboard_graph::{ColorError, RecordError, RecordId};
use faultboard_store::{LinkError, StoreError};
use std::path::PathBuf;

/// Board session errors
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Store access failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Link or unlink transaction failed
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// A document violates the record schema
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// Session configuration is invalid
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Record is not in the current snapshot
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Only fault records can be linked
    #[error("record {0} is not a fault record")]
    NotAFault(RecordId),

    /// Source and target are the same record
    #[error("cannot link record {0} to itself")]
    SelfLink(RecordId),

    /// Target record is closed
    #[error("cannot link to closed record {0}")]
    TargetClosed(RecordId),

    /// Link already exists in either direction
    #[error("records {source_id} and {target_id} are already linked")]
    AlreadyLinked {
        /// Record initiating the link
        source_id: RecordId,
        /// Record being linked to
        target_id: RecordId,
    },

    /// New record failed validation
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl BoardError {
    /// Check if retrying the same operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Link(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error is a rejected link precondition
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotAFault(_)
                | Self::SelfLink(_)
                | Self::TargetClosed(_)
                | Self::AlreadyLinked { .. }
        )
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Palette entry rejected
    #[error("invalid palette: {0}")]
    Palette(#[from] ColorError),

    /// A required value is missing or empty
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
