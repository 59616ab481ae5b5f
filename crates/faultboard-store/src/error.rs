//! Error types for store access and link mutation

use faultboard_graph::RecordId;

/// Document store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("document not found: {0}")]
    NotFound(RecordId),

    /// Document id is already taken
    #[error("document already exists: {0}")]
    AlreadyExists(RecordId),

    /// A document read by the transaction changed before commit
    #[error("transaction conflict on document {0}")]
    Conflict(RecordId),

    /// An array transform targeted a field holding something else
    #[error("field {field} of document {id} is not an array")]
    NotAnArray {
        /// Document id
        id: RecordId,
        /// Field name
        field: String,
    },

    /// Store rejected or could not process the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if retrying the same operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}

/// Link and unlink failures
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transaction was rejected; nothing was written
    #[error("link transaction failed: {0}")]
    Transaction(#[from] StoreError),

    /// Link entry could not be encoded
    #[error("link entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LinkError {
    /// Check if the caller may retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transaction(e) => e.is_retryable(),
            Self::Encode(_) => false,
        }
    }
}
