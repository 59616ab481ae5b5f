//! Error types for the grouping layer
//!
//! Malformed links (self references, dangling targets, duplicate entries)
//! are normalized by the engine and never reach these types. Only schema
//! violations and invalid palette definitions are reported.

/// Record decoding errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Document fields do not match the record schema
    #[error("record {id} does not match the record schema: {source}")]
    Decode {
        /// Document id the failure belongs to
        id: String,
        /// Underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// Document body is not a JSON object
    #[error("record {0} is not an object")]
    NotAnObject(String),

    /// Record could not be encoded back into document fields
    #[error("record {id} could not be encoded: {source}")]
    Encode {
        /// Record id
        id: String,
        /// Underlying serialization error
        #[source]
        source: serde_json::Error,
    },
}

/// Palette and color errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    /// Palette must contain at least one color
    #[error("palette is empty")]
    EmptyPalette,

    /// Color is not a `#rrggbb` hex string
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}
