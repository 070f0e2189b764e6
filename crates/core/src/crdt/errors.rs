use thiserror::Error;

/// Errors raised by the CRDT document (§4.3, §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CrdtError {
    /// A table name was referenced that the document has no sub-map for.
    #[error("unknown table '{table}'")]
    UnknownTable {
        /// The table name.
        table: String,
    },

    /// Bytes received from a peer or persistence provider could not be decoded.
    #[error("failed to decode CRDT update: {reason}")]
    DecodeFailed {
        /// The underlying decode failure.
        reason: String,
    },

    /// The document could not be serialized for persistence/sync.
    #[error("failed to encode CRDT state: {reason}")]
    EncodeFailed {
        /// The underlying encode failure.
        reason: String,
    },
}

impl CrdtError {
    /// The stable taxonomy code for this error (§7).
    pub fn code(&self) -> &'static str {
        match self {
            CrdtError::UnknownTable { .. } => "unknown-table",
            CrdtError::DecodeFailed { .. } => "decode-failed",
            CrdtError::EncodeFailed { .. } => "encode-failed",
        }
    }
}

impl From<CrdtError> for crate::Error {
    fn from(err: CrdtError) -> Self {
        crate::Error::Crdt(err)
    }
}
