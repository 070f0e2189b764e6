use thiserror::Error;

/// Errors raised by a materializer (§4.6, §7). A handler error never rolls back the
/// CRDT; it is logged by the Observer Bus and the materializer's failure counter is
/// incremented (§4.5).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MaterializerError {
    #[error("materializer '{materializer}' failed to write row '{id}' in table '{table}': {reason}")]
    WriteFailed {
        materializer: String,
        table: String,
        id: String,
        reason: String,
    },

    #[error("materializer '{materializer}' failed to read from its backing store: {reason}")]
    ReadFailed { materializer: String, reason: String },

    #[error("materializer '{materializer}' detected schema drift: {reason}")]
    SchemaDrift { materializer: String, reason: String },

    #[error("materializer '{materializer}' I/O error: {0}", materializer = .materializer)]
    Io {
        materializer: String,
        #[source]
        source: std::io::Error,
    },
}

impl MaterializerError {
    pub fn code(&self) -> &'static str {
        match self {
            MaterializerError::SchemaDrift { .. } => "schema-drift",
            _ => "materializer-failed",
        }
    }
}

impl From<MaterializerError> for crate::Error {
    fn from(err: MaterializerError) -> Self {
        crate::Error::Materializer(err)
    }
}
