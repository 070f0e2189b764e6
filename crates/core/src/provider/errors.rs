use thiserror::Error;

/// Errors raised by a provider (§4.10, §7). A provider failing to attach does not
/// necessarily stop the workspace from running (§7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider '{provider}' failed to start: {reason}")]
    StartFailed { provider: String, reason: String },

    #[error("provider '{provider}' I/O error: {source}")]
    Io {
        provider: String,
        #[source]
        source: std::io::Error,
    },

    #[error("provider '{provider}' failed to decode a CRDT update: {reason}")]
    DecodeFailed { provider: String, reason: String },
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        "provider-failed"
    }
}

impl From<ProviderError> for crate::Error {
    fn from(err: ProviderError) -> Self {
        crate::Error::Provider(err)
    }
}
