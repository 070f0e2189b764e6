use thiserror::Error;

/// Errors raised by the blob store (§4.9, §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("I/O error on blob '{table}/{name}': {source}")]
    Io {
        table: String,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    pub fn code(&self) -> &'static str {
        "blob-io-failed"
    }
}

impl From<BlobError> for crate::Error {
    fn from(err: BlobError) -> Self {
        crate::Error::Blob(err)
    }
}
