use thiserror::Error;

/// Errors this crate can return directly from its own helpers (the materializer
/// methods themselves report through [`epicenter_core::materializer::MaterializerError`]).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed frontmatter in '{path}': {reason}")]
    MalformedFrontmatter { path: String, reason: String },

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
