use thiserror::Error;

/// Errors raised during workspace construction and lifecycle (§3, §7). Construction
/// errors (schema mis-declaration) are fatal; lifecycle errors (a materializer's
/// initial pull, a provider's start) are logged and surfaced to the host but do not
/// necessarily prevent the workspace from running (§7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Schema(#[from] crate::schema::SchemaError),

    #[error("materializer '{materializer}' failed its initial pull: {source}")]
    InitialPullFailed {
        materializer: String,
        #[source]
        source: crate::materializer::MaterializerError,
    },

    #[error("provider '{provider}' failed to start: {source}")]
    ProviderStartFailed {
        provider: String,
        #[source]
        source: crate::provider::ProviderError,
    },
}

impl WorkspaceError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkspaceError::Schema(e) => e.code(),
            WorkspaceError::InitialPullFailed { .. } => "materializer-failed",
            WorkspaceError::ProviderStartFailed { .. } => "provider-failed",
        }
    }
}

impl From<WorkspaceError> for crate::Error {
    fn from(err: WorkspaceError) -> Self {
        crate::Error::Workspace(err)
    }
}
