use thiserror::Error;

/// Errors raised while assembling or running an [`crate::Epicenter`] (§3 invariant 6, §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EpicenterError {
    /// Two registered workspaces declared the same id (§3 invariant 5: "a workspace id
    /// is globally unique within an Epicenter").
    #[error("workspace id '{id}' is registered more than once")]
    DuplicateWorkspace { id: String },

    /// A workspace declared a dependency on an id nothing was registered under.
    #[error("workspace '{workspace}' depends on unknown workspace '{dependency}'")]
    UnknownDependency { workspace: String, dependency: String },

    /// The declared dependency edges form a cycle (§3 invariant 6, §7 `dependency-cycle`).
    #[error("workspace dependencies form a cycle: {cycle}")]
    DependencyCycle { cycle: String },

    #[error("workspace '{workspace}' failed to start: {source}")]
    WorkspaceStartFailed {
        workspace: String,
        #[source]
        source: crate::workspace::WorkspaceError,
    },
}

impl EpicenterError {
    /// The stable taxonomy code for this error (§7).
    pub fn code(&self) -> &'static str {
        match self {
            EpicenterError::DependencyCycle { .. } => "dependency-cycle",
            EpicenterError::DuplicateWorkspace { .. } => "duplicate-workspace",
            EpicenterError::UnknownDependency { .. } => "unknown-dependency",
            EpicenterError::WorkspaceStartFailed { .. } => "workspace-start-failed",
        }
    }
}

impl From<EpicenterError> for crate::Error {
    fn from(err: EpicenterError) -> Self {
        crate::Error::Epicenter(err)
    }
}
