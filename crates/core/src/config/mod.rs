//! Process-wide configuration (§9: "no global mutable state beyond an immutable
//! config root"): a filesystem root and environment overrides, built once at process
//! start and handed to an [`crate::Epicenter`] by value.

use std::env;
use std::path::{Path, PathBuf};

/// The immutable configuration root every workspace in an [`crate::Epicenter`] shares:
/// where materializers and providers write their backing files, and environment
/// variable overrides resolved once at construction time.
#[derive(Debug, Clone)]
pub struct EpicenterConfig {
    root: PathBuf,
}

impl EpicenterConfig {
    /// Build a config rooted at `root`. Prefer [`Self::from_env`] in a CLI/server
    /// binary so `EPICENTER_ROOT` can override it without a recompile.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the config root from the `EPICENTER_ROOT` environment variable,
    /// falling back to `default_root` if it is unset (matching the teacher binary's
    /// env-override-with-fallback pattern for its data directory).
    pub fn from_env(default_root: impl Into<PathBuf>) -> Self {
        let root = env::var("EPICENTER_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_root.into());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory a given workspace's materializers/providers should write under:
    /// `<root>/<workspace-id>`.
    pub fn workspace_root(&self, workspace_id: &str) -> PathBuf {
        self.root.join(workspace_id)
    }
}
