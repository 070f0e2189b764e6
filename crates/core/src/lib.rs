//!
//! Epicenter: a local-first collaborative workspace runtime.
//!
//! This crate provides the core components for declaring a [`Workspace`], hosting its
//! authoritative state in a CRDT document, and keeping any number of external
//! [`Materializer`]s continuously consistent with that state.
//!
//! ## Core Concepts
//!
//! * **Fields** ([`field`]): typed column descriptors with validators and defaults.
//! * **Schema** ([`schema`]): a table-name -> field-map declaration for a workspace.
//! * **CRDT document** ([`crdt`]): the authoritative, mergeable state backing every table.
//! * **Tables** ([`table`]): a typed read/write handle bound to one table of a workspace.
//! * **Observer Bus** ([`observer`]): turns CRDT commits into ordered per-row events.
//! * **Materializers** ([`materializer`]): mirror CRDT state into external stores.
//! * **Actions** ([`action`]): named queries/mutations exposed by a workspace.
//! * **Workspace** ([`workspace`]): ties schema, CRDT, materializers, providers and
//!   actions together into one runnable unit.
//! * **Epicenter** ([`epicenter`]): an ordered collection of workspaces with a
//!   dependency DAG, sharing one config root.
//!
//! [`Workspace`]: workspace::Workspace
//! [`Materializer`]: materializer::Materializer

pub mod action;
pub mod blob;
pub mod config;
pub mod crdt;
pub mod date;
pub mod epicenter;
pub mod field;
pub mod id;
pub mod materializer;
pub mod observer;
pub mod provider;
pub mod schema;
pub mod table;
pub mod workspace;

pub use config::EpicenterConfig;
pub use epicenter::Epicenter;
pub use schema::WorkspaceSchema;
pub use table::Table;
pub use workspace::Workspace;

/// Result type used throughout the Epicenter runtime.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type aggregating every module's structured error enum.
///
/// Each variant wraps a submodule's own `#[non_exhaustive]` error type, so callers that
/// only care about one subsystem can match on `Error::Table(TableError::RowNotFound { .. })`
/// without losing the detail that submodule attaches.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Field(#[from] field::FieldError),

    #[error(transparent)]
    Schema(#[from] schema::SchemaError),

    #[error(transparent)]
    Crdt(#[from] crdt::CrdtError),

    #[error(transparent)]
    Table(#[from] table::TableError),

    #[error(transparent)]
    Observer(#[from] observer::ObserverError),

    #[error(transparent)]
    Materializer(#[from] materializer::MaterializerError),

    #[error(transparent)]
    Blob(#[from] blob::BlobError),

    #[error(transparent)]
    Provider(#[from] provider::ProviderError),

    #[error(transparent)]
    Action(#[from] action::ActionError),

    #[error(transparent)]
    Workspace(#[from] workspace::WorkspaceError),

    #[error(transparent)]
    Epicenter(#[from] epicenter::EpicenterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The originating module, for structured logging/metrics.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Field(_) => "field",
            Error::Schema(_) => "schema",
            Error::Crdt(_) => "crdt",
            Error::Table(_) => "table",
            Error::Observer(_) => "observer",
            Error::Materializer(_) => "materializer",
            Error::Blob(_) => "blob",
            Error::Provider(_) => "provider",
            Error::Action(_) => "action",
            Error::Workspace(_) => "workspace",
            Error::Epicenter(_) => "epicenter",
            Error::Io(_) => "io",
        }
    }

    /// The stable error `code` string from §7 of the taxonomy, where one applies.
    ///
    /// Returns `None` for errors that are not part of the documented code taxonomy
    /// (e.g. a bare I/O failure reaching across a module boundary).
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::Field(e) => Some(e.code()),
            Error::Table(e) => Some(e.code()),
            Error::Materializer(e) => Some(e.code()),
            Error::Provider(e) => Some(e.code()),
            Error::Workspace(e) => Some(e.code()),
            _ => None,
        }
    }
}
