use thiserror::Error;

use crate::field::FieldError;

/// Errors raised by the Table API (§4.4, §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TableError {
    /// `insert` was called with an id that already exists.
    #[error("row '{id}' already exists in table '{table}'")]
    IdConflict { table: String, id: String },

    /// `update` (or an action relying on row existence) referenced an absent id.
    #[error("row '{id}' was not found in table '{table}'")]
    RowNotFound { table: String, id: String },

    /// A write's row failed one or more field validators.
    #[error("row failed validation in table '{table}': {errors:?}")]
    ValidationFailed { table: String, errors: Vec<FieldError> },

    /// An empty or all-whitespace id was supplied on write.
    #[error("id must not be empty (table '{table}')")]
    BadId { table: String },

    /// No table with this name is declared in the workspace schema.
    #[error("no table named '{table}' is declared in this workspace")]
    UnknownTable { table: String },
}

impl TableError {
    pub fn code(&self) -> &'static str {
        match self {
            TableError::IdConflict { .. } => "id-conflict",
            TableError::RowNotFound { .. } => "row-not-found",
            TableError::ValidationFailed { .. } => "validation-failed",
            TableError::BadId { .. } => "bad-id",
            TableError::UnknownTable { .. } => "unknown-table",
        }
    }
}

impl From<TableError> for crate::Error {
    fn from(err: TableError) -> Self {
        crate::Error::Table(err)
    }
}
