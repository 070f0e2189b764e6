use thiserror::Error;

/// Errors raised while declaring or validating against a [`WorkspaceSchema`](super::WorkspaceSchema) (§4.2, §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table '{table}' is declared more than once")]
    DuplicateTable { table: String },

    #[error("table '{table}' has no 'id' field")]
    MissingIdField { table: String },

    #[error("table '{table}' has no field named '{field}'")]
    UnknownField { table: String, field: String },

    #[error("no table named '{table}' is declared in this workspace")]
    UnknownTable { table: String },

    #[error("row failed validation: {0:?}")]
    ValidationFailed(Vec<crate::field::FieldError>),

    #[error("table '{table}' declares '{designated}' as its body field, but no such field exists")]
    UnknownBodyField { table: String, designated: String },
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::ValidationFailed(_) => "validation-failed",
            _ => "schema-error",
        }
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
