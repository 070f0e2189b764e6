use epicenter_core::field;
use epicenter_core::schema::{TableSchema, WorkspaceSchema};

/// A small `notes` schema shared by several integration tests: `id`, `title`, an
/// integer `views` counter defaulting to zero, and a `done` flag.
pub fn notes_schema() -> WorkspaceSchema {
    let notes = TableSchema::builder("notes")
        .field("id", field::id())
        .field("title", field::text())
        .field("views", field::integer().default_value(field::Value::Integer(0)))
        .field("done", field::boolean().default_value(field::Value::Boolean(false)))
        .build()
        .expect("notes table schema is valid");
    WorkspaceSchema::builder()
        .table(notes)
        .expect("only one table declared")
        .build()
}
