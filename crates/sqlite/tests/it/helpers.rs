use epicenter_core::field;
use epicenter_core::schema::{TableSchema, WorkspaceSchema};

pub fn notes_schema_v1() -> WorkspaceSchema {
    let notes = TableSchema::builder("notes")
        .field("id", field::id())
        .field("title", field::text())
        .build()
        .expect("notes v1 schema is valid");
    WorkspaceSchema::builder().table(notes).unwrap().build()
}

/// A later "version" of the same table with an extra column, used to simulate schema
/// drift between runs (§8 scenario S4).
pub fn notes_schema_v2() -> WorkspaceSchema {
    let notes = TableSchema::builder("notes")
        .field("id", field::id())
        .field("title", field::text())
        .field("priority", field::integer().default_value(field::Value::Integer(0)))
        .build()
        .expect("notes v2 schema is valid");
    WorkspaceSchema::builder().table(notes).unwrap().build()
}
