use epicenter_core::field;
use epicenter_core::schema::{TableSchema, WorkspaceSchema};

/// A `notes` table with a `body` rich-text field designated as the markdown body, and
/// `title`/`tags` as frontmatter fields.
pub fn notes_schema() -> WorkspaceSchema {
    let notes = TableSchema::builder("notes")
        .field("id", field::id())
        .field("title", field::text())
        .field("tags", field::tags().default_value(field::Value::Tags(Vec::new())))
        .field("body", field::rich_text().nullable())
        .body_field("body")
        .build()
        .expect("notes schema is valid");
    WorkspaceSchema::builder().table(notes).unwrap().build()
}
