//! SQL table definition and drift-fingerprinting for [`crate::SqliteMaterializer`] (§4.7).

use std::hash::{Hash, Hasher};

use epicenter_core::field::FieldKind;
use epicenter_core::schema::TableSchema;

fn sql_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Id => "TEXT PRIMARY KEY",
        FieldKind::Text | FieldKind::RichText | FieldKind::Date | FieldKind::Select { .. } | FieldKind::Tags { .. } | FieldKind::Json { .. } => {
            "TEXT"
        }
        FieldKind::Integer { .. } | FieldKind::Boolean => "INTEGER",
    }
}

/// The `CREATE TABLE` statement for `table_schema`, one column per declared field in
/// declaration order (§4.7, §6's field-kind to SQL-type mapping).
pub fn create_table_sql(table_schema: &TableSchema) -> String {
    let columns: Vec<String> = table_schema
        .fields()
        .iter()
        .map(|(name, descriptor)| format!("\"{name}\" {}", sql_type(descriptor.kind())))
        .collect();
    format!("CREATE TABLE \"{}\" ({})", table_schema.name(), columns.join(", "))
}

/// A stable fingerprint of a `CREATE TABLE` statement, used to detect schema drift
/// between runs (§4.7, §7 `schema-drift`).
///
/// Uses `DefaultHasher` rather than a cryptographic hash: this only needs to detect
/// *accidental* drift between runs of the same process family, not resist tampering,
/// and `DefaultHasher::new()` hashes deterministically (fixed keys), unlike the
/// randomly-seeded `RandomState` a `HashMap` uses.
pub fn fingerprint(create_sql: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    create_sql.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
