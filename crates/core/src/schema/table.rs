//! A single table's field-schema map and the validators synthesized from it (§4.2).

use std::collections::HashMap;

use crate::field::{FieldDescriptor, FieldError, Value};

use super::errors::SchemaError;

/// A table declaration: an ordered `field name -> descriptor` map (insertion order is
/// preserved so the markdown materializer can write frontmatter keys in declaration
/// order, §6), plus the optional body-field designation used by the markdown
/// materializer's default serializer (§4.8).
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    body_field: Option<String>,
}

/// Builder for a [`TableSchema`], returned by [`crate::schema::table`].
pub struct TableSchemaBuilder {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    body_field: Option<String>,
}

impl TableSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    /// Designate a `text`/`rich-text` field as the markdown materializer's body (§4.8).
    pub fn body_field(mut self, name: impl Into<String>) -> Self {
        self.body_field = Some(name.into());
        self
    }

    pub fn build(self) -> Result<TableSchema, SchemaError> {
        if !self.fields.iter().any(|(name, _)| name == "id") {
            return Err(SchemaError::MissingIdField { table: self.name });
        }
        if let Some(body) = &self.body_field {
            if !self.fields.iter().any(|(name, _)| name == body) {
                return Err(SchemaError::UnknownBodyField {
                    table: self.name,
                    designated: body.clone(),
                });
            }
        }
        Ok(TableSchema {
            name: self.name,
            fields: self.fields,
            body_field: self.body_field,
        })
    }
}

impl TableSchema {
    pub fn builder(name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            body_field: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, FieldDescriptor)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn body_field(&self) -> Option<&str> {
        self.body_field.as_deref()
    }

    /// Field names excluding the body field, in declaration order — the markdown
    /// materializer's default frontmatter projection (§4.8).
    pub fn frontmatter_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(move |(name, _)| {
            if self.body_field.as_deref() == Some(name.as_str()) {
                None
            } else {
                Some(name.as_str())
            }
        })
    }

    /// Apply field defaults to `row` for any declared field the caller omitted, then
    /// validate the complete row (the *table validator*, §4.2, used by `insert`/`upsert`).
    pub fn validate_full(&self, row: &HashMap<String, Value>) -> Result<HashMap<String, Value>, Vec<FieldError>> {
        let mut completed = row.clone();
        let mut errors = Vec::new();
        for (name, descriptor) in &self.fields {
            let provided = completed.get(name).cloned();
            let value = match provided {
                Some(v) => descriptor.apply_permissive_policy(v),
                None => match descriptor.default() {
                    Some(v) => v,
                    None => {
                        if let Err(e) = descriptor.validate(name, None) {
                            errors.push(e);
                        }
                        continue;
                    }
                },
            };
            if let Err(e) = descriptor.validate(name, Some(&value)) {
                errors.push(e);
            } else {
                completed.insert(name.clone(), value);
            }
        }
        if errors.is_empty() {
            Ok(completed)
        } else {
            Err(errors)
        }
    }

    /// Validate only the fields present in `patch` (the *partial validator*, §4.2, used
    /// by `update`). Fields the caller omitted are left untouched by the Table API.
    ///
    /// A patch containing `id` is rejected outright: a row's id is fixed at insert time
    /// and keys it in the table map (§3 invariant 1), so `update` must never be able to
    /// change it out from under that key.
    pub fn validate_partial(&self, patch: &HashMap<String, Value>) -> Result<HashMap<String, Value>, Vec<FieldError>> {
        if patch.contains_key("id") {
            return Err(vec![FieldError::ImmutableId]);
        }
        let mut completed = HashMap::new();
        let mut errors = Vec::new();
        for (name, value) in patch {
            match self.field(name) {
                Some(descriptor) => {
                    let value = descriptor.apply_permissive_policy(value.clone());
                    match descriptor.validate(name, Some(&value)) {
                        Ok(()) => {
                            completed.insert(name.clone(), value);
                        }
                        Err(e) => errors.push(e),
                    }
                }
                None => continue,
            }
        }
        if errors.is_empty() {
            Ok(completed)
        } else {
            Err(errors)
        }
    }
}
