//! Default and per-table-overridable rendering/parsing between a row and a markdown
//! file's `---\n<yaml frontmatter>\n---\n<body>\n` layout (§4.8, §6).

use std::collections::HashMap;
use std::sync::Arc;

use epicenter_core::date::DateTimeTz;
use epicenter_core::field::{FieldKind, Value};
use epicenter_core::schema::TableSchema;

use crate::errors::Error;

/// What to do with a file that fails frontmatter deserialization during [`crate::MarkdownMaterializer::push`]
/// (§9 Open Question 1; default matches the spec's stated default of warn-and-leave).
#[derive(Clone)]
pub enum MarkdownPullPolicy {
    /// Warn and leave the file exactly as it is (default).
    Skip,
    /// Move the offending file into `dir`, preserving its filename.
    MoveAside(std::path::PathBuf),
    /// Delete the offending file.
    Delete,
}

type FilenameFn = Arc<dyn Fn(&HashMap<String, Value>) -> String + Send + Sync>;
type FrontmatterFn = Arc<dyn Fn(&HashMap<String, Value>) -> HashMap<String, Value> + Send + Sync>;
type DeserializeFn = Arc<dyn Fn(&str) -> Result<HashMap<String, Value>, String> + Send + Sync>;

/// Per-table overrides for the markdown materializer's default serialization (§4.8):
/// custom filename, custom frontmatter projection, custom body selection (via the
/// schema's declared body field), and a custom deserializer that may reject malformed
/// files with a structured error.
#[derive(Clone)]
pub struct TableMarkdownConfig {
    pub(crate) table: String,
    filename: Option<FilenameFn>,
    frontmatter: Option<FrontmatterFn>,
    deserializer: Option<DeserializeFn>,
    delete_missing_on_push: bool,
    pull_policy: MarkdownPullPolicy,
}

impl TableMarkdownConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filename: None,
            frontmatter: None,
            deserializer: None,
            delete_missing_on_push: false,
            pull_policy: MarkdownPullPolicy::Skip,
        }
    }

    /// Override the default `<id>.md` filename (e.g. `<title>-<id>.md`). The returned
    /// name must still let the materializer recognize the row on delete: it must equal
    /// `<id>` or end with `-<id>` in its stem, matching the default and the spec's own
    /// `<title>-<id>.md` example (§4.8).
    pub fn filename(mut self, f: impl Fn(&HashMap<String, Value>) -> String + Send + Sync + 'static) -> Self {
        self.filename = Some(Arc::new(f));
        self
    }

    /// Override the default frontmatter projection (every non-body field, declaration order).
    pub fn frontmatter(mut self, f: impl Fn(&HashMap<String, Value>) -> HashMap<String, Value> + Send + Sync + 'static) -> Self {
        self.frontmatter = Some(Arc::new(f));
        self
    }

    /// Override the default YAML-frontmatter deserializer. May reject malformed content
    /// by returning `Err(reason)`.
    pub fn deserializer(mut self, f: impl Fn(&str) -> Result<HashMap<String, Value>, String> + Send + Sync + 'static) -> Self {
        self.deserializer = Some(Arc::new(f));
        self
    }

    /// Declare that [`crate::MarkdownMaterializer::push`] should delete CRDT rows whose
    /// file is no longer present (§4.6: optional, declared by the materializer).
    pub fn delete_missing_on_push(mut self) -> Self {
        self.delete_missing_on_push = true;
        self
    }

    pub fn pull_policy(mut self, policy: MarkdownPullPolicy) -> Self {
        self.pull_policy = policy;
        self
    }

    pub(crate) fn deletes_missing(&self) -> bool {
        self.delete_missing_on_push
    }

    pub(crate) fn has_custom_deserializer(&self) -> bool {
        self.deserializer.is_some()
    }

    /// Whether a field-derived filename is configured, meaning a row's file stem can
    /// change across writes (e.g. `<title>-<id>.md` after a title edit) and a prior
    /// file under the old stem needs cleaning up (§4.8).
    pub(crate) fn has_custom_filename(&self) -> bool {
        self.filename.is_some()
    }

    pub(crate) fn policy(&self) -> &MarkdownPullPolicy {
        &self.pull_policy
    }

    pub(crate) fn build_filename(&self, row: &HashMap<String, Value>) -> String {
        match &self.filename {
            Some(f) => f(row),
            None => default_filename(row),
        }
    }

    pub(crate) fn build_frontmatter(&self, table_schema: &TableSchema, row: &HashMap<String, Value>) -> HashMap<String, Value> {
        match &self.frontmatter {
            Some(f) => f(row),
            None => table_schema
                .frontmatter_fields()
                .filter_map(|name| row.get(name).map(|v| (name.to_string(), v.clone())))
                .collect(),
        }
    }

    pub(crate) fn deserialize(&self, content: &str) -> Result<HashMap<String, Value>, String> {
        match &self.deserializer {
            Some(f) => f(content),
            None => parse_default(content),
        }
    }
}

/// `<id>.md`, the default filename (§4.8).
pub fn default_filename(row: &HashMap<String, Value>) -> String {
    let id = row
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    format!("{id}.md")
}

/// Render one markdown file's content: YAML frontmatter (insertion order preserved via
/// `serde_yaml::Mapping`) followed by `---` and the body, always ending in a trailing
/// newline (§6).
pub fn render_markdown_file(table_schema: &TableSchema, config: &TableMarkdownConfig, row: &HashMap<String, Value>) -> String {
    let frontmatter = config.build_frontmatter(table_schema, row);
    let mut mapping = serde_yaml::Mapping::new();
    for (name, _) in table_schema.frontmatter_fields().map(|n| (n, ())) {
        if let Some(value) = frontmatter.get(name) {
            mapping.insert(
                serde_yaml::Value::String(name.to_string()),
                value_to_yaml(value),
            );
        }
    }
    let yaml = serde_yaml::to_string(&serde_yaml::Value::Mapping(mapping)).unwrap_or_default();
    let body = table_schema
        .body_field()
        .and_then(|name| row.get(name))
        .and_then(Value::as_str)
        .unwrap_or("");
    format!("---\n{yaml}---\n{body}\n")
}

/// Parse a markdown file's content back into a row, schema-aware so each frontmatter
/// value is converted according to its declared field kind (§4.8, §8 property 4).
pub fn parse_row_for_schema(table_schema: &TableSchema, content: &str) -> Result<HashMap<String, Value>, Error> {
    let (frontmatter, body) = split_frontmatter(content).ok_or_else(|| Error::MalformedFrontmatter {
        path: String::new(),
        reason: "missing '---' delimited frontmatter block".to_string(),
    })?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(frontmatter).map_err(|e| Error::MalformedFrontmatter {
        path: String::new(),
        reason: e.to_string(),
    })?;
    let serde_yaml::Value::Mapping(mapping) = yaml else {
        return Err(Error::MalformedFrontmatter {
            path: String::new(),
            reason: "frontmatter is not a YAML mapping".to_string(),
        });
    };

    let mut row = HashMap::new();
    for (name, descriptor) in table_schema.fields() {
        if table_schema.body_field() == Some(name.as_str()) {
            continue;
        }
        let key = serde_yaml::Value::String(name.clone());
        if let Some(yaml_value) = mapping.get(&key) {
            match yaml_to_value(descriptor.kind(), yaml_value) {
                Some(v) => {
                    row.insert(name.clone(), v);
                }
                None => {
                    return Err(Error::MalformedFrontmatter {
                        path: String::new(),
                        reason: format!("field '{name}' has a value that does not match its declared kind"),
                    });
                }
            }
        }
    }
    if let Some(body_field) = table_schema.body_field() {
        let body_kind = table_schema.field(body_field).map(|d| d.kind());
        let value = match body_kind {
            Some(FieldKind::RichText) => Value::RichText(body.to_string()),
            _ => Value::Text(body.to_string()),
        };
        row.insert(body_field.to_string(), value);
    }
    Ok(row)
}

/// The default deserializer: parses for a standalone YAML mapping with no schema-aware
/// kind coercion (exposed for callers wiring a bare [`TableMarkdownConfig`] without
/// wanting [`parse_row_for_schema`]'s stricter kind checks). Values come back as
/// [`Value::Text`]/`Integer`/`Boolean`/`Tags` best-effort from the YAML node shape.
pub fn parse_default(content: &str) -> Result<HashMap<String, Value>, String> {
    let (frontmatter, _body) = split_frontmatter(content).ok_or("missing '---' delimited frontmatter block")?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(frontmatter).map_err(|e| e.to_string())?;
    let serde_yaml::Value::Mapping(mapping) = yaml else {
        return Err("frontmatter is not a YAML mapping".to_string());
    };
    let mut row = HashMap::new();
    for (key, value) in mapping {
        let serde_yaml::Value::String(name) = key else {
            continue;
        };
        if let Some(v) = yaml_to_best_effort_value(&value) {
            row.insert(name, v);
        }
    }
    Ok(row)
}

fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---\n")?;
    let frontmatter = &rest[..end];
    let body = &rest[end + "\n---\n".len()..];
    Some((frontmatter, body.strip_suffix('\n').unwrap_or(body)))
}

fn value_to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Id(s) | Value::Text(s) | Value::Select(s) | Value::RichText(s) => {
            serde_yaml::Value::String(s.clone())
        }
        Value::Integer(i) => serde_yaml::Value::Number((*i).into()),
        Value::Boolean(b) => serde_yaml::Value::Bool(*b),
        Value::Date(d) => serde_yaml::Value::String(d.to_canonical_string()),
        Value::Tags(tags) => serde_yaml::Value::Sequence(
            tags.iter().map(|t| serde_yaml::Value::String(t.clone())).collect(),
        ),
        Value::Json(json) => serde_yaml::to_value(json).unwrap_or(serde_yaml::Value::Null),
    }
}

fn yaml_to_value(kind: &FieldKind, value: &serde_yaml::Value) -> Option<Value> {
    match kind {
        FieldKind::Id => value.as_str().map(|s| Value::Id(s.to_string())),
        FieldKind::Text => value.as_str().map(|s| Value::Text(s.to_string())),
        FieldKind::RichText => value.as_str().map(|s| Value::RichText(s.to_string())),
        FieldKind::Select { .. } => value.as_str().map(|s| Value::Select(s.to_string())),
        FieldKind::Integer { .. } => value.as_i64().map(Value::Integer),
        FieldKind::Boolean => value.as_bool().map(Value::Boolean),
        FieldKind::Date => value
            .as_str()
            .and_then(|s| DateTimeTz::parse_canonical(s).ok())
            .map(Value::Date),
        FieldKind::Tags { .. } => value.as_sequence().map(|seq| {
            Value::Tags(
                seq.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            )
        }),
        FieldKind::Json { .. } => serde_json::to_value(value).ok().map(Value::Json),
    }
}

fn yaml_to_best_effort_value(value: &serde_yaml::Value) -> Option<Value> {
    match value {
        serde_yaml::Value::String(s) => Some(Value::Text(s.clone())),
        serde_yaml::Value::Number(n) => n.as_i64().map(Value::Integer),
        serde_yaml::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_yaml::Value::Sequence(seq) => Some(Value::Tags(
            seq.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epicenter_core::field;

    fn notes_schema() -> TableSchema {
        TableSchema::builder("notes")
            .field("id", field::id())
            .field("title", field::text())
            .field("views", field::integer().default_value(Value::Integer(0)))
            .field("body", field::text())
            .body_field("body")
            .build()
            .unwrap()
    }

    #[test]
    fn renders_frontmatter_and_body() {
        let schema = notes_schema();
        let config = TableMarkdownConfig::new("notes");
        let mut row = HashMap::new();
        row.insert("id".to_string(), Value::Id("n1".into()));
        row.insert("title".to_string(), Value::Text("Hello".into()));
        row.insert("views".to_string(), Value::Integer(0));
        row.insert("body".to_string(), Value::Text("".into()));
        let rendered = render_markdown_file(&schema, &config, &row);
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("title: Hello"));
        assert!(rendered.contains("views: 0"));
        assert!(!rendered.contains("body:"));
        assert!(rendered.ends_with("---\n\n"));
    }

    #[test]
    fn round_trips_through_parse() {
        let schema = notes_schema();
        let config = TableMarkdownConfig::new("notes");
        let mut row = HashMap::new();
        row.insert("id".to_string(), Value::Id("n1".into()));
        row.insert("title".to_string(), Value::Text("Hello".into()));
        row.insert("views".to_string(), Value::Integer(3));
        row.insert("body".to_string(), Value::Text("some body text".into()));
        let rendered = render_markdown_file(&schema, &config, &row);
        let parsed = parse_row_for_schema(&schema, &rendered).unwrap();
        assert_eq!(parsed.get("title"), Some(&Value::Text("Hello".into())));
        assert_eq!(parsed.get("views"), Some(&Value::Integer(3)));
        assert_eq!(parsed.get("body"), Some(&Value::Text("some body text".into())));
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        let schema = notes_schema();
        let err = parse_row_for_schema(&schema, "no frontmatter here").unwrap_err();
        assert!(matches!(err, Error::MalformedFrontmatter { .. }));
    }
}
