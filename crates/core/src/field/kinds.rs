use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use super::errors::FieldError;
use super::value::Value;
use crate::date::DateTimeTz;

/// A validator for a `json` field's sub-schema (§4.1).
///
/// Boxed as `Arc<dyn JsonValidator>` so that [`FieldDescriptor`] stays `Clone`.
pub trait JsonValidator: Send + Sync {
    /// Validate `value`, returning the rejection reason verbatim on failure.
    fn validate(&self, value: &Json) -> Result<(), String>;
}

impl<F> JsonValidator for F
where
    F: Fn(&Json) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Json) -> Result<(), String> {
        (self)(value)
    }
}

/// The kind-specific metadata and constraints for a field (§3, §4.1).
#[derive(Clone)]
pub enum FieldKind {
    /// Primary key: non-empty string, unique within its table.
    Id,
    /// Plain text, length unlimited.
    Text,
    /// 64-bit signed integer, with an optional inclusive `[min, max]` range.
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    /// `<ISO8601 instant>|<IANA zone>` canonical string (§6).
    Date,
    /// One of an enumerated finite set of strings.
    Select { options: Vec<String> },
    /// Ordered set of strings, duplicates collapsed, optionally constrained by `options`.
    ///
    /// When `permissive` is `true` and `options` is set, values outside the set are
    /// dropped rather than rejected (§4.1).
    Tags {
        options: Option<Vec<String>>,
        permissive: bool,
    },
    /// Structurally validated JSON document.
    Json { validator: Option<Arc<dyn JsonValidator>> },
    /// Collaborative rich-text handle; lossily serialized to plain text outside the CRDT.
    RichText,
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Id => write!(f, "Id"),
            FieldKind::Text => write!(f, "Text"),
            FieldKind::Integer { min, max } => {
                write!(f, "Integer {{ min: {min:?}, max: {max:?} }}")
            }
            FieldKind::Boolean => write!(f, "Boolean"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::Select { options } => write!(f, "Select {{ options: {options:?} }}"),
            FieldKind::Tags {
                options,
                permissive,
            } => write!(
                f,
                "Tags {{ options: {options:?}, permissive: {permissive} }}"
            ),
            FieldKind::Json { .. } => write!(f, "Json {{ .. }}"),
            FieldKind::RichText => write!(f, "RichText"),
        }
    }
}

/// How a field's default is produced when a write omits it.
#[derive(Clone)]
pub enum Default_ {
    /// A fixed, reusable value.
    Value(Value),
    /// A generator invoked fresh for every row (e.g. the `id` field's generator).
    Generator(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for Default_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Default_::Value(v) => write!(f, "Value({v:?})"),
            Default_::Generator(_) => write!(f, "Generator(..)"),
        }
    }
}

/// An opaque, immutable column descriptor produced by a field factory (§4.1).
///
/// Usable both for validation (via [`FieldDescriptor::validate`]) and for
/// materializer-specific code generation (e.g. the SQLite column-type mapping).
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    kind: FieldKind,
    nullable: bool,
    default: Option<Default_>,
}

impl FieldDescriptor {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: false,
            default: None,
        }
    }

    /// Mark this field nullable: a missing value is not an error.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach a fixed default value, used when a write omits this field.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(Default_::Value(value));
        self
    }

    /// Attach a default generator, invoked fresh for every row that omits this field.
    pub fn default_with(mut self, generator: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(Default_::Generator(Arc::new(generator)));
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Produce this field's default value, if one is declared.
    pub fn default(&self) -> Option<Value> {
        match &self.default {
            Some(Default_::Value(v)) => Some(v.clone()),
            Some(Default_::Generator(g)) => Some(g()),
            None => None,
        }
    }

    /// Validate a candidate value for `field_name` against this descriptor (§4.1).
    pub fn validate(&self, field_name: &str, value: Option<&Value>) -> Result<(), FieldError> {
        let value = match value {
            Some(v) => v,
            None => {
                if self.nullable || self.default.is_some() {
                    return Ok(());
                }
                return Err(FieldError::MissingRequired {
                    field: field_name.to_string(),
                });
            }
        };

        match &self.kind {
            FieldKind::Id => match value {
                Value::Id(s) if !s.trim().is_empty() => Ok(()),
                Value::Id(_) => Err(FieldError::BadId),
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "id",
                }),
            },
            FieldKind::Text => match value {
                Value::Text(_) => Ok(()),
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "text",
                }),
            },
            FieldKind::Integer { min, max } => match value {
                Value::Integer(i) => {
                    let below = min.is_some_and(|m| *i < m);
                    let above = max.is_some_and(|m| *i > m);
                    if below || above {
                        Err(FieldError::OutOfRange {
                            field: field_name.to_string(),
                            value: *i,
                            min: *min,
                            max: *max,
                        })
                    } else {
                        Ok(())
                    }
                }
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "integer",
                }),
            },
            FieldKind::Boolean => match value {
                Value::Boolean(_) => Ok(()),
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "boolean",
                }),
            },
            FieldKind::Date => match value {
                Value::Date(_) => Ok(()),
                Value::Text(s) | Value::RichText(s) => DateTimeTz::parse_canonical(s)
                    .map(|_| ())
                    .map_err(|_| FieldError::BadDateFormat {
                        field: field_name.to_string(),
                        value: s.clone(),
                    }),
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "date",
                }),
            },
            FieldKind::Select { options } => match value {
                Value::Select(s) | Value::Text(s) if options.contains(s) => Ok(()),
                Value::Select(s) | Value::Text(s) => Err(FieldError::NotInOptions {
                    field: field_name.to_string(),
                    value: s.clone(),
                }),
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "select",
                }),
            },
            FieldKind::Tags {
                options,
                permissive: _,
            } => match value {
                Value::Tags(tags) => {
                    if let Some(options) = options {
                        if let Some(bad) = tags.iter().find(|t| !options.contains(t)) {
                            return Err(FieldError::NotInOptions {
                                field: field_name.to_string(),
                                value: bad.clone(),
                            });
                        }
                    }
                    Ok(())
                }
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "tags",
                }),
            },
            FieldKind::Json { validator } => match value {
                Value::Json(json) => {
                    if let Some(validator) = validator {
                        validator.validate(json).map_err(|reason| {
                            FieldError::JsonValidationFailed {
                                field: field_name.to_string(),
                                reason,
                            }
                        })
                    } else {
                        Ok(())
                    }
                }
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "json",
                }),
            },
            FieldKind::RichText => match value {
                Value::RichText(_) | Value::Text(_) => Ok(()),
                _ => Err(FieldError::WrongType {
                    field: field_name.to_string(),
                    expected: "rich-text",
                }),
            },
        }
    }

    /// Apply `tags`'s permissive-drop policy, returning a possibly-narrowed value.
    ///
    /// Call this before [`Self::validate`] when the field is a permissive `tags` field;
    /// non-tags fields and non-permissive tags fields return `value` unchanged.
    pub fn apply_permissive_policy(&self, value: Value) -> Value {
        if let (FieldKind::Tags {
            options: Some(options),
            permissive: true,
        }, Value::Tags(tags)) = (&self.kind, &value)
        {
            let filtered: Vec<String> = tags.iter().filter(|t| options.contains(t)).cloned().collect();
            return Value::Tags(dedupe(filtered));
        }
        if let Value::Tags(tags) = value {
            return Value::Tags(dedupe(tags));
        }
        value
    }
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// The non-empty-string, collision-resistant primary key field.
pub fn id() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Id).default_with(|| Value::Id(crate::id::generate()))
}

/// Plain text.
pub fn text() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Text)
}

/// 64-bit signed integer.
pub fn integer() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Integer { min: None, max: None })
}

/// 64-bit signed integer constrained to `[min, max]`.
pub fn integer_range(min: i64, max: i64) -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Integer {
        min: Some(min),
        max: Some(max),
    })
}

pub fn boolean() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Boolean)
}

/// Date-with-timezone (§6).
pub fn date() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Date)
}

/// One of `options`.
pub fn select(options: impl IntoIterator<Item = impl Into<String>>) -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Select {
        options: options.into_iter().map(Into::into).collect(),
    })
}

/// Ordered set of strings with no option constraint.
pub fn tags() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Tags {
        options: None,
        permissive: false,
    })
}

/// Ordered set of strings constrained to `options`. Rejects values outside the set
/// unless `.permissive()`-style construction is used via [`tags_permissive`].
pub fn tags_with_options(options: impl IntoIterator<Item = impl Into<String>>) -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Tags {
        options: Some(options.into_iter().map(Into::into).collect()),
        permissive: false,
    })
}

/// Ordered set of strings constrained to `options`, silently dropping values outside it.
pub fn tags_permissive(options: impl IntoIterator<Item = impl Into<String>>) -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Tags {
        options: Some(options.into_iter().map(Into::into).collect()),
        permissive: true,
    })
}

/// Structurally validated JSON with no sub-schema validator.
pub fn json() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Json { validator: None })
}

/// Structurally validated JSON, validated by the supplied sub-schema validator.
pub fn json_validated(validator: impl JsonValidator + 'static) -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::Json {
        validator: Some(Arc::new(validator)),
    })
}

/// Collaborative rich-text.
pub fn rich_text() -> FieldDescriptor {
    FieldDescriptor::new(FieldKind::RichText)
}
