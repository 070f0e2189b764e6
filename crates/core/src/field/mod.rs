//! Field schema: primitive column types with validators and defaults (§4.1).

mod errors;
mod kinds;
mod value;

pub use errors::FieldError;
pub use kinds::{
    boolean, date, id, integer, integer_range, json, json_validated, rich_text, select, tags,
    tags_permissive, tags_with_options, text, Default_, FieldDescriptor, FieldKind, JsonValidator,
};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_field_errors() {
        let f = text();
        let err = f.validate("title", None).unwrap_err();
        assert_eq!(err.code(), "missing-required");
    }

    #[test]
    fn nullable_field_allows_missing() {
        let f = text().nullable();
        assert!(f.validate("title", None).is_ok());
    }

    #[test]
    fn default_counts_as_present() {
        let f = integer().default_value(Value::Integer(0));
        assert!(f.validate("views", None).is_ok());
        assert_eq!(f.default(), Some(Value::Integer(0)));
    }

    #[test]
    fn integer_range_is_enforced() {
        let f = integer_range(0, 10);
        assert!(f.validate("n", Some(&Value::Integer(5))).is_ok());
        let err = f.validate("n", Some(&Value::Integer(11))).unwrap_err();
        assert_eq!(err.code(), "out-of-range");
    }

    #[test]
    fn select_rejects_values_outside_options() {
        let f = select(["open", "closed"]);
        assert!(f
            .validate("status", Some(&Value::Select("open".into())))
            .is_ok());
        let err = f
            .validate("status", Some(&Value::Select("archived".into())))
            .unwrap_err();
        assert_eq!(err.code(), "not-in-options");
    }

    #[test]
    fn tags_permissive_drops_offending_entries() {
        let f = tags_permissive(["red", "blue"]);
        let cleaned = f.apply_permissive_policy(Value::Tags(vec![
            "red".into(),
            "green".into(),
            "red".into(),
        ]));
        assert_eq!(cleaned, Value::Tags(vec!["red".into()]));
    }

    #[test]
    fn tags_strict_rejects_values_outside_options() {
        let f = tags_with_options(["red", "blue"]);
        let err = f
            .validate("tags", Some(&Value::Tags(vec!["green".into()])))
            .unwrap_err();
        assert_eq!(err.code(), "not-in-options");
    }

    #[test]
    fn json_subschema_surfaces_reason_verbatim() {
        let f = json_validated(|v: &serde_json::Value| {
            if v.get("x").is_some() {
                Ok(())
            } else {
                Err("missing x".to_string())
            }
        });
        let err = f
            .validate("payload", Some(&Value::Json(serde_json::json!({}))))
            .unwrap_err();
        assert!(matches!(err, FieldError::JsonValidationFailed { reason, .. } if reason == "missing x"));
    }

    #[test]
    fn date_requires_canonical_form() {
        let f = date();
        assert!(f
            .validate(
                "saved_at",
                Some(&Value::Text(
                    "2025-01-01T00:00:00.000Z|UTC".to_string()
                ))
            )
            .is_ok());
        let err = f
            .validate("saved_at", Some(&Value::Text("2025-01-01".to_string())))
            .unwrap_err();
        assert_eq!(err.code(), "bad-date-format");
    }

    #[test]
    fn id_factory_generates_nonempty_defaults() {
        let f = id();
        let default = f.default().unwrap();
        assert!(matches!(default, Value::Id(s) if crate::id::is_valid(&s)));
    }
}
