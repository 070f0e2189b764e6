use thiserror::Error;

/// Errors raised while validating a single field value against its [`FieldDescriptor`].
///
/// [`FieldDescriptor`]: super::FieldDescriptor
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// `nullable: false` and the value was absent.
    #[error("field '{field}' is required but was missing")]
    MissingRequired {
        /// The field name.
        field: String,
    },

    /// A `select`/`tags` value fell outside the declared option set.
    #[error("field '{field}' value '{value}' is not one of the allowed options")]
    NotInOptions {
        /// The field name.
        field: String,
        /// The offending value.
        value: String,
    },

    /// A `json` field's sub-schema validator rejected the value.
    #[error("field '{field}' failed json validation: {reason}")]
    JsonValidationFailed {
        /// The field name.
        field: String,
        /// The sub-schema validator's verbatim rejection reason.
        reason: String,
    },

    /// A `date` field's string did not match the canonical `<ISO8601Z>|<IANA zone>` form.
    #[error("field '{field}' has a malformed date: {value}")]
    BadDateFormat {
        /// The field name.
        field: String,
        /// The string that failed to parse.
        value: String,
    },

    /// An `integer` field's value fell outside its declared `[min, max]` range.
    #[error("field '{field}' value {value} is out of range [{min:?}, {max:?}]")]
    OutOfRange {
        /// The field name.
        field: String,
        /// The rejected value.
        value: i64,
        /// Declared minimum, if any.
        min: Option<i64>,
        /// Declared maximum, if any.
        max: Option<i64>,
    },

    /// A value of the wrong logical type was supplied for this field's kind.
    #[error("field '{field}' expected a {expected} value, got something else")]
    WrongType {
        /// The field name.
        field: String,
        /// The expected kind, as a human label (e.g. "integer").
        expected: &'static str,
    },

    /// An empty or all-whitespace id was supplied on write.
    #[error("id must not be empty")]
    BadId,

    /// A partial update (`Table::update`) patch included an `id` field. A row's id is
    /// fixed at insert time and must match its table-map key (§3 invariant 1); `update`
    /// only ever patches the other fields.
    #[error("'id' cannot be changed by update; it was present in the patch")]
    ImmutableId,
}

impl FieldError {
    /// The stable taxonomy code for this error (§7 / §4.1).
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::MissingRequired { .. } => "missing-required",
            FieldError::NotInOptions { .. } => "not-in-options",
            FieldError::JsonValidationFailed { .. } => "validation-failed",
            FieldError::BadDateFormat { .. } => "bad-date-format",
            FieldError::OutOfRange { .. } => "out-of-range",
            FieldError::WrongType { .. } => "validation-failed",
            FieldError::BadId => "bad-id",
            FieldError::ImmutableId => "immutable-id",
        }
    }

    /// Whether this error represents a required-value gap versus a malformed value.
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldError::MissingRequired { .. })
    }
}

impl From<FieldError> for crate::Error {
    fn from(err: FieldError) -> Self {
        crate::Error::Field(err)
    }
}
