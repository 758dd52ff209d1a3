use thiserror::Error;

use crate::engine::Failure;
use crate::message::format_aggregate;

#[derive(Error, Debug)]
pub enum Error {
    /// One or more fields did not conform. Always one error per record,
    /// never one per field.
    #[error("{}", format_aggregate(.type_name, .failures))]
    ValidationFailed {
        type_name: String,
        failures: Vec<Failure>,
    },

    /// A descriptor no handler is registered for. This is a schema bug, not
    /// a data error, and is never aggregated with `ValidationFailed`.
    #[error("type not supported for field '{field}': {annotation}")]
    UnsupportedDescriptor { field: String, annotation: String },

    #[error("{type_name}: missing value for field '{field}'")]
    MissingField { type_name: String, field: String },

    #[error("{type_name}: unexpected field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("{type_name}: field '{field}' is declared more than once")]
    DuplicateField { type_name: String, field: String },

    #[error("invalid annotation `{annotation}` at offset {offset}: {reason}")]
    Annotation {
        annotation: String,
        offset: usize,
        reason: String,
    },

    #[error("record type '{record}' extends unknown type '{base}'")]
    UnknownBase { record: String, base: String },

    #[error("default of '{record}.{field}' needs record type '{needs}', which cannot be built before it")]
    UnresolvedDefault {
        record: String,
        field: String,
        needs: String,
    },

    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),

    #[error("unknown record type '{0}'")]
    UnknownRecord(String),

    #[error("'{found}' does not extend '{declared}'")]
    NotASubtype { declared: String, found: String },

    #[error("{type_name}: expected a JSON object, found {found}")]
    NotAnObject { type_name: String, found: String },

    #[error("schema load error for '{path}': {reason}")]
    SchemaLoad { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Error::ValidationFailed { .. })
    }
}
