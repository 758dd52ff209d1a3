//! Structural runtime validation of records against declared field types.
//!
//! A record type is a `Schema`: an ordered list of fields, each carrying a
//! descriptor (`ir::Ty`). `Record::build` binds values and validates every
//! field in one pass, failing with a single aggregated
//! `Error::ValidationFailed` that lists each offending field.
//!
//! ```
//! use std::sync::Arc;
//! use record_validate::{Field, Kind, Record, Schema, Ty, Value};
//!
//! let schema = Arc::new(Schema::new("Model", vec![
//!     Field::new("id", Ty::Simple(Kind::Int)),
//!     Field::new("tags", Ty::list(Ty::Simple(Kind::Str))),
//! ]).unwrap());
//!
//! assert!(Record::build(&schema, [("id", Value::from(1)), ("tags", Value::from(vec!["a"]))]).is_ok());
//!
//! let err = Record::build(&schema, [("id", Value::from("1")), ("tags", Value::from(vec![2]))]).unwrap_err();
//! assert_eq!(err.to_string(), "Validation failed for Model: \n\
//!     id: \n Expected: int \n Received: str\n\
//!     tags: \n Expected: str \n Received: int\n");
//! ```
pub mod annotation;
pub mod decode;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod ir;
pub mod message;
pub mod pairing;
pub mod path_de;
pub mod record;
pub mod registry;
pub mod value;

pub use engine::{Expected, Failure, Received, Validator, ValidatorConfig};
pub use error::{Error, Result};
pub use ir::{Field, Kind, Ty};
pub use record::{Record, Schema};
pub use registry::Registry;
pub use value::Value;
