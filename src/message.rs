//! Failure message rendering.
//!
//! The block shape is fixed: callers match on it, so trailing spaces and the
//! final newline are part of the format.
use std::fmt::Display;

use crate::engine::Failure;

pub fn format_failure(
    field_name: &str,
    expected: impl Display,
    received: impl Display,
) -> String {
    format!("{field_name}: \n Expected: {expected} \n Received: {received}\n")
}

pub fn format_aggregate(type_name: &str, failures: &[Failure]) -> String {
    let mut out = format!("Validation failed for {type_name}: \n");
    for failure in failures {
        out.push_str(&failure.to_string());
    }
    out
}
