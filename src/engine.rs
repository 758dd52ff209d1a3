//! Validation engine.
//!
//! Every field of a record is checked, even after an earlier one fails, so a
//! pass reports one failure per offending field. Composite handlers stop at
//! their first inner failure.
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dispatch::{Container, Handler, classify};
use crate::error::Result;
use crate::ir::{Field, Ty};
use crate::message::format_failure;
use crate::pairing::pair_values_with_types;
use crate::record::Record;
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Fail tuples whose length differs from the descriptor's arity instead
    /// of checking only the overlapping positions.
    #[serde(default)]
    pub strict_arity: bool,
}

/// Stateless apart from its configuration; share freely across threads.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

/// One field-level mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub field: String,
    pub expected: Expected,
    pub received: Received,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Ty(Ty),
    /// Union arms, in declared order.
    Variants(Vec<Ty>),
    /// The full literal set.
    Literals(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Runtime kind name of the offending value.
    Kind(String),
    /// The offending value itself (literal mismatches).
    Value(Value),
    /// Arity mismatch under `strict_arity`.
    Length { kind: String, len: usize },
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Validator { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Check every field of `record`, in declaration order.
    pub fn validate_record(&self, record: &Record) -> Result<Vec<Failure>> {
        let failures = self.validate_fields(record.fields())?;
        debug!(
            record = record.type_name(),
            failures = failures.len(),
            "validated record"
        );
        Ok(failures)
    }

    /// Field-list form of `validate_record`, for callers holding bound
    /// values outside a `Record`.
    pub fn validate_fields<'a, I>(&self, fields: I) -> Result<Vec<Failure>>
    where
        I: IntoIterator<Item = (&'a Field, &'a Value)>,
    {
        let mut failures = Vec::new();
        for (field, value) in fields {
            if let Some(failure) = self.validate_single(&field.name, &field.ty, value)? {
                failures.push(failure);
            }
        }
        Ok(failures)
    }

    /// Check one value against one descriptor. Composite handlers call back
    /// into this with the same field name and a sub-descriptor.
    pub fn validate_single(&self, field: &str, ty: &Ty, value: &Value) -> Result<Option<Failure>> {
        let handler = classify(field, ty)?;
        trace!(field, %ty, ?handler, "dispatch");
        match handler {
            Handler::Simple(kind) => Ok(kind_check(kind.admits(value), field, ty, value)),
            Handler::Any => Ok(None),
            Handler::Literal(values) => Ok(check_literal(field, values, value)),
            Handler::Union(arms) => self.check_union(field, arms, value),
            Handler::Elements { container, elem } => {
                self.check_elements(field, ty, container, elem, value)
            }
            Handler::Tuple(elems) => self.check_tuple(field, ty, elems, value),
            Handler::Map { key, value: val } => self.check_map(field, ty, key, val, value),
            Handler::Structured(name) => {
                let admitted = matches!(value, Value::Record(r) if r.schema().is_a(name));
                Ok(kind_check(admitted, field, ty, value))
            }
        }
    }

    fn check_union(&self, field: &str, arms: &[Ty], value: &Value) -> Result<Option<Failure>> {
        for arm in arms {
            if self.validate_single(field, arm, value)?.is_none() {
                return Ok(None);
            }
        }
        Ok(Some(Failure {
            field: field.to_owned(),
            expected: Expected::Variants(arms.to_vec()),
            received: Received::kind_of(value),
        }))
    }

    fn check_elements(
        &self,
        field: &str,
        ty: &Ty,
        container: Container,
        elem: &Ty,
        value: &Value,
    ) -> Result<Option<Failure>> {
        let items: Vec<&Value> = match (container, value) {
            (Container::List, Value::List(xs)) => xs.iter().collect(),
            (Container::Set, Value::Set(xs)) => xs.iter().collect(),
            _ => return Ok(kind_check(false, field, ty, value)),
        };
        let types = std::slice::from_ref(elem);
        let pairs = pair_values_with_types(items.into_iter().map(|v| vec![v]), types);
        self.first_failure(field, pairs)
    }

    fn check_tuple(&self, field: &str, ty: &Ty, elems: &[Ty], value: &Value) -> Result<Option<Failure>> {
        let Value::Tuple(xs) = value else {
            return Ok(kind_check(false, field, ty, value));
        };
        if xs.len() != elems.len() {
            if self.config.strict_arity {
                return Ok(Some(Failure {
                    field: field.to_owned(),
                    expected: Expected::Ty(ty.clone()),
                    received: Received::Length { kind: "tuple".into(), len: xs.len() },
                }));
            }
            debug!(
                field,
                expected = elems.len(),
                actual = xs.len(),
                "tuple arity mismatch; checking overlapping positions only"
            );
        }
        // Positional even for `Tuple[T]`.
        self.first_failure(field, xs.iter().zip(elems))
    }

    fn check_map(
        &self,
        field: &str,
        ty: &Ty,
        key: &Ty,
        val: &Ty,
        value: &Value,
    ) -> Result<Option<Failure>> {
        let Value::Map(entries) = value else {
            return Ok(kind_check(false, field, ty, value));
        };
        let types = [key.clone(), val.clone()];
        let rows = entries.iter().map(|(k, v)| vec![k, v]);
        let pairs = pair_values_with_types(rows, &types);
        self.first_failure(field, pairs)
    }

    fn first_failure<'a>(
        &self,
        field: &str,
        pairs: impl IntoIterator<Item = (&'a Value, &'a Ty)>,
    ) -> Result<Option<Failure>> {
        for (value, ty) in pairs {
            if let Some(failure) = self.validate_single(field, ty, value)? {
                return Ok(Some(failure));
            }
        }
        Ok(None)
    }
}

fn kind_check(admitted: bool, field: &str, ty: &Ty, value: &Value) -> Option<Failure> {
    if admitted {
        return None;
    }
    Some(Failure {
        field: field.to_owned(),
        expected: Expected::Ty(ty.clone()),
        received: Received::kind_of(value),
    })
}

fn check_literal(field: &str, values: &[Value], value: &Value) -> Option<Failure> {
    if values.contains(value) {
        return None;
    }
    Some(Failure {
        field: field.to_owned(),
        expected: Expected::Literals(values.to_vec()),
        received: Received::Value(value.clone()),
    })
}

impl Received {
    pub fn kind_of(value: &Value) -> Self {
        Received::Kind(value.type_name().to_owned())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Ty(ty) => write!(f, "{ty}"),
            Expected::Variants(arms) => {
                let arms = arms.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "({})", arms.join(", "))
            }
            Expected::Literals(values) => {
                let values = values.iter().map(Value::repr).collect::<Vec<_>>();
                write!(f, "({})", values.join(", "))
            }
        }
    }
}

impl fmt::Display for Received {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Received::Kind(name) => f.write_str(name),
            Received::Value(value) => write!(f, "{value}"),
            Received::Length { kind, len } => write!(f, "{kind} of length {len}"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_failure(&self.field, &self.expected, &self.received))
    }
}
