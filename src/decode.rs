//! JSON documents -> `Value`.
//!
//! JSON has no tuples, sets, enums or records, so the declared descriptor
//! decides how an array, string or object is read where it matters. Nothing
//! else is converted: a JSON string stays a `str` even where an `int` is
//! declared, and the validator reports it.
//!
//! An object may name a record type that extends the declared one with a
//! `"$type"` key; the key itself is not a field.
use serde_json::Value as Json;

use crate::engine::Validator;
use crate::error::{Error, Result};
use crate::ir::{Kind, Ty};
use crate::record::Record;
use crate::registry::Registry;
use crate::value::Value;

pub const TYPE_TAG: &str = "$type";

pub struct Decoder<'a> {
    registry: &'a Registry,
    validator: &'a Validator,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a Registry, validator: &'a Validator) -> Self {
        Decoder { registry, validator }
    }

    /// Build (and so validate) a `type_name` record from a JSON object.
    /// Nested records are built first; their errors surface unchanged.
    pub fn record(&self, type_name: &str, json: &Json) -> Result<Record> {
        let Some(object) = json.as_object() else {
            return Err(Error::NotAnObject {
                type_name: type_name.to_owned(),
                found: json_kind(json).to_owned(),
            });
        };
        let schema = match object.get(TYPE_TAG) {
            Some(Json::String(tagged)) => {
                let schema = self.registry.require(tagged)?;
                if !schema.is_a(type_name) {
                    return Err(Error::NotASubtype {
                        declared: type_name.to_owned(),
                        found: tagged.clone(),
                    });
                }
                schema
            }
            _ => self.registry.require(type_name)?,
        };
        let mut values = Vec::with_capacity(object.len());
        for (key, raw) in object {
            if key == TYPE_TAG && raw.is_string() {
                continue;
            }
            // Undeclared keys are kept so `Record::build` can reject them.
            let value = match schema.field(key) {
                Some(field) => self.lift(raw, &field.ty)?,
                None => plain(raw),
            };
            values.push((key.clone(), value));
        }
        Record::build_with(self.validator, schema, values)
    }

    pub fn lift(&self, json: &Json, ty: &Ty) -> Result<Value> {
        let value = match (ty, json) {
            (Ty::Simple(Kind::Tuple), Json::Array(xs)) => Value::Tuple(xs.iter().map(plain).collect()),
            (Ty::Simple(Kind::Set), Json::Array(xs)) => Value::Set(xs.iter().map(plain).collect()),
            (Ty::Simple(Kind::Enum(name)), Json::String(s)) => self
                .enum_value(name, s)
                .unwrap_or_else(|| Value::Str(s.clone())),
            (Ty::Union(arms), _) => self.lift_union(json, arms)?,
            (Ty::List(elem), Json::Array(xs)) => Value::List(
                xs.iter()
                    .map(|x| self.lift(x, elem))
                    .collect::<Result<_>>()?,
            ),
            (Ty::Set(elem), Json::Array(xs)) => Value::Set(
                xs.iter()
                    .map(|x| self.lift(x, elem))
                    .collect::<Result<_>>()?,
            ),
            (Ty::Tuple(elems), Json::Array(xs)) => Value::Tuple(
                xs.iter()
                    .enumerate()
                    .map(|(i, x)| match elems.get(i) {
                        Some(ty) => self.lift(x, ty),
                        None => Ok(plain(x)),
                    })
                    .collect::<Result<_>>()?,
            ),
            (Ty::Map(key_ty, value_ty), Json::Object(entries)) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| -> Result<(Value, Value)> {
                        let key = self.lift(&Json::String(k.clone()), key_ty)?;
                        Ok((key, self.lift(v, value_ty)?))
                    })
                    .collect::<Result<_>>()?,
            ),
            (Ty::Structured(name), Json::Object(_)) => Value::from(self.record(name, json)?),
            _ => plain(json),
        };
        Ok(value)
    }

    /// Decode with the first arm that has the right shape and decodes
    /// cleanly. A nested record that fails to build moves on to the next
    /// arm; when every fitting arm fails, the first arm's error is returned.
    fn lift_union(&self, json: &Json, arms: &[Ty]) -> Result<Value> {
        let mut first_err = None;
        for arm in arms.iter().filter(|arm| self.fits(arm, json)) {
            match self.lift(json, arm) {
                Ok(value) => return Ok(value),
                Err(err @ Error::UnsupportedDescriptor { .. }) => return Err(err),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(plain(json)),
        }
    }

    /// Whether `json` has the shape `ty` reads, without building anything.
    /// Picks the union arm to decode with.
    fn fits(&self, ty: &Ty, json: &Json) -> bool {
        match (ty, json) {
            (Ty::Any, _) => true,
            (Ty::Simple(Kind::None), Json::Null) => true,
            (Ty::Simple(Kind::Bool), Json::Bool(_)) => true,
            (Ty::Simple(Kind::Int), Json::Number(n)) => n.is_i64(),
            (Ty::Simple(Kind::Float), Json::Number(n)) => !n.is_i64(),
            (Ty::Simple(Kind::Str), Json::String(_)) => true,
            (Ty::Simple(Kind::Enum(name)), Json::String(s)) => self.enum_value(name, s).is_some(),
            (Ty::Simple(Kind::List | Kind::Tuple | Kind::Set), Json::Array(_)) => true,
            (Ty::Simple(Kind::Dict), Json::Object(_)) => true,
            (Ty::Literal(values), _) => values.contains(&plain(json)),
            (Ty::Union(arms), _) => arms.iter().any(|arm| self.fits(arm, json)),
            (Ty::List(_) | Ty::Set(_) | Ty::Tuple(_), Json::Array(_)) => true,
            (Ty::Map(..) | Ty::Structured(_), Json::Object(_)) => true,
            _ => false,
        }
    }

    fn enum_value(&self, enum_name: &str, variant: &str) -> Option<Value> {
        let variants = self.registry.enum_variants(enum_name)?;
        variants
            .iter()
            .any(|v| v == variant)
            .then(|| Value::enum_variant(enum_name, variant))
    }
}

/// Decode without any descriptor guidance.
///
/// Integers outside the `i64` range have no `int` value and decode as
/// `float`, so they are reported as `Received: float` against an `int` field.
pub fn plain(json: &Json) -> Value {
    match json {
        Json::Null => Value::None,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(xs) => Value::List(xs.iter().map(plain).collect()),
        Json::Object(m) => Value::Map(
            m.iter()
                .map(|(k, v)| (Value::Str(k.clone()), plain(v)))
                .collect(),
        ),
    }
}

pub fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
