//! Record types and the post-build validation hook.
//!
//! A `Record` can only be obtained through `Record::build`, which binds every
//! field and then runs the hook exactly once. Any `Value::Record` therefore
//! holds an instance that has already passed validation, and a parent record
//! only needs to check its type.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::engine::Validator;
use crate::error::{Error, Result};
use crate::ir::Field;
use crate::value::Value;

static DEFAULT_VALIDATOR: Lazy<Validator> = Lazy::new(Validator::default);

/// A record type: a name, the names of the types it extends, and its
/// ordered field list. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    bases: Vec<String>, // nearest first
    fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: IndexMap<String, Value>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let name = name.into();
        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::DuplicateField {
                    type_name: name,
                    field: field.name.clone(),
                });
            }
            if field.ty.contains_opaque() {
                warn!(
                    record = %name,
                    field = %field.name,
                    ty = %field.ty,
                    "field descriptor has no validation handler"
                );
            }
        }
        Ok(Schema { name, bases: Vec::new(), fields })
    }

    /// Derive a schema from `parent`. Inherited fields come first, in the
    /// parent's order; a field redeclared here replaces the inherited one in
    /// place, new fields are appended.
    pub fn extend(parent: &Schema, name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let name = name.into();
        // Duplicates within the child's own declarations are still an error.
        let own = Schema::new(name.clone(), fields)?;

        let mut merged = parent.fields.clone();
        for field in own.fields {
            match merged.iter_mut().find(|f| f.name == field.name) {
                Some(slot) => *slot = field,
                None => merged.push(field),
            }
        }

        let mut bases = vec![parent.name.clone()];
        bases.extend(parent.bases.iter().cloned());
        Ok(Schema { name, bases, fields: merged })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True if instances of this schema are usable where `name` is declared.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.bases.iter().any(|b| b == name)
    }
}

impl Record {
    /// Bind `values` to `schema`'s fields and validate with the default
    /// validator.
    pub fn build<I, K, V>(schema: &Arc<Schema>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::build_with(&DEFAULT_VALIDATOR, schema, values)
    }

    pub fn build_with<I, K, V>(validator: &Validator, schema: &Arc<Schema>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut given: IndexMap<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        if let Some(unknown) = given.keys().find(|k| schema.field(k).is_none()) {
            return Err(Error::UnknownField {
                type_name: schema.name.clone(),
                field: unknown.clone(),
            });
        }

        let mut bound = IndexMap::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = match given.swap_remove(&field.name) {
                Some(value) => value,
                None => field.default.clone().ok_or_else(|| Error::MissingField {
                    type_name: schema.name.clone(),
                    field: field.name.clone(),
                })?,
            };
            bound.insert(field.name.clone(), value);
        }

        let record = Record { schema: Arc::clone(schema), values: bound };
        post_build_hook(validator, &record)?;
        Ok(record)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        &self.schema.name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Fields paired with their bound values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.schema
            .fields
            .iter()
            .zip(self.values.values())
    }
}

/// Runs once per construction, after every field is bound.
pub fn post_build_hook(validator: &Validator, record: &Record) -> Result<()> {
    let failures = validator.validate_record(record)?;
    if failures.is_empty() {
        return Ok(());
    }
    Err(Error::ValidationFailed {
        type_name: record.type_name().to_owned(),
        failures,
    })
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.values == other.values
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name.hash(state);
        for value in self.values.values() {
            value.hash(state);
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={}", v.repr()))
            .collect::<Vec<_>>();
        write!(f, "{}({})", self.schema.name, fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ValidatorConfig;
    use crate::ir::{Kind, Ty};

    fn info() -> Arc<Schema> {
        Arc::new(
            Schema::new(
                "Info",
                vec![
                    Field::new("id", Ty::Simple(Kind::Int)),
                    Field::new("name", Ty::Simple(Kind::Str)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn builds_valid_record() {
        let schema = info();
        let record = Record::build(&schema, [("id", Value::from(1)), ("name", Value::from("x"))]).unwrap();
        assert_eq!(record.get("id"), Some(&Value::from(1)));
        assert_eq!(record.to_string(), "Info(id=1, name=\"x\")");
    }

    #[test]
    fn binds_in_declaration_order_regardless_of_input_order() {
        let schema = info();
        let record = Record::build(&schema, [("name", Value::from("x")), ("id", Value::from(1))]).unwrap();
        let names: Vec<_> = record.fields().map(|(f, _)| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name"]);
        assert_eq!(record.fields().next().map(|(_, v)| v), Some(&Value::from(1)));
    }

    #[test]
    fn aggregates_all_failures() {
        let schema = info();
        let err = Record::build(&schema, [("id", Value::from("1")), ("name", Value::from(2))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed for Info: \n\
             id: \n Expected: int \n Received: str\n\
             name: \n Expected: str \n Received: int\n"
        );
    }

    #[test]
    fn missing_and_unknown_fields() {
        let schema = info();
        let err = Record::build(&schema, [("id", 1)]).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "name"));

        let err = Record::build(
            &schema,
            [("id", Value::from(1)), ("name", Value::from("x")), ("extra", Value::None)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "extra"));
    }

    #[test]
    fn defaults_are_bound_and_validated() {
        let schema = Arc::new(
            Schema::new(
                "WithDefault",
                vec![
                    Field::new("id", Ty::Simple(Kind::Int)),
                    Field::new("description", Ty::optional(Ty::Simple(Kind::Str))).with_default(Value::None),
                    Field::new("count", Ty::Simple(Kind::Int)).with_default("zero"),
                ],
            )
            .unwrap(),
        );
        let err = Record::build(&schema, [("id", 1)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed for WithDefault: \ncount: \n Expected: int \n Received: str\n"
        );
        let record = Record::build(&schema, [("id", 1), ("count", 3)]).unwrap();
        assert_eq!(record.get("description"), Some(&Value::None));
    }

    #[test]
    fn duplicate_field_rejected() {
        let err = Schema::new(
            "Dup",
            vec![Field::new("a", Ty::Any), Field::new("a", Ty::Any)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateField { .. }));
    }

    #[test]
    fn extend_merges_fields_and_bases() {
        let base = Schema::new(
            "Model",
            vec![
                Field::new("id", Ty::Simple(Kind::Int)),
                Field::new("name", Ty::Simple(Kind::Str)),
            ],
        )
        .unwrap();
        let child = Schema::extend(
            &base,
            "ModelChild",
            vec![
                Field::new("name", Ty::Any),
                Field::new("extra", Ty::Simple(Kind::Str)),
            ],
        )
        .unwrap();
        let names: Vec<_> = child.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "extra"]);
        assert_eq!(child.field("name").map(|f| &f.ty), Some(&Ty::Any));
        assert!(child.is_a("Model"));
        assert!(child.is_a("ModelChild"));
        assert!(!base.is_a("ModelChild"));
    }

    #[test]
    fn unsupported_descriptor_is_not_aggregated() {
        let schema = Arc::new(
            Schema::new(
                "Hooked",
                vec![
                    Field::new("id", Ty::Simple(Kind::Int)),
                    Field::new("hook", Ty::Opaque("Callable".into())),
                ],
            )
            .unwrap(),
        );
        let err = Record::build(&schema, [("id", Value::from("1")), ("hook", Value::None)]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDescriptor { .. }));
    }

    #[test]
    fn build_with_uses_given_validator() {
        let schema = Arc::new(
            Schema::new(
                "Pair",
                vec![Field::new(
                    "p",
                    Ty::Tuple(vec![Ty::Simple(Kind::Int), Ty::Simple(Kind::Int)]),
                )],
            )
            .unwrap(),
        );
        let value = Value::tuple([1, 2, 3]);
        assert!(Record::build(&schema, [("p", value.clone())]).is_ok());
        let strict = Validator::new(ValidatorConfig { strict_arity: true });
        assert!(Record::build_with(&strict, &schema, [("p", value)]).is_err());
    }
}
