//! Dynamic values the validator inspects.
//!
//! A `Value` is what a record field is bound to. It carries its own runtime
//! kind; descriptors in `crate::ir` are checked against it.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion ordered, so element checks run in a stable order.
    Set(IndexSet<Value>),
    Map(IndexMap<Value, Value>),
    Enum(EnumValue),
    /// A nested record. Only `Record::build` produces one, so it has
    /// already passed its own validation.
    Record(Arc<Record>),
}

/// One variant of a named enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub enum_name: String,
    pub variant: String,
}

impl Value {
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn enum_variant(enum_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Value::Enum(EnumValue {
            enum_name: enum_name.into(),
            variant: variant.into(),
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Name of the value's runtime kind, as shown under `Received:`.
    ///
    /// Enum values and records report their declared type name.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "dict",
            Value::Enum(e) => &e.enum_name,
            Value::Record(r) => r.type_name(),
        }
    }

    /// Quoted rendering used inside containers and literal sets.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

// Sets and maps compare without regard to order, so only their size feeds
// the hash.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(xs) | Value::Tuple(xs) => xs.hash(state),
            Value::Set(xs) => xs.len().hash(state),
            Value::Map(m) => m.len().hash(state),
            Value::Enum(e) => e.hash(state),
            Value::Record(r) => r.hash(state),
        }
    }
}

fn join_repr<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(Value::repr).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                let x = x.into_inner();
                let magnitude = x.abs();
                if !x.is_finite() {
                    write!(f, "{x}")
                } else if magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-4) {
                    write!(f, "{x:e}")
                } else if x.fract() == 0.0 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => f.write_str(s),
            Value::List(xs) => write!(f, "[{}]", join_repr(xs.iter())),
            Value::Tuple(xs) if xs.len() == 1 => write!(f, "({},)", xs[0].repr()),
            Value::Tuple(xs) => write!(f, "({})", join_repr(xs.iter())),
            Value::Set(xs) => write!(f, "{{{}}}", join_repr(xs.iter())),
            Value::Map(m) => {
                let entries = m
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect::<Vec<_>>();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Enum(e) => write!(f, "{}.{}", e.enum_name, e.variant),
            Value::Record(r) => write!(f, "{r}"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(OrderedFloat(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(xs: Vec<T>) -> Self {
        Value::List(xs.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        x.map_or(Value::None, Into::into)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(Arc::new(r))
    }
}

impl From<Arc<Record>> for Value {
    fn from(r: Arc<Record>) -> Self {
        Value::Record(r)
    }
}
