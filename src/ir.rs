// Descriptor IR. A closed set of shapes; everything else is `Opaque`.
use std::fmt;

use crate::value::Value;

/// Runtime kinds a `Ty::Simple` descriptor can demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Str,
    Float,
    Bool,
    None,
    /// Raw containers, no element constraint.
    List,
    Dict,
    Set,
    Tuple,
    /// A named enumeration type.
    Enum(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Simple(Kind),
    Any,
    Literal(Vec<Value>),
    /// Optional-as-union: one arm is `Simple(Kind::None)`.
    Union(Vec<Ty>),
    List(Box<Ty>),
    Set(Box<Ty>),
    Tuple(Vec<Ty>),         // positional, exact arity
    Map(Box<Ty>, Box<Ty>),  // key, value
    /// A record type by name. Instances validate themselves when built.
    Structured(String),
    /// An annotation the adapter could name but no handler exists for.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Ty,
    pub default: Option<Value>, // bound when construction omits the field
}

impl Kind {
    /// Exact kind match. `bool` is not an `int` here.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Kind::Int, Value::Int(_))
            | (Kind::Str, Value::Str(_))
            | (Kind::Float, Value::Float(_))
            | (Kind::Bool, Value::Bool(_))
            | (Kind::None, Value::None)
            | (Kind::List, Value::List(_))
            | (Kind::Dict, Value::Map(_))
            | (Kind::Set, Value::Set(_))
            | (Kind::Tuple, Value::Tuple(_)) => true,
            (Kind::Enum(name), Value::Enum(e)) => e.enum_name == *name,
            _ => false,
        }
    }
}

impl Ty {
    pub fn optional(inner: Ty) -> Self {
        Ty::Union(vec![inner, Ty::Simple(Kind::None)])
    }

    pub fn list(elem: Ty) -> Self {
        Ty::List(Box::new(elem))
    }

    pub fn set(elem: Ty) -> Self {
        Ty::Set(Box::new(elem))
    }

    pub fn map(key: Ty, value: Ty) -> Self {
        Ty::Map(Box::new(key), Box::new(value))
    }

    pub fn structured(name: impl Into<String>) -> Self {
        Ty::Structured(name.into())
    }

    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ty::Literal(values.into_iter().map(Into::into).collect())
    }

    /// True if this descriptor, or any descriptor nested in it, is `Opaque`.
    pub fn contains_opaque(&self) -> bool {
        match self {
            Ty::Opaque(_) => true,
            Ty::Simple(_) | Ty::Any | Ty::Literal(_) | Ty::Structured(_) => false,
            Ty::Union(xs) | Ty::Tuple(xs) => xs.iter().any(Ty::contains_opaque),
            Ty::List(x) | Ty::Set(x) => x.contains_opaque(),
            Ty::Map(k, v) => k.contains_opaque() || v.contains_opaque(),
        }
    }

    /// Names of every record type this descriptor mentions, outermost first.
    pub fn structured_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_structured(&mut out);
        out
    }

    fn collect_structured<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Ty::Structured(name) => out.push(name),
            Ty::Simple(_) | Ty::Any | Ty::Literal(_) | Ty::Opaque(_) => {}
            Ty::Union(xs) | Ty::Tuple(xs) => xs.iter().for_each(|x| x.collect_structured(out)),
            Ty::List(x) | Ty::Set(x) => x.collect_structured(out),
            Ty::Map(k, v) => {
                k.collect_structured(out);
                v.collect_structured(out);
            }
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Field { name: name.into(), ty, default: None }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Int => "int",
            Kind::Str => "str",
            Kind::Float => "float",
            Kind::Bool => "bool",
            Kind::None => "None",
            Kind::List => "list",
            Kind::Dict => "dict",
            Kind::Set => "set",
            Kind::Tuple => "tuple",
            Kind::Enum(name) => name,
        };
        f.write_str(name)
    }
}

fn join<T: fmt::Display>(xs: &[T]) -> String {
    xs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Annotation syntax: `int`, `List[str]`, `Optional[Info]`, ...
impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Simple(kind) => write!(f, "{kind}"),
            Ty::Any => f.write_str("Any"),
            Ty::Literal(values) => {
                let values = values.iter().map(Value::repr).collect::<Vec<_>>();
                write!(f, "Literal[{}]", values.join(", "))
            }
            Ty::Union(arms) => match arms.as_slice() {
                [inner, Ty::Simple(Kind::None)] => write!(f, "Optional[{inner}]"),
                _ => write!(f, "Union[{}]", join(arms)),
            },
            Ty::List(elem) => write!(f, "List[{elem}]"),
            Ty::Set(elem) => write!(f, "Set[{elem}]"),
            Ty::Tuple(elems) => write!(f, "Tuple[{}]", join(elems)),
            Ty::Map(k, v) => write!(f, "Dict[{k}, {v}]"),
            Ty::Structured(name) => f.write_str(name),
            Ty::Opaque(annotation) => f.write_str(annotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_admits_exact_kinds_only() {
        assert!(Kind::Int.admits(&Value::from(1)));
        assert!(!Kind::Int.admits(&Value::from(true)));
        assert!(!Kind::Float.admits(&Value::from(1)));
        assert!(Kind::Enum("Status".into()).admits(&Value::enum_variant("Status", "ACTIVE")));
        assert!(!Kind::Enum("Status".into()).admits(&Value::enum_variant("Color", "RED")));
        assert!(!Kind::Enum("Status".into()).admits(&Value::from("ACTIVE")));
    }

    #[test]
    fn renders_annotation_syntax() {
        let ty = Ty::map(Ty::Simple(Kind::Str), Ty::list(Ty::optional(Ty::Simple(Kind::Int))));
        assert_eq!(ty.to_string(), "Dict[str, List[Optional[int]]]");
        assert_eq!(Ty::literal(["a", "b"]).to_string(), "Literal[\"a\", \"b\"]");
        assert_eq!(
            Ty::Union(vec![Ty::Simple(Kind::Str), Ty::Simple(Kind::Int)]).to_string(),
            "Union[str, int]"
        );
    }

    #[test]
    fn finds_nested_opaque() {
        let ty = Ty::list(Ty::map(Ty::Simple(Kind::Str), Ty::Opaque("Callable".into())));
        assert!(ty.contains_opaque());
        assert!(!Ty::structured("Info").contains_opaque());
    }

    #[test]
    fn collects_nested_record_names() {
        let ty = Ty::map(Ty::Simple(Kind::Str), Ty::Union(vec![Ty::structured("Info"), Ty::list(Ty::structured("Tag"))]));
        assert_eq!(ty.structured_names(), ["Info", "Tag"]);
        assert!(Ty::Simple(Kind::Int).structured_names().is_empty());
    }
}
