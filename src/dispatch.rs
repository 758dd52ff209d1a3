//! Descriptor classification.
//!
//! Maps each `Ty` variant to the handler responsible for it. The mapping is
//! an exhaustive `match`, so a new descriptor shape cannot be added without
//! deciding its handler here.
use crate::error::{Error, Result};
use crate::ir::{Kind, Ty};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    List,
    Set,
}

/// A handler together with the part of the descriptor it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler<'t> {
    Simple(&'t Kind),
    Any,
    Literal(&'t [Value]),
    Union(&'t [Ty]),
    Elements { container: Container, elem: &'t Ty },
    Tuple(&'t [Ty]),
    Map { key: &'t Ty, value: &'t Ty },
    /// Kind check only; the nested record validated itself when built.
    Structured(&'t str),
}

/// Pick the handler for `ty`. `Opaque` descriptors have none and fail with
/// `UnsupportedDescriptor`, naming `field`.
pub fn classify<'t>(field: &str, ty: &'t Ty) -> Result<Handler<'t>> {
    let handler = match ty {
        Ty::Simple(kind) => Handler::Simple(kind),
        Ty::Any => Handler::Any,
        Ty::Literal(values) => Handler::Literal(values),
        Ty::Union(arms) => Handler::Union(arms),
        Ty::List(elem) => Handler::Elements { container: Container::List, elem },
        Ty::Set(elem) => Handler::Elements { container: Container::Set, elem },
        Ty::Tuple(elems) => Handler::Tuple(elems),
        Ty::Map(key, value) => Handler::Map { key, value },
        Ty::Structured(name) => Handler::Structured(name),
        Ty::Opaque(annotation) => {
            return Err(Error::UnsupportedDescriptor {
                field: field.to_owned(),
                annotation: annotation.clone(),
            });
        }
    };
    Ok(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_each_shape() {
        let int = Ty::Simple(Kind::Int);
        assert_eq!(classify("f", &int).unwrap(), Handler::Simple(&Kind::Int));
        assert_eq!(classify("f", &Ty::Any).unwrap(), Handler::Any);

        let list = Ty::list(int.clone());
        assert!(matches!(
            classify("f", &list).unwrap(),
            Handler::Elements { container: Container::List, .. }
        ));
        let set = Ty::set(int.clone());
        assert!(matches!(
            classify("f", &set).unwrap(),
            Handler::Elements { container: Container::Set, .. }
        ));

        let map = Ty::map(Ty::Simple(Kind::Str), int.clone());
        assert!(matches!(classify("f", &map).unwrap(), Handler::Map { .. }));

        let info = Ty::structured("Info");
        assert_eq!(classify("f", &info).unwrap(), Handler::Structured("Info"));
    }

    #[test]
    fn opaque_is_unsupported() {
        let ty = Ty::Opaque("Callable[[int], str]".into());
        let err = classify("hook", &ty).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedDescriptor { ref field, .. } if field == "hook"
        ));
        assert_eq!(
            err.to_string(),
            "type not supported for field 'hook': Callable[[int], str]"
        );
    }
}
