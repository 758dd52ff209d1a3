//! Textual annotations -> `ir::Ty`.
//!
//! Accepted syntax:
//!
//! - kinds: `int`, `str`, `float`, `bool`, `None`, `list`, `dict`, `set`, `tuple`
//! - generics: `List[T]`, `Set[T]`, `Tuple[A, B, ..]`, `Dict[K, V]` (either case)
//! - `Any`, `Optional[T]`, `Union[A, B, ..]`, `A | B`
//! - `Literal["a", 'b', 1, -2, 2.5, True, False, None]`
//! - declared record and enum names, resolved through a `NameResolver`
//!
//! Anything else that is syntactically well formed (`Callable[[int], str]`,
//! `Tuple[int, ...]`, unknown names) becomes `Ty::Opaque` and fails only when
//! a value is validated against it.
use crate::error::{Error, Result};
use crate::ir::{Kind, Ty};
use crate::value::Value;

/// Resolves user-declared type names.
pub trait NameResolver {
    fn resolve(&self, name: &str) -> Option<Ty>;
}

/// No user-declared names.
impl NameResolver for () {
    fn resolve(&self, _: &str) -> Option<Ty> {
        None
    }
}

pub fn parse(src: &str, names: &impl NameResolver) -> Result<Ty> {
    let mut parser = Parser { src, pos: 0, names };
    let ty = parser.union()?;
    parser.skip_ws();
    if parser.pos != src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(ty)
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

struct Parser<'s, 'n, N> {
    src: &'s str,
    pos: usize,
    names: &'n N,
}

/// A generic argument: either a descriptor or a bracketed list of them
/// (`Callable[[int], str]`) or `...`. Only descriptors are meaningful to us.
enum Arg {
    Ty(Ty),
    Other,
}

impl<'s, N: NameResolver> Parser<'s, '_, N> {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::Annotation {
            annotation: self.src.to_owned(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`")))
        }
    }

    /// `primary ('|' primary)*`
    fn union(&mut self) -> Result<Ty> {
        let first = self.primary()?;
        if self.peek() != Some('|') {
            return Ok(first);
        }
        let mut arms = vec![first];
        while self.eat('|') {
            arms.push(self.primary()?);
        }
        Ok(make_union(arms))
    }

    fn ident(&mut self) -> Result<&'s str> {
        self.skip_ws();
        let src = self.src;
        let start = self.pos;
        let rest = &src[start..];
        let len = rest
            .char_indices()
            .find(|&(i, c)| !(c == '_' || c == '.' || c.is_alphanumeric()) || (i == 0 && c.is_ascii_digit()))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return Err(self.error("expected a type name"));
        }
        self.pos += len;
        Ok(&src[start..start + len])
    }

    fn primary(&mut self) -> Result<Ty> {
        let src = self.src;
        let start = self.pos;
        let name = self.ident()?;
        let name = name.strip_prefix("typing.").unwrap_or(name);

        if name == "Literal" {
            self.expect('[')?;
            return Ok(Ty::Literal(self.literal_args()?));
        }

        let args = if self.eat('[') { Some(self.args()?) } else { None };
        let text = src[start..self.pos].trim();
        let opaque = || Ty::Opaque(text.to_owned());

        let Some(args) = args else {
            return Ok(self.bare(name).unwrap_or_else(opaque));
        };

        // Every argument must be a descriptor for a known generic.
        let tys: Option<Vec<Ty>> = args
            .into_iter()
            .map(|a| match a {
                Arg::Ty(ty) => Some(ty),
                Arg::Other => None,
            })
            .collect();
        let Some(mut tys) = tys else {
            return Ok(opaque());
        };

        let arity = |want: usize, tys: &Vec<Ty>| -> Result<()> {
            if tys.len() == want {
                Ok(())
            } else {
                Err(self.error(format!("`{name}` takes {want} argument(s), got {}", tys.len())))
            }
        };

        let ty = match name {
            "List" | "list" => {
                arity(1, &tys)?;
                Ty::list(tys.remove(0))
            }
            "Set" | "set" | "FrozenSet" | "frozenset" => {
                arity(1, &tys)?;
                Ty::set(tys.remove(0))
            }
            "Dict" | "dict" => {
                arity(2, &tys)?;
                let value = tys.remove(1);
                Ty::map(tys.remove(0), value)
            }
            "Tuple" | "tuple" => Ty::Tuple(tys),
            "Optional" => {
                arity(1, &tys)?;
                make_union(vec![tys.remove(0), Ty::Simple(Kind::None)])
            }
            "Union" => {
                if tys.is_empty() {
                    return Err(self.error("`Union` needs at least one argument"));
                }
                make_union(tys)
            }
            _ => opaque(),
        };
        Ok(ty)
    }

    /// A name without type arguments.
    fn bare(&self, name: &str) -> Option<Ty> {
        let kind = match name {
            "int" => Kind::Int,
            "str" => Kind::Str,
            "float" => Kind::Float,
            "bool" => Kind::Bool,
            "None" | "NoneType" => Kind::None,
            "list" | "List" => Kind::List,
            "dict" | "Dict" => Kind::Dict,
            "set" | "Set" => Kind::Set,
            "tuple" | "Tuple" => Kind::Tuple,
            "Any" => return Some(Ty::Any),
            other => return self.names.resolve(other),
        };
        Some(Ty::Simple(kind))
    }

    fn args(&mut self) -> Result<Vec<Arg>> {
        let mut out = Vec::new();
        if self.eat(']') {
            return Ok(out);
        }
        loop {
            out.push(self.arg()?);
            if self.eat(']') {
                return Ok(out);
            }
            self.expect(',')?;
            if self.eat(']') {
                return Ok(out);
            }
        }
    }

    fn arg(&mut self) -> Result<Arg> {
        if self.eat('[') {
            self.args()?;
            return Ok(Arg::Other);
        }
        if self.src[self.pos..].starts_with("...") {
            self.pos += 3;
            return Ok(Arg::Other);
        }
        Ok(Arg::Ty(self.union()?))
    }

    fn literal_args(&mut self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        loop {
            out.push(self.literal()?);
            if self.eat(']') {
                return Ok(out);
            }
            self.expect(',')?;
            if self.eat(']') {
                return Ok(out);
            }
        }
    }

    fn literal(&mut self) -> Result<Value> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.string(q),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(_) => match self.ident()? {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::None),
                other => {
                    let reason = format!("`{other}` is not a literal");
                    Err(self.error(reason))
                }
            },
            None => Err(self.error("expected a literal")),
        }
    }

    fn string(&mut self, quote: char) -> Result<Value> {
        self.pos += quote.len_utf8();
        let src = self.src;
        let mut out = String::new();
        let mut chars = src[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos += i + c.len_utf8();
                    return Ok(Value::Str(out));
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn number(&mut self) -> Result<Value> {
        self.skip_ws();
        let src = self.src;
        let start = self.pos;
        let rest = &src[start..];
        let len = rest
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || c == '_' || (i == 0 && c == '-')))
            .map_or(rest.len(), |(i, _)| i);
        let text = rest[..len].replace('_', "");
        self.pos += len;
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        text.parse::<f64>()
            .map(Value::from)
            .map_err(|_| self.error(format!("invalid number `{text}`")))
    }
}

/// Flatten nested unions and drop repeated arms, keeping first occurrence.
fn make_union(arms: Vec<Ty>) -> Ty {
    let mut flat: Vec<Ty> = Vec::with_capacity(arms.len());
    for arm in arms {
        let nested = match arm {
            Ty::Union(inner) => inner,
            other => vec![other],
        };
        for ty in nested {
            if !flat.contains(&ty) {
                flat.push(ty);
            }
        }
    }
    if flat.len() == 1 {
        flat.remove(0)
    } else {
        Ty::Union(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names;

    impl NameResolver for Names {
        fn resolve(&self, name: &str) -> Option<Ty> {
            match name {
                "Info" => Some(Ty::structured("Info")),
                "Status" => Some(Ty::Simple(Kind::Enum("Status".into()))),
                _ => None,
            }
        }
    }

    fn p(src: &str) -> Ty {
        parse(src, &Names).unwrap()
    }

    #[test]
    fn kinds() {
        assert_eq!(p("int"), Ty::Simple(Kind::Int));
        assert_eq!(p(" str "), Ty::Simple(Kind::Str));
        assert_eq!(p("NoneType"), Ty::Simple(Kind::None));
        assert_eq!(p("dict"), Ty::Simple(Kind::Dict));
        assert_eq!(p("Tuple"), Ty::Simple(Kind::Tuple));
        assert_eq!(p("Any"), Ty::Any);
    }

    #[test]
    fn user_names() {
        assert_eq!(p("Info"), Ty::structured("Info"));
        assert_eq!(p("Status"), Ty::Simple(Kind::Enum("Status".into())));
        assert_eq!(p("List[Info]"), Ty::list(Ty::structured("Info")));
    }

    #[test]
    fn nested_generics() {
        assert_eq!(
            p("Dict[str, List[Optional[int]]]"),
            Ty::map(Ty::Simple(Kind::Str), Ty::list(Ty::optional(Ty::Simple(Kind::Int))))
        );
        assert_eq!(
            p("typing.Tuple[str, int]"),
            Ty::Tuple(vec![Ty::Simple(Kind::Str), Ty::Simple(Kind::Int)])
        );
        assert_eq!(p("set[int]"), Ty::set(Ty::Simple(Kind::Int)));
    }

    #[test]
    fn unions_flatten() {
        assert_eq!(
            p("Union[str, Union[int, str]]"),
            Ty::Union(vec![Ty::Simple(Kind::Str), Ty::Simple(Kind::Int)])
        );
        assert_eq!(p("str | None"), Ty::optional(Ty::Simple(Kind::Str)));
        assert_eq!(p("Union[int]"), Ty::Simple(Kind::Int));
    }

    #[test]
    fn literals() {
        assert_eq!(p("Literal['a', \"b\"]"), Ty::literal(["a", "b"]));
        assert_eq!(
            p("Literal[1, -2, 2.5, True, None]"),
            Ty::Literal(vec![
                Value::Int(1),
                Value::Int(-2),
                Value::from(2.5),
                Value::Bool(true),
                Value::None,
            ])
        );
    }

    #[test]
    fn unknown_shapes_are_opaque() {
        assert_eq!(p("Callable[[int], str]"), Ty::Opaque("Callable[[int], str]".into()));
        assert_eq!(p("Tuple[int, ...]"), Ty::Opaque("Tuple[int, ...]".into()));
        assert_eq!(p("Decimal"), Ty::Opaque("Decimal".into()));
        assert_eq!(p("List[Decimal]"), Ty::list(Ty::Opaque("Decimal".into())));
    }

    #[test]
    fn syntax_errors() {
        for src in ["", "List[int", "Dict[str]", "List[int, str]", "Literal[foo]", "int]"] {
            let err = parse(src, &Names).unwrap_err();
            assert!(matches!(err, Error::Annotation { .. }), "{src}: {err}");
        }
    }
}
