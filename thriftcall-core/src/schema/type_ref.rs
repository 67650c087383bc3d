use crate::wire::WireType;
use std::fmt;
use std::str::FromStr;

/// The seven base kinds a field can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
}

impl BaseKind {
    /// Matches a base-type keyword, ignoring case. `i8` is accepted as an alias of `byte`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "bool" => Some(BaseKind::Bool),
            "byte" | "i8" => Some(BaseKind::Byte),
            "i16" => Some(BaseKind::I16),
            "i32" => Some(BaseKind::I32),
            "i64" => Some(BaseKind::I64),
            "double" => Some(BaseKind::Double),
            "string" => Some(BaseKind::String),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BaseKind::Bool => "bool",
            BaseKind::Byte => "byte",
            BaseKind::I16 => "i16",
            BaseKind::I32 => "i32",
            BaseKind::I64 => "i64",
            BaseKind::Double => "double",
            BaseKind::String => "string",
        }
    }

    pub fn wire_type(self) -> WireType {
        match self {
            BaseKind::Bool => WireType::Bool,
            BaseKind::Byte => WireType::Byte,
            BaseKind::I16 => WireType::I16,
            BaseKind::I32 => WireType::I32,
            BaseKind::I64 => WireType::I64,
            BaseKind::Double => WireType::Double,
            BaseKind::String => WireType::String,
        }
    }
}

/// A declared type, as written in a field or return type expression.
///
/// Named references are kept unresolved; the codec resolves them against the
/// schema's struct and enum tables when it needs a wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// Only meaningful as a method return type.
    Void,
    Base(BaseKind),
    Named(String),
    Map(Box<TypeRef>, Box<TypeRef>),
    List(Box<TypeRef>),
    Set(Box<TypeRef>),
}

impl TypeRef {
    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    pub fn set(element: TypeRef) -> Self {
        TypeRef::Set(Box::new(element))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    /// The user-defined name this type points at, if it is a named reference.
    pub fn named(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Base(kind) => f.write_str(kind.keyword()),
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::Map(key, value) => write!(f, "map<{key}, {value}>"),
            TypeRef::List(element) => write!(f, "list<{element}>"),
            TypeRef::Set(element) => write!(f, "set<{element}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTypeError {
    #[error("Type expression is empty")]
    Empty,
    #[error("Expected a type name at position {position}")]
    ExpectedIdentifier { position: usize },
    #[error("Expected '{expected}' at position {position}")]
    Expected { expected: char, position: usize },
    #[error("Unexpected trailing input at position {position}")]
    TrailingInput { position: usize },
}

impl FromStr for TypeRef {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseTypeError::Empty);
        }

        let mut parser = TypeParser { input: s, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_whitespace();

        if parser.pos != s.len() {
            return Err(ParseTypeError::TrailingInput {
                position: parser.pos,
            });
        }
        Ok(ty)
    }
}

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn parse_type(&mut self) -> Result<TypeRef, ParseTypeError> {
        self.skip_whitespace();
        let ident = self.identifier()?;

        match ident.to_ascii_lowercase().as_str() {
            "list" => {
                self.expect('<')?;
                let element = self.parse_type()?;
                self.expect('>')?;
                Ok(TypeRef::list(element))
            }
            "set" => {
                self.expect('<')?;
                let element = self.parse_type()?;
                self.expect('>')?;
                Ok(TypeRef::set(element))
            }
            "map" => {
                self.expect('<')?;
                let key = self.parse_type()?;
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                Ok(TypeRef::map(key, value))
            }
            "void" => Ok(TypeRef::Void),
            _ => Ok(BaseKind::from_keyword(ident)
                .map(TypeRef::Base)
                .unwrap_or_else(|| TypeRef::Named(ident.to_string()))),
        }
    }

    fn identifier(&mut self) -> Result<&'a str, ParseTypeError> {
        let rest = &self.input[self.pos..];
        let len = rest
            .char_indices()
            .find(|(i, c)| {
                let continues = *i > 0 && (c.is_ascii_digit() || *c == '.');
                !(c.is_ascii_alphabetic() || *c == '_' || continues)
            })
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        if len == 0 {
            return Err(ParseTypeError::ExpectedIdentifier { position: self.pos });
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseTypeError> {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with(expected) {
            self.pos += expected.len_utf8();
            Ok(())
        } else {
            Err(ParseTypeError::Expected {
                expected,
                position: self.pos,
            })
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_keywords_ignoring_case() {
        assert_eq!("I32".parse(), Ok(TypeRef::Base(BaseKind::I32)));
        assert_eq!("String".parse(), Ok(TypeRef::Base(BaseKind::String)));
        assert_eq!("i8".parse(), Ok(TypeRef::Base(BaseKind::Byte)));
    }

    #[test]
    fn parses_nested_containers() {
        let ty: TypeRef = "map<string, list<set<Point>>>".parse().unwrap();
        assert_eq!(
            ty,
            TypeRef::map(
                TypeRef::Base(BaseKind::String),
                TypeRef::list(TypeRef::set(TypeRef::Named("Point".to_string())))
            )
        );
        assert_eq!(ty.to_string(), "map<string, list<set<Point>>>");
    }

    #[test]
    fn keeps_qualified_names() {
        assert_eq!(
            "shared.Point".parse(),
            Ok(TypeRef::Named("shared.Point".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!("".parse::<TypeRef>(), Err(ParseTypeError::Empty));
        assert_eq!(
            "list<i32".parse::<TypeRef>(),
            Err(ParseTypeError::Expected {
                expected: '>',
                position: 8
            })
        );
        assert_eq!(
            "map<string>".parse::<TypeRef>(),
            Err(ParseTypeError::Expected {
                expected: ',',
                position: 10
            })
        );
        assert_eq!(
            "i32 i64".parse::<TypeRef>(),
            Err(ParseTypeError::TrailingInput { position: 4 })
        );
        assert_eq!(
            "list<>".parse::<TypeRef>(),
            Err(ParseTypeError::ExpectedIdentifier { position: 5 })
        );
    }
}
