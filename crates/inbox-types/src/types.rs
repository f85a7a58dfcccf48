use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Static type tags carried by runtime values and requested by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaticType {
    AnyStruct,
    Bool,
    Int,
    String,
    Address,
    Path,
    Array {
        element: Box<StaticType>,
    },
    Optional {
        inner: Box<StaticType>,
    },
    Reference {
        authorized: bool,
        referenced: Box<StaticType>,
    },
    /// `borrow` is `None` for the untyped `Capability`.
    Capability {
        borrow: Option<Box<StaticType>>,
    },
}

impl StaticType {
    pub fn array(element: StaticType) -> Self {
        StaticType::Array {
            element: Box::new(element),
        }
    }

    pub fn optional(inner: StaticType) -> Self {
        StaticType::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn reference(referenced: StaticType) -> Self {
        StaticType::Reference {
            authorized: false,
            referenced: Box::new(referenced),
        }
    }

    pub fn auth_reference(referenced: StaticType) -> Self {
        StaticType::Reference {
            authorized: true,
            referenced: Box::new(referenced),
        }
    }

    pub fn capability(borrow: StaticType) -> Self {
        StaticType::Capability {
            borrow: Some(Box::new(borrow)),
        }
    }

    pub fn untyped_capability() -> Self {
        StaticType::Capability { borrow: None }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, StaticType::Reference { .. })
    }

    /// Returns the type behind a reference, or `None` for non-reference types.
    pub fn referenced_type(&self) -> Option<&StaticType> {
        match self {
            StaticType::Reference { referenced, .. } => Some(referenced),
            _ => None,
        }
    }

    /// Whether a value of type `self` may be used where `sup` is expected.
    ///
    /// Arrays and optionals are covariant. An authorized reference may be
    /// used where an unauthorized one is expected, never the reverse.
    /// Typed capabilities widen only to the untyped `Capability`.
    pub fn is_subtype(&self, sup: &StaticType) -> bool {
        if self == sup {
            return true;
        }
        match (self, sup) {
            (_, StaticType::AnyStruct) => true,
            (StaticType::Optional { inner: sub }, StaticType::Optional { inner: sup }) => {
                sub.is_subtype(sup)
            }
            (sub, StaticType::Optional { inner: sup }) => sub.is_subtype(sup),
            (StaticType::Array { element: sub }, StaticType::Array { element: sup }) => {
                sub.is_subtype(sup)
            }
            (
                StaticType::Reference {
                    authorized: sub_auth,
                    referenced: sub,
                },
                StaticType::Reference {
                    authorized: sup_auth,
                    referenced: sup,
                },
            ) => (*sub_auth || !*sup_auth) && sub.is_subtype(sup),
            (StaticType::Capability { borrow: Some(_) }, StaticType::Capability { borrow: None }) => {
                true
            }
            _ => false,
        }
    }

    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        let mut parser = TypeParser { input: s, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::AnyStruct => f.write_str("AnyStruct"),
            StaticType::Bool => f.write_str("Bool"),
            StaticType::Int => f.write_str("Int"),
            StaticType::String => f.write_str("String"),
            StaticType::Address => f.write_str("Address"),
            StaticType::Path => f.write_str("Path"),
            StaticType::Array { element } => write!(f, "[{element}]"),
            StaticType::Optional { inner } => write!(f, "{inner}?"),
            StaticType::Reference {
                authorized,
                referenced,
            } => {
                if *authorized {
                    f.write_str("auth ")?;
                }
                write!(f, "&{referenced}")
            }
            StaticType::Capability { borrow: Some(borrow) } => write!(f, "Capability<{borrow}>"),
            StaticType::Capability { borrow: None } => f.write_str("Capability"),
        }
    }
}

impl FromStr for StaticType {
    type Err = TypeParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StaticType::parse(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid type '{input}' at offset {offset}: {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub offset: usize,
    pub reason: String,
}

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn parse_type(&mut self) -> Result<StaticType, TypeParseError> {
        let mut ty = self.parse_prefixed()?;
        loop {
            self.skip_ws();
            if self.eat("?") {
                ty = StaticType::optional(ty);
            } else {
                return Ok(ty);
            }
        }
    }

    fn parse_prefixed(&mut self) -> Result<StaticType, TypeParseError> {
        self.skip_ws();
        if self.eat_keyword("auth") {
            self.skip_ws();
            if !self.eat("&") {
                return Err(self.error("expected '&' after 'auth'"));
            }
            return Ok(StaticType::auth_reference(self.parse_type()?));
        }
        if self.eat("&") {
            return Ok(StaticType::reference(self.parse_type()?));
        }
        if self.eat("[") {
            let element = self.parse_type()?;
            self.skip_ws();
            if !self.eat("]") {
                return Err(self.error("expected ']'"));
            }
            return Ok(StaticType::array(element));
        }
        let ident = self.identifier();
        match ident {
            "AnyStruct" => Ok(StaticType::AnyStruct),
            "Bool" => Ok(StaticType::Bool),
            "Int" => Ok(StaticType::Int),
            "String" => Ok(StaticType::String),
            "Address" => Ok(StaticType::Address),
            "Path" => Ok(StaticType::Path),
            "Capability" => {
                self.skip_ws();
                if !self.eat("<") {
                    return Ok(StaticType::untyped_capability());
                }
                let borrow = self.parse_type()?;
                self.skip_ws();
                if !self.eat(">") {
                    return Err(self.error("expected '>'"));
                }
                Ok(StaticType::capability(borrow))
            }
            "" => Err(self.error("expected a type")),
            other => Err(self.error(&format!("unknown type '{other}'"))),
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        let len = self.input[start..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(self.input.len() - start);
        self.pos += len;
        &self.input[start..start + len]
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let Some(tail) = self.input[self.pos..].strip_prefix(keyword) else {
            return false;
        };
        if tail.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, reason: &str) -> TypeParseError {
        TypeParseError {
            input: self.input.to_string(),
            offset: self.pos,
            reason: reason.to_string(),
        }
    }
}
