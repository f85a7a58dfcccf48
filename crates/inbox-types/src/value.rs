use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, ForceCastError, Path, StaticType};

/// Runtime value representation for everything stored in account storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    String(String),
    Address(Address),
    Path(Path),
    Array {
        element_type: StaticType,
        items: Vec<Value>,
    },
    Optional(Box<Value>),
    Capability(CapabilityValue),
}

impl Value {
    pub fn array(element_type: StaticType, items: Vec<Value>) -> Self {
        Value::Array {
            element_type,
            items,
        }
    }

    pub fn int_array(items: impl IntoIterator<Item = i64>) -> Self {
        Value::array(StaticType::Int, items.into_iter().map(Value::Int).collect())
    }

    pub fn string_array<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Value::array(
            StaticType::String,
            items.into_iter().map(|s| Value::String(s.into())).collect(),
        )
    }

    /// Dynamic type of the value.
    pub fn static_type(&self) -> StaticType {
        match self {
            Value::Nil => StaticType::optional(StaticType::AnyStruct),
            Value::Bool(_) => StaticType::Bool,
            Value::Int(_) => StaticType::Int,
            Value::String(_) => StaticType::String,
            Value::Address(_) => StaticType::Address,
            Value::Path(_) => StaticType::Path,
            Value::Array { element_type, .. } => StaticType::array(element_type.clone()),
            Value::Optional(inner) => StaticType::optional(inner.static_type()),
            Value::Capability(cap) => cap.static_type(),
        }
    }

    pub fn conforms_to(&self, ty: &StaticType) -> bool {
        self.static_type().is_subtype(ty)
    }

    /// Element access for arrays; `None` for out-of-range indices and non-arrays.
    pub fn index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array { items, .. } => items.get(index),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<CapabilityValue> for Value {
    fn from(value: CapabilityValue) -> Self {
        Value::Capability(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => Value::Optional(Box::new(inner.into())),
            None => Value::Nil,
        }
    }
}

/// Log rendering, matching how the transaction `log` builtin prints values.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Address(v) => write!(f, "{v}"),
            Value::Path(v) => write!(f, "{v}"),
            Value::Array { items, .. } => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Optional(inner) => write!(f, "{inner}"),
            Value::Capability(cap) => write!(f, "{cap}"),
        }
    }
}

/// Typed capability descriptor: a handle to `path` in `address`'s storage,
/// borrowable as `borrow_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityValue {
    pub address: Address,
    pub path: Path,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_type: Option<StaticType>,
}

impl CapabilityValue {
    pub fn new(address: Address, path: Path, borrow_type: Option<StaticType>) -> Self {
        Self {
            address,
            path,
            borrow_type,
        }
    }

    pub fn static_type(&self) -> StaticType {
        StaticType::Capability {
            borrow: self.borrow_type.clone().map(Box::new),
        }
    }

    /// Downcast to `Capability<borrow_type>`, failing if the dynamic type
    /// does not conform.
    pub fn force_cast(self, borrow_type: &StaticType) -> Result<CapabilityValue, ForceCastError> {
        let expected = StaticType::capability(borrow_type.clone());
        let actual = self.static_type();
        if actual.is_subtype(&expected) {
            Ok(self)
        } else {
            Err(ForceCastError { expected, actual })
        }
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(address: {}, path: {})",
            self.static_type(),
            self.address,
            self.path
        )
    }
}
