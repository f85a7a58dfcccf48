use thiserror::Error;

use crate::{StaticType, Value};

/// Raised when a value's dynamic type does not conform to the requested type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to force-cast value: expected type `{expected}`, got `{actual}`")]
pub struct ForceCastError {
    pub expected: StaticType,
    pub actual: StaticType,
}

/// Checked downcast of `value` to `expected`. The value is returned unchanged
/// on success; no coercion is applied.
pub fn force_cast(value: Value, expected: &StaticType) -> Result<Value, ForceCastError> {
    let actual = value.static_type();
    if actual.is_subtype(expected) {
        Ok(value)
    } else {
        Err(ForceCastError {
            expected: expected.clone(),
            actual,
        })
    }
}
