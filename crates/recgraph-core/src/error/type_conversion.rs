use super::Error;
use serde_json::Value;

/// Error when a value does not fit the declared type of a field.
#[derive(Debug)]
pub(super) struct TypeConversionError {
    value: Value,
    field: Box<str>,
    to_type: &'static str,
}

impl std::error::Error for TypeConversionError {}

impl core::fmt::Display for TypeConversionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "cannot convert {} to {} for field `{}`",
            self.value, self.to_type, self.field
        )
    }
}

impl Error {
    /// Creates a type conversion error for `field` (qualified as `Table.field`).
    pub fn type_conversion(value: &Value, field: impl Into<String>, to_type: &'static str) -> Error {
        Error::from(super::ErrorKind::TypeConversion(TypeConversionError {
            value: value.clone(),
            field: field.into().into(),
            to_type,
        }))
    }

    /// Returns `true` if this error is a type conversion error.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::TypeConversion(_))
    }
}
