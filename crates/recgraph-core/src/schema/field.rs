use super::Name;
use crate::{Error, Result};
use serde_json::{Number, Value};

/// A literal (non-relationship) field of a table.
#[derive(Debug, Clone)]
pub struct Field {
    /// Declared name, e.g. `catalogNumber`
    pub name: String,

    /// Declared data type
    pub ty: FieldType,

    /// True if a value must be present before the record can be saved
    pub required: bool,

    /// Maximum length for textual fields
    pub length: Option<usize>,

    /// Human readable label
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Text,
    Integer,
    Short,
    Byte,
    Long,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    Timestamp,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Field {
        let name = name.into();
        let label = Name::new(&name).title_case();
        Field {
            name,
            ty,
            required: false,
            length: None,
            label,
        }
    }

    pub fn required(mut self) -> Field {
        self.required = true;
        self
    }

    pub fn length(mut self, length: usize) -> Field {
        self.length = Some(length);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Field {
        self.label = label.into();
        self
    }

    /// The value a freshly created record gets for this field.
    pub fn default_value(&self) -> Value {
        if self.is_version() {
            return Value::from(1);
        }
        self.ty.default_value()
    }

    /// The optimistic-locking counter. It starts at 1 even when optional.
    pub fn is_version(&self) -> bool {
        self.name.eq_ignore_ascii_case("version")
    }

    /// Checks `value` against the declared type, converting where the
    /// representation is unambiguous (numeric strings, integral floats).
    ///
    /// `table` is only used to qualify the error message.
    pub fn coerce(&self, table: &str, value: Value) -> Result<Value> {
        let fail = |value: &Value| {
            Error::type_conversion(value, format!("{table}.{}", self.name), self.ty.name())
        };

        if value.is_null() {
            return Ok(value);
        }

        match self.ty {
            FieldType::String | FieldType::Text | FieldType::Date | FieldType::Timestamp => {
                match value {
                    Value::String(_) => Ok(value),
                    Value::Number(n) if self.ty.is_textual() => Ok(Value::String(n.to_string())),
                    other => Err(fail(&other)),
                }
            }
            FieldType::Integer | FieldType::Short | FieldType::Byte | FieldType::Long => {
                let int = match &value {
                    Value::Number(n) => n
                        .as_i64()
                        .or_else(|| n.as_f64().filter(|f| is_integral(*f)).map(|f| f as i64)),
                    Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match int {
                    Some(int) if self.ty.fits(int) => Ok(Value::from(int)),
                    _ => Err(fail(&value)),
                }
            }
            FieldType::Float | FieldType::Double => {
                let float = match &value {
                    Value::Number(_) => return Ok(value),
                    Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
                    Value::String(s) => s.trim().parse::<f64>().ok().and_then(Number::from_f64),
                    _ => None,
                };
                float.map(Value::Number).ok_or_else(|| fail(&value))
            }
            FieldType::Decimal => match &value {
                Value::Number(_) => Ok(value),
                Value::String(s) if s.trim().parse::<f64>().is_ok() => Ok(value),
                _ => Err(fail(&value)),
            },
            FieldType::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(fail(&value)),
            },
        }
    }

    /// True if `value` counts as "not provided" for a required check.
    pub fn is_blank(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl FieldType {
    /// Maps the Java type names used by the backend datamodel.
    pub fn from_java(src: &str) -> Option<FieldType> {
        Some(match src {
            "java.lang.String" => FieldType::String,
            "text" => FieldType::Text,
            "java.lang.Integer" => FieldType::Integer,
            "java.lang.Short" => FieldType::Short,
            "java.lang.Byte" => FieldType::Byte,
            "java.lang.Long" => FieldType::Long,
            "java.lang.Float" => FieldType::Float,
            "java.lang.Double" => FieldType::Double,
            "java.math.BigDecimal" => FieldType::Decimal,
            "java.lang.Boolean" => FieldType::Boolean,
            "java.util.Calendar" | "java.util.Date" => FieldType::Date,
            "java.sql.Timestamp" => FieldType::Timestamp,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Text => "Text",
            FieldType::Integer => "Integer",
            FieldType::Short => "Short",
            FieldType::Byte => "Byte",
            FieldType::Long => "Long",
            FieldType::Float => "Float",
            FieldType::Double => "Double",
            FieldType::Decimal => "Decimal",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Timestamp => "Timestamp",
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Integer
                | FieldType::Short
                | FieldType::Byte
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Decimal
        )
    }

    pub fn default_value(self) -> Value {
        match self {
            FieldType::String | FieldType::Text => Value::String(String::new()),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Date | FieldType::Timestamp => Value::Null,
            _ => Value::from(0),
        }
    }

    fn fits(self, int: i64) -> bool {
        match self {
            FieldType::Byte => i8::try_from(int).is_ok(),
            FieldType::Short => i16::try_from(int).is_ok(),
            FieldType::Integer => i32::try_from(int).is_ok(),
            _ => true,
        }
    }
}
