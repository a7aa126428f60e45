//! Scalar conversion of raw XML strings into typed values.

use std::fmt;
use std::str::FromStr;

use crate::error::{DigestError, Result};
use crate::object::Value;

/// Primitive kinds a raw string can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarKind {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    /// Get the canonical name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarKind {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "integer" | "int" => Ok(Self::Integer),
            "float" | "double" => Ok(Self::Float),
            "boolean" | "bool" => Ok(Self::Boolean),
            _ => Err(DigestError::protocol(format!("unknown scalar kind '{s}'"))),
        }
    }
}

/// Convert a raw string to a value of the requested kind.
///
/// Booleans never fail: the case-insensitive literal `false` and the empty
/// string are false, anything else is true.
///
/// # Examples
/// ```
/// use regelrecht_digester::convert::{convert, ScalarKind};
/// use regelrecht_digester::object::Value;
///
/// assert_eq!(convert("42", ScalarKind::Integer).unwrap(), Value::Int(42));
/// assert_eq!(convert("FALSE", ScalarKind::Boolean).unwrap(), Value::Bool(false));
/// assert!(convert("forty-two", ScalarKind::Integer).is_err());
/// ```
pub fn convert(raw: &str, kind: ScalarKind) -> Result<Value> {
    let failed = || DigestError::Conversion {
        value: raw.to_string(),
        kind: kind.to_string(),
    };

    match kind {
        ScalarKind::String => Ok(Value::Str(raw.to_string())),
        ScalarKind::Integer => raw.trim().parse().map(Value::Int).map_err(|_| failed()),
        ScalarKind::Float => raw.trim().parse().map(Value::Float).map_err(|_| failed()),
        ScalarKind::Boolean => {
            if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Ok(Value::Bool(!raw.is_empty()))
            }
        }
    }
}

/// Value used for a parameter slot that was never filled.
#[must_use]
pub fn convert_absent(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String => Value::Str(String::new()),
        ScalarKind::Integer => Value::Int(0),
        ScalarKind::Float => Value::Float(0.0),
        ScalarKind::Boolean => Value::Bool(false),
    }
}
