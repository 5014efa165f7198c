mod methods;
mod ser;

pub use ser::to_value;

use crate::error::TplError;
use indexmap::IndexMap;
use serde::Serialize;

/// Runtime value of a template expression. The variant set is closed:
/// templates cannot introduce new types.
#[derive(Debug, Clone, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Insertion order is preserved, so `keys`/`values`/`iter` are stable.
    Hash(IndexMap<String, Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Hash(_) => "Hash",
            Value::Tuple(_) => "Tuple",
        }
    }

    /// Textual form used by output tags. Scalars render canonically,
    /// `Null` renders as the empty string, containers are an error.
    pub fn to_text(&self) -> Result<String, TplError> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Integer(n) => Ok(n.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Str(s) => Ok(s.clone()),
            other => Err(TplError::TypeMismatch(format!(
                "cannot output a {} directly",
                other.variant_name()
            ))),
        }
    }
}

// Variant-wise equality. The only cross-variant coercion is Integer
// promoted to Float; every other cross-variant comparison is false.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
