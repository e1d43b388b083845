//! Typed attribute values for neurons, connections and hardware models.
//!
//! Network files carry free-form key/value attributes; models coerce them
//! to concrete types with [`AttributeValue::as_bool`] and friends. A wrong
//! type is a configuration error and fatal to the run.

use crate::error::{NetworkError, Result};

/// One attribute value, as parsed from a network description.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number. Integers coerce to floats on demand.
    Float(f64),
    /// Free-form string.
    Str(String),
    /// Homogeneous-ish list (e.g. per-tap constants, spike trains).
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
        }
    }

    /// Coerce to a boolean. Integers 0/1 are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AttributeType`] on any other variant.
    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(0) => Ok(false),
            Self::Int(1) => Ok(true),
            other => Err(NetworkError::attribute_type(name, "bool", other.type_name())),
        }
    }

    /// Coerce to a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AttributeType`] unless the value is an int.
    pub fn as_int(&self, name: &str) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(NetworkError::attribute_type(name, "int", other.type_name())),
        }
    }

    /// Coerce to a float. Integers widen losslessly enough for metrics.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AttributeType`] on non-numeric variants.
    pub fn as_float(&self, name: &str) -> Result<f64> {
        match self {
            Self::Float(f) => Ok(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Ok(*i as f64),
            other => Err(NetworkError::attribute_type(name, "float", other.type_name())),
        }
    }

    /// Coerce to a string slice.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AttributeType`] unless the value is a string.
    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(NetworkError::attribute_type(name, "string", other.type_name())),
        }
    }

    /// Coerce to a list of floats.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AttributeType`] unless the value is a list of
    /// numbers.
    pub fn as_float_list(&self, name: &str) -> Result<Vec<f64>> {
        match self {
            Self::List(items) => items.iter().map(|v| v.as_float(name)).collect(),
            other => Err(NetworkError::attribute_type(name, "list", other.type_name())),
        }
    }

    /// Coerce to a list of booleans (e.g. an explicit spike train).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AttributeType`] unless the value is a list of
    /// bools.
    pub fn as_bool_list(&self, name: &str) -> Result<Vec<bool>> {
        match self {
            Self::List(items) => items.iter().map(|v| v.as_bool(name)).collect(),
            other => Err(NetworkError::attribute_type(name, "list", other.type_name())),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        Self::List(v.into_iter().map(AttributeValue::Float).collect())
    }
}
