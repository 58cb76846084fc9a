use std::fmt;

use serde::{Deserialize, Serialize};

/// Dynamically typed script value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    Number,
    String,
    Bool,
    Null,
}

impl Value {
    pub fn tag(&self) -> ValueTag {
        match self {
            Self::Number(_) => ValueTag::Number,
            Self::String(_) => ValueTag::String,
            Self::Bool(_) => ValueTag::Bool,
            Self::Null => ValueTag::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::String(value) => value.trim().parse::<f64>().unwrap_or(0.0),
            Self::Bool(true) => 1.0,
            Self::Bool(false) => 0.0,
            Self::Null => 0.0,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::Bool(value) => value.to_string(),
            Self::Null => "null".to_string(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Bool(value) => *value,
            Self::Null => false,
        }
    }

    pub fn equal_to(&self, other: &Value) -> bool {
        crate::operators::equal_to(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
