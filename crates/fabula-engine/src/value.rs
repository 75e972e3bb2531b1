use std::fmt;

use serde::{Deserialize, Serialize};

/// The uniform result type of expressions and of entity field storage.
///
/// Equality is only defined between values of the same kind; comparing
/// across kinds is always `false` (no coercion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// The absent value.
    Nil,
    /// A 64-bit signed integer value.
    Int(i64),
    /// A text value.
    Str(String),
    /// A boolean value.
    Bool(bool),
    /// An ordered list of integers.
    IntList(Vec<i64>),
    /// An ordered list of strings.
    StrList(Vec<String>),
    /// An ordered list of booleans.
    BoolList(Vec<bool>),
}

impl Value {
    /// The kind name of this value, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::IntList(_) => "int list",
            Self::StrList(_) => "string list",
            Self::BoolList(_) => "bool list",
        }
    }

    /// Borrow the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the string-list payload, if this is a `StrList`.
    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
            parts.join(", ")
        }
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::IntList(items) => write!(f, "[{}]", join(items)),
            Self::StrList(items) => write!(f, "[{}]", join(items)),
            Self::BoolList(items) => write!(f, "[{}]", join(items)),
        }
    }
}
