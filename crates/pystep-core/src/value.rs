//! Runtime values: scalars, closures, and the `Bottom` sentinel for
//! declared-but-unassigned locals.

use crate::env::EnvId;
use crate::intern::{Interner, Name};
use std::fmt;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
    Closure(Closure),
    /// Uninitialized local; reading it is a `LookupError::UnboundLocal`.
    Bottom,
}

/// A function value: `def`'s only artifact. Equality is structural over all
/// three fields, per the spec's data model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Closure {
    pub entry_line: u32,
    pub formals: Vec<Name>,
    pub parent_env_id: EnvId,
}

impl Value {
    /// Truthiness per the stepper's dispatch rules: zero/empty/null/False is
    /// false, everything else is true.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::None => false,
            Value::Closure(_) => true,
            Value::Bottom => false,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::None => "NoneType",
            Value::Closure(_) => "function",
            Value::Bottom => "Bottom",
        }
    }

    /// Renders this value the way a debugger snapshot should: `Bottom`
    /// becomes the sentinel glyph rather than a JSON object.
    #[must_use]
    pub fn display(&self, interner: &Interner) -> serde_json::Value {
        match self {
            Value::Int(n) => serde_json::json!(n),
            Value::Float(f) => serde_json::json!(f),
            Value::Bool(b) => serde_json::json!(b),
            Value::Str(s) => serde_json::json!(s),
            Value::None => serde_json::Value::Null,
            Value::Bottom => serde_json::json!("⊥"),
            Value::Closure(c) => serde_json::json!({
                "lineno": c.entry_line,
                "formals": c.formals.iter().map(|n| interner.resolve(*n)).collect::<Vec<_>>(),
                "par_env_id": c.parent_env_id.index(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::None => write!(f, "None"),
            Value::Bottom => write!(f, "⊥"),
            Value::Closure(c) => write!(f, "<closure line {}>", c.entry_line),
        }
    }
}
