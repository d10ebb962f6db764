//! Script value representation.

use super::function::Callable;
use super::object::{ArrayRef, ObjectRef};
use std::fmt;
use std::sync::Arc;

/// How deep `inspect` descends before abbreviating nested containers.
const INSPECT_DEPTH: usize = 2;

/// A script value.
///
/// Values are thread-safe; objects, arrays and functions are shared handles.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Array reference
    Array(ArrayRef),
    /// Object reference
    Object(ObjectRef),
    /// Function reference
    Function(Arc<Callable>),
}

impl PartialEq for Value {
    /// Strict equality (`===`).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN never equals itself; f64 comparison already does that.
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns the object handle, if this is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Identity check for reference values; primitives are never identical.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Converts the value to a number (ToNumber).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Converts the value to a string (ToString).
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(arr) => arr
                .to_vec()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(callable) => function_label(callable),
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Loose equality (`==`).
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(n), Value::String(_)) => *n == other.to_number(),
            (Value::String(_), Value::Number(n)) => self.to_number() == *n,
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            _ => self == other,
        }
    }

    /// Renders the value the way the console and the REPL print it.
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        self.inspect_into(&mut out, 0);
        out
    }

    fn inspect_into(&self, out: &mut String, depth: usize) {
        match self {
            Value::String(s) if depth > 0 => {
                out.push('\'');
                out.push_str(&s.replace('\'', "\\'"));
                out.push('\'');
            }
            Value::Array(arr) => {
                if arr.is_empty() {
                    out.push_str("[]");
                } else if depth > INSPECT_DEPTH {
                    out.push_str("[Array]");
                } else {
                    out.push_str("[ ");
                    for (i, element) in arr.to_vec().iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        element.inspect_into(out, depth + 1);
                    }
                    out.push_str(" ]");
                }
            }
            Value::Object(obj) => {
                if obj.is_empty() {
                    out.push_str("{}");
                } else if depth > INSPECT_DEPTH {
                    out.push_str("[Object]");
                } else {
                    out.push_str("{ ");
                    for (i, (key, value)) in obj.entries().iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        if is_plain_key(key) {
                            out.push_str(key);
                        } else {
                            out.push('\'');
                            out.push_str(key);
                            out.push('\'');
                        }
                        out.push_str(": ");
                        value.inspect_into(out, depth + 1);
                    }
                    out.push_str(" }");
                }
            }
            other => out.push_str(&other.to_js_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inspect())
    }
}

/// Formats a number the way scripts see it (`1` not `1.0`, `NaN`, `Infinity`).
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let label = if n > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

fn function_label(callable: &Callable) -> String {
    match callable.name() {
        Some(name) => format!("[Function: {}]", name),
        None => "[Function (anonymous)]".to_string(),
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c == '$' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(8.0), "8");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Undefined.to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(Value::Object(ObjectRef::new()).to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert_eq!(Value::Boolean(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
    }

    #[test]
    fn test_strict_and_loose_equality() {
        assert_eq!(Value::from("a"), Value::from("a"));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
        assert!(Value::Number(1.0).loose_equals(&Value::from("1")));
        assert!(Value::Boolean(true).loose_equals(&Value::Number(1.0)));
    }

    #[test]
    fn test_object_identity() {
        let obj = ObjectRef::new();
        let a = Value::Object(obj.clone());
        let b = Value::Object(obj);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Value::Object(ObjectRef::new())));
        assert!(!Value::Number(1.0).ptr_eq(&Value::Number(1.0)));
    }

    #[test]
    fn test_inspect() {
        let obj = ObjectRef::new();
        obj.set("name", Value::from("a"));
        obj.set("list", Value::Array(vec![Value::Number(1.0), Value::Null].into()));
        obj.set("odd key", Value::Boolean(true));
        assert_eq!(
            Value::Object(obj).inspect(),
            "{ name: 'a', list: [ 1, null ], 'odd key': true }"
        );
        assert_eq!(Value::from("top").inspect(), "top");
        assert_eq!(Value::Object(ObjectRef::new()).inspect(), "{}");
    }

    #[test]
    fn test_inspect_cycle_is_abbreviated() {
        let obj = ObjectRef::new();
        obj.set("self", Value::Object(obj.clone()));
        assert_eq!(
            Value::Object(obj).inspect(),
            "{ self: { self: { self: [Object] } } }"
        );
    }

    #[test]
    fn test_to_js_string() {
        let arr = Value::Array(vec![Value::Number(1.0), Value::Undefined, Value::from("x")].into());
        assert_eq!(arr.to_js_string(), "1,,x");
        assert_eq!(Value::Object(ObjectRef::new()).to_js_string(), "[object Object]");
    }
}
