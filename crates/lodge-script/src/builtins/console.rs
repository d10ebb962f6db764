//! Console built-in object.
//!
//! Provides `console.log`, `console.error`, `console.warn` and `console.info`.

use crate::Error;
use crate::runtime::{ObjectRef, Value};

/// Joins arguments the way `console.log` prints them.
pub fn format_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::inspect)
        .collect::<Vec<_>>()
        .join(" ")
}

/// console.log - prints to stdout
pub fn console_log(args: &[Value]) -> Result<Value, Error> {
    println!("{}", format_args(args));
    Ok(Value::Undefined)
}

/// console.error - prints to stderr
pub fn console_error(args: &[Value]) -> Result<Value, Error> {
    eprintln!("{}", format_args(args));
    Ok(Value::Undefined)
}

/// console.warn - prints warning to stderr
pub fn console_warn(args: &[Value]) -> Result<Value, Error> {
    eprintln!("Warning: {}", format_args(args));
    Ok(Value::Undefined)
}

/// console.info - prints info message
pub fn console_info(args: &[Value]) -> Result<Value, Error> {
    println!("Info: {}", format_args(args));
    Ok(Value::Undefined)
}

/// Builds the `console` object.
pub fn console_object() -> Value {
    Value::Object(ObjectRef::from_entries([
        ("log", Value::native_function("log", console_log)),
        ("error", Value::native_function("error", console_error)),
        ("warn", Value::native_function("warn", console_warn)),
        ("info", Value::native_function("info", console_info)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_args() {
        let args = [
            Value::from("count:"),
            Value::Number(3.0),
            Value::Array(vec![Value::from("a")].into()),
        ];
        assert_eq!(format_args(&args), "count: 3 [ 'a' ]");
        assert_eq!(format_args(&[]), "");
    }

    #[test]
    fn test_console_object_methods() {
        let console = console_object();
        let obj = console.as_object().unwrap();
        for name in ["log", "error", "warn", "info"] {
            assert!(obj.get(name).is_some_and(|v| v.is_function()), "{}", name);
        }
    }
}
