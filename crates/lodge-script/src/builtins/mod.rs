//! Built-in globals available to every script.

pub mod console;

use crate::runtime::{Environment, Value};

/// Registers all built-in globals in `env`.
pub fn register_builtins(env: &Environment) {
    env.define("console", console::console_object());
    env.define("undefined", Value::Undefined);
    env.define("NaN", Value::Number(f64::NAN));
    env.define("Infinity", Value::Number(f64::INFINITY));
}
