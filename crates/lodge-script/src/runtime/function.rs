//! Callable values.

use super::environment::Environment;
use super::value::Value;
use crate::Error;
use crate::ast::Statement;
use std::sync::Arc;

/// Signature of a host-provided function.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

/// A function defined in script source, closed over its defining scope.
#[derive(Clone)]
pub struct ScriptFunction {
    /// The function name (if any)
    pub name: Option<String>,
    /// The parameter names
    pub params: Vec<String>,
    /// The function body
    pub body: Arc<Vec<Statement>>,
    /// The environment the function was created in
    pub closure: Environment,
}

/// A callable value - either a script function or a native function.
pub enum Callable {
    /// A script function
    Function(ScriptFunction),
    /// A native Rust function
    Native {
        /// The function name
        name: String,
        /// The implementation
        func: Box<NativeFn>,
    },
}

impl Callable {
    /// Returns the function's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Callable::Function(func) => func.name.as_deref(),
            Callable::Native { name, .. } => Some(name),
        }
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Function(func) => write!(f, "Function({:?})", func.name),
            Callable::Native { name, .. } => write!(f, "NativeFunction({})", name),
        }
    }
}

impl Value {
    /// Wraps a Rust closure as a callable value.
    pub fn native_function<F>(name: impl Into<String>, func: F) -> Value
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Value::Function(Arc::new(Callable::Native {
            name: name.into(),
            func: Box::new(func),
        }))
    }
}
