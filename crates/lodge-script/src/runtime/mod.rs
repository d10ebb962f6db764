//! Runtime types: values, shared objects, scopes and callables.

pub mod environment;
pub mod function;
pub mod object;
pub mod value;

pub use environment::Environment;
pub use function::{Callable, NativeFn, ScriptFunction};
pub use object::{ArrayRef, ObjectRef};
pub use value::Value;
