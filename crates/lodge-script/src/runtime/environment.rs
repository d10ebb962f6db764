//! Lexical environments for variable binding.

use super::value::Value;
use crate::Error;
use crate::ast::VariableKind;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A lexical environment for variable bindings.
///
/// Environments are shared handles so closures can keep their defining
/// scope alive and observe later assignments to it.
#[derive(Clone, Default)]
pub struct Environment {
    inner: Arc<RwLock<Scope>>,
}

#[derive(Default)]
struct Scope {
    /// The bindings in this environment
    bindings: FxHashMap<String, Binding>,
    /// The outer (parent) environment
    outer: Option<Environment>,
}

/// A variable binding.
struct Binding {
    /// The value
    value: Value,
    /// Whether the binding is mutable (let/var vs const)
    mutable: bool,
    /// Declared with let/const (cannot be redeclared in the same scope)
    lexical: bool,
}

impl Environment {
    /// Creates a new top-level environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new environment nested in `outer`.
    pub fn with_outer(outer: &Environment) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Scope {
                bindings: FxHashMap::default(),
                outer: Some(outer.clone()),
            })),
        }
    }

    /// Defines a mutable binding, replacing any existing one in this scope.
    ///
    /// Used for host-injected bindings and function parameters.
    pub fn define(&self, name: &str, value: Value) {
        self.inner.write().bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
                lexical: false,
            },
        );
    }

    /// Declares a variable with `var`, `let` or `const` semantics.
    pub fn declare(&self, name: &str, value: Value, kind: VariableKind) -> Result<(), Error> {
        let mut scope = self.inner.write();
        let lexical = kind != VariableKind::Var;

        if let Some(existing) = scope.bindings.get_mut(name) {
            if lexical || existing.lexical {
                return Err(Error::SyntaxError(format!(
                    "Identifier '{}' has already been declared",
                    name
                )));
            }
            existing.value = value;
            return Ok(());
        }

        scope.bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: kind != VariableKind::Const,
                lexical,
            },
        );
        Ok(())
    }

    /// Gets a variable's value, searching outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = self.clone();
        loop {
            let outer = {
                let scope = env.inner.read();
                if let Some(binding) = scope.bindings.get(name) {
                    return Some(binding.value.clone());
                }
                scope.outer.clone()
            };
            env = outer?;
        }
    }

    /// Assigns to an existing variable, searching outward.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Error> {
        let mut env = self.clone();
        loop {
            let outer = {
                let mut scope = env.inner.write();
                if let Some(binding) = scope.bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(Error::TypeError(
                            "Assignment to constant variable.".to_string(),
                        ));
                    }
                    binding.value = value;
                    return Ok(());
                }
                scope.outer.clone()
            };
            match outer {
                Some(outer) => env = outer,
                None => return Err(Error::ReferenceError(format!("{} is not defined", name))),
            }
        }
    }

    /// Returns true if `name` is bound in this scope or any outer scope.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let global = Environment::new();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_outer(&global);
        assert_eq!(inner.get("x"), Some(Value::Number(1.0)));
        assert!(inner.get("y").is_none());
    }

    #[test]
    fn test_assign_updates_defining_scope() {
        let global = Environment::new();
        global.declare("x", Value::Number(1.0), VariableKind::Let).unwrap();
        let inner = Environment::with_outer(&global);
        inner.assign("x", Value::Number(2.0)).unwrap();
        assert_eq!(global.get("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_const_is_immutable() {
        let env = Environment::new();
        env.declare("k", Value::Null, VariableKind::Const).unwrap();
        assert!(matches!(
            env.assign("k", Value::Number(1.0)),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_redeclaration_rules() {
        let env = Environment::new();
        env.declare("v", Value::Number(1.0), VariableKind::Var).unwrap();
        env.declare("v", Value::Number(2.0), VariableKind::Var).unwrap();
        assert_eq!(env.get("v"), Some(Value::Number(2.0)));

        env.declare("l", Value::Null, VariableKind::Let).unwrap();
        assert!(env.declare("l", Value::Null, VariableKind::Let).is_err());
        assert!(env.declare("l", Value::Null, VariableKind::Var).is_err());
    }

    #[test]
    fn test_assign_to_undeclared_is_reference_error() {
        let env = Environment::new();
        assert!(matches!(
            env.assign("nope", Value::Null),
            Err(Error::ReferenceError(msg)) if msg == "nope is not defined"
        ));
    }

    #[test]
    fn test_shadowing() {
        let global = Environment::new();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_outer(&global);
        inner.declare("x", Value::Number(2.0), VariableKind::Let).unwrap();
        assert_eq!(inner.get("x"), Some(Value::Number(2.0)));
        assert_eq!(global.get("x"), Some(Value::Number(1.0)));
    }
}
