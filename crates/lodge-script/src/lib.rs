// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lodge-script
//!
//! The script engine that runs lodge modules.
//!
//! ## Overview
//!
//! This crate provides a small JavaScript-subset execution environment:
//! - Lexer and recursive-descent parser
//! - Tree-walking interpreter over lexical environments
//! - Thread-safe values with shared object and array references
//! - A `console` builtin
//! - Bounded nesting: deep source or runaway recursion is an error, not a
//!   stack overflow
//!
//! ## Quick Start
//!
//! ```rust
//! use lodge_script::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("1 + 2;").unwrap();
//! assert_eq!(result, Value::Number(3.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod stack;

pub use ast::Program;
pub use interpreter::Interpreter;
pub use runtime::{ArrayRef, Environment, ObjectRef, Value};
pub use stack::with_script_stack;

/// A script engine instance.
///
/// Owns a global environment seeded with the builtins. Everything run through
/// the same engine shares that environment, which is what the REPL relies on.
pub struct Engine {
    globals: Environment,
    interpreter: Interpreter,
}

impl Engine {
    /// Creates a new engine with the builtins registered.
    pub fn new() -> Self {
        let globals = Environment::new();
        builtins::register_builtins(&globals);
        Self {
            globals,
            interpreter: Interpreter::new(),
        }
    }

    /// Parses source text into a program without running it.
    pub fn compile(source: &str) -> Result<Program, Error> {
        with_script_stack(|| parser::Parser::new(source).parse_program())
    }

    /// Binds a global, replacing any existing binding of the same name.
    pub fn define(&mut self, name: &str, value: Value) {
        self.globals.define(name, value);
    }

    /// Reads a global binding.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    /// Runs a compiled program in the global environment.
    ///
    /// Returns the value of a top-level `return`, or else the value of the
    /// last expression statement.
    pub fn run(&mut self, program: &Program) -> Result<Value, Error> {
        self.interpreter.run(program, &self.globals)
    }

    /// Compiles and runs source text.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let mut engine = lodge_script::Engine::new();
    /// engine.eval("let greeting = 'hi';").unwrap();
    /// assert_eq!(engine.eval("greeting + '!';").unwrap().to_js_string(), "hi!");
    /// ```
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let program = Self::compile(source)?;
        self.run(&program)
    }

    /// Calls a function value.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Error> {
        self.interpreter.call(callee, args)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur while compiling or running a script.
#[derive(Debug)]
pub enum Error {
    /// Syntax error during parsing
    SyntaxError(String),
    /// Type error during execution
    TypeError(String),
    /// Reference error (undefined variable)
    ReferenceError(String),
    /// Range error (call stack exhausted, invalid array length)
    RangeError(String),
    /// A value raised with `throw`
    Thrown(Value),
    /// An error raised by host code called from the script
    Host(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a host error so it can travel through script frames.
    pub fn host(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Host(Box::new(err))
    }

    /// Recovers a host error of type `E`, or returns `self` unchanged.
    pub fn downcast_host<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Host(err) => err.downcast::<E>().map(|e| *e).map_err(Error::Host),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SyntaxError(msg) => write!(f, "SyntaxError: {}", msg),
            Error::TypeError(msg) => write!(f, "TypeError: {}", msg),
            Error::ReferenceError(msg) => write!(f, "ReferenceError: {}", msg),
            Error::RangeError(msg) => write!(f, "RangeError: {}", msg),
            Error::Thrown(value) => write!(f, "Uncaught {}", value.inspect()),
            Error::Host(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Host(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Missing(String);

    impl std::fmt::Display for Missing {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "missing {}", self.0)
        }
    }

    impl std::error::Error for Missing {}

    #[test]
    fn test_eval_returns_last_expression() {
        let mut engine = Engine::new();
        assert_eq!(engine.eval("let a = 2; a * 21;").unwrap(), Value::Number(42.0));
        assert!(engine.eval("let b = 1;").unwrap().is_undefined());
    }

    #[test]
    fn test_globals_persist_between_evals() {
        let mut engine = Engine::new();
        engine.eval("function inc(n) { return n + 1; }").unwrap();
        assert_eq!(engine.eval("inc(1);").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_define_and_get() {
        let mut engine = Engine::new();
        engine.define("answer", Value::Number(42.0));
        assert_eq!(engine.eval("answer;").unwrap(), Value::Number(42.0));
        engine.eval("answer = 7;").unwrap();
        assert_eq!(engine.get("answer"), Some(Value::Number(7.0)));
    }

    #[test]
    fn test_builtins_registered() {
        let mut engine = Engine::new();
        assert_eq!(engine.eval("typeof console.log;").unwrap(), Value::from("function"));
        assert!(engine.eval("undefined;").unwrap().is_undefined());
        assert!(engine.eval("NaN;").unwrap().to_number().is_nan());
    }

    #[test]
    fn test_compile_reports_syntax_error() {
        assert!(matches!(Engine::compile("let = 1;"), Err(Error::SyntaxError(_))));
    }

    #[test]
    fn test_call_script_function() {
        let mut engine = Engine::new();
        let add = engine.eval("(function (a, b) { return a + b; });").unwrap();
        let sum = engine.call(&add, vec![Value::Number(1.0), Value::Number(2.0)]).unwrap();
        assert_eq!(sum, Value::Number(3.0));
    }

    #[test]
    fn test_host_error_passes_through_script_frames() {
        let mut engine = Engine::new();
        engine.define(
            "fail",
            Value::native_function("fail", |_| Err(Error::host(Missing("dep".into())))),
        );
        let err = engine
            .eval("function outer() { return fail(); } outer();")
            .unwrap_err();
        assert_eq!(err.to_string(), "missing dep");
        assert_eq!(err.downcast_host::<Missing>().unwrap(), Missing("dep".into()));
    }

    #[test]
    fn test_downcast_host_keeps_other_errors() {
        let err = Error::TypeError("x".into());
        assert!(matches!(err.downcast_host::<Missing>(), Err(Error::TypeError(_))));
    }

    #[test]
    fn test_thrown_display() {
        let mut engine = Engine::new();
        let err = engine.eval("throw 'boom';").unwrap_err();
        assert_eq!(err.to_string(), "Uncaught boom");
    }
}
