// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module executors - run source text against a module scope

use crate::error::{LoaderError, Result};
use lodge_script::{ArrayRef, Engine, ObjectRef, Value};
use std::path::PathBuf;

/// The bindings a module runs with.
#[derive(Debug, Clone)]
pub struct ModuleScope {
    /// `require`, bound to the module's directory
    pub require: Value,
    /// The `module` object
    pub module: ObjectRef,
    /// `exports`, the initial value of `module.exports`
    pub exports: Value,
    /// `__filename`
    pub filename: PathBuf,
    /// `__dirname`
    pub dirname: PathBuf,
    /// Host-provided globals, shared by every module
    pub globals: Vec<(String, Value)>,
}

impl ModuleScope {
    /// Defines the module bindings as globals of `engine`.
    pub fn install(&self, engine: &mut Engine) {
        for (name, value) in &self.globals {
            engine.define(name, value.clone());
        }
        engine.define("require", self.require.clone());
        engine.define("module", Value::Object(self.module.clone()));
        engine.define("exports", self.exports.clone());
        engine.define("__filename", Value::from(self.filename.display().to_string()));
        engine.define("__dirname", Value::from(self.dirname.display().to_string()));
    }
}

/// Runs module source.
///
/// An executor communicates results by mutating `scope.module`; the loader
/// reads `module.exports` back afterwards.
pub trait Executor: Send + Sync {
    /// Execute `source` in `scope`
    fn execute(&self, scope: &ModuleScope, source: &str) -> Result<()>;
}

/// Runs source with the script engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptExecutor;

impl ScriptExecutor {
    /// Compiles and runs `source` in a fresh engine, returning its completion
    /// value.
    pub fn run(&self, scope: &ModuleScope, source: &str) -> Result<Value> {
        let program = Engine::compile(source)
            .map_err(|err| LoaderError::from_script(&scope.filename, err))?;

        let mut engine = Engine::new();
        scope.install(&mut engine);
        engine
            .run(&program)
            .map_err(|err| LoaderError::from_script(&scope.filename, err))
    }
}

impl Executor for ScriptExecutor {
    fn execute(&self, scope: &ModuleScope, source: &str) -> Result<()> {
        self.run(scope, source).map(drop)
    }
}

/// Parses source as JSON and exports the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExecutor;

impl Executor for JsonExecutor {
    fn execute(&self, scope: &ModuleScope, source: &str) -> Result<()> {
        let json: serde_json::Value =
            serde_json::from_str(source).map_err(|e| LoaderError::Compile {
                path: scope.filename.clone(),
                message: e.to_string(),
            })?;
        scope.module.set("exports", json_to_value(&json));
        Ok(())
    }
}

/// Convert serde_json::Value to a script value
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(arr) => {
            Value::Array(ArrayRef::from(arr.iter().map(json_to_value).collect::<Vec<_>>()))
        }
        serde_json::Value::Object(obj) => Value::Object(ObjectRef::from_entries(
            obj.iter().map(|(k, v)| (k.clone(), json_to_value(v))),
        )),
    }
}

/// Convert a script value to serde_json::Value.
///
/// Functions and `undefined` become `null`, as do non-finite numbers.
/// A container that contains itself is cut off with `"[Circular]"`.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    let mut ancestors = Vec::new();
    to_json(value, &mut ancestors)
}

fn to_json(value: &Value, ancestors: &mut Vec<Value>) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(_) | Value::Object(_) if ancestors.iter().any(|a| a.ptr_eq(value)) => {
            serde_json::Value::String("[Circular]".to_string())
        }
        Value::Array(arr) => {
            ancestors.push(value.clone());
            let items = arr.to_vec().iter().map(|v| to_json(v, ancestors)).collect();
            ancestors.pop();
            serde_json::Value::Array(items)
        }
        Value::Object(obj) => {
            ancestors.push(value.clone());
            let map = obj
                .entries()
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v, ancestors)))
                .collect();
            ancestors.pop();
            serde_json::Value::Object(map)
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // Integral values print without a fraction.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}
