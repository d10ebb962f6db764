// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - resolves, caches and executes modules

use crate::config::{ExecutorKind, FailurePolicy, LoaderConfig, normalize_extension};
use crate::error::{LoaderError, Result};
use crate::module_system::cache::{ModuleCache, ModuleRecord, ModuleState};
use crate::module_system::executor::{Executor, JsonExecutor, ModuleScope, ScriptExecutor};
use crate::module_system::fs::{FileSystem, RealFileSystem};
use crate::module_system::require::require_function;
use crate::module_system::resolver::Resolver;
use lodge_script::{ObjectRef, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Deepest chain of nested `require` calls a single load may build.
pub const MAX_MODULE_DEPTH: usize = 128;

/// Module loader.
///
/// Cloning is cheap and clones share one cache. Loading is synchronous: a
/// nested `require` re-enters [`ModuleLoader::load`] on the same stack, and
/// because records are cached before they execute, a cycle gets the partial
/// exports of the module still running instead of recursing.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Arc<LoaderInner>,
}

pub(crate) struct LoaderInner {
    config: LoaderConfig,
    resolver: Resolver,
    cache: ModuleCache,
    fs: Arc<dyn FileSystem>,
    /// Executors keyed by extension (with leading dot)
    executors: HashMap<String, Arc<dyn Executor>>,
    /// Used for extensions without a registered executor
    default_executor: Arc<dyn Executor>,
    globals: Vec<(String, Value)>,
}

impl ModuleLoader {
    /// Create a loader with the real file system and built-in executors
    pub fn new(config: LoaderConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Start building a customized loader
    pub fn builder() -> ModuleLoaderBuilder {
        ModuleLoaderBuilder::default()
    }

    pub(crate) fn from_weak(inner: &Weak<LoaderInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// The configuration this loader was built with
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Get the module cache
    pub fn cache(&self) -> &ModuleCache {
        &self.inner.cache
    }

    /// Clear the module cache. The next load of any module reads it again.
    pub fn clear_cache(&self) {
        debug!("Clearing module cache ({} entries)", self.inner.cache.len());
        self.inner.cache.clear();
    }

    /// Resolve `specifier` against `base_dir` without loading it
    pub fn resolve(&self, specifier: &str, base_dir: &Path) -> Result<PathBuf> {
        self.inner.resolver.resolve(specifier, base_dir)
    }

    /// Load a module and return its exports.
    ///
    /// A module is read and executed at most once per loader; later loads
    /// return the same exports value.
    pub fn load(&self, specifier: &str, base_dir: &Path) -> Result<Value> {
        self.load_nested(specifier, base_dir, 0)
    }

    /// Load on behalf of a module `depth` requires deep.
    pub(crate) fn load_nested(
        &self,
        specifier: &str,
        base_dir: &Path,
        depth: usize,
    ) -> Result<Value> {
        let path = self.resolve(specifier, base_dir)?;
        self.load_resolved(path, depth)
    }

    /// Load the module at `path` exactly, without trying extensions
    pub fn load_from(&self, path: &Path) -> Result<Value> {
        if !self.inner.fs.is_file(path) {
            return Err(LoaderError::NotFound {
                specifier: path.display().to_string(),
                base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            });
        }
        let canonical = self
            .inner
            .fs
            .canonicalize(path)
            .map_err(|source| LoaderError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        self.load_resolved(canonical, 0)
    }

    /// Run `source` as an anonymous, uncached module in `base_dir`.
    ///
    /// Returns the script's completion value rather than its exports.
    pub fn eval(&self, source: &str, base_dir: &Path) -> Result<Value> {
        let scope = self.anonymous_scope(base_dir, "[eval]");
        ScriptExecutor.run(&scope, source)
    }

    /// Module bindings for code that isn't backed by a file, such as REPL
    /// input. `require` resolves against `base_dir`.
    pub fn anonymous_scope(&self, base_dir: &Path, name: &str) -> ModuleScope {
        let exports = Value::Object(ObjectRef::new());
        let filename = base_dir.join(name);
        ModuleScope {
            require: require_function(Arc::downgrade(&self.inner), base_dir.to_path_buf(), 1),
            module: ObjectRef::from_entries([
                ("id", Value::from(name)),
                ("filename", Value::from(filename.display().to_string())),
                ("exports", exports.clone()),
            ]),
            exports,
            filename,
            dirname: base_dir.to_path_buf(),
            globals: self.inner.globals.clone(),
        }
    }

    fn load_resolved(&self, path: PathBuf, depth: usize) -> Result<Value> {
        // Cached modules never execute again, so only fresh loads count.
        if depth > MAX_MODULE_DEPTH && !self.inner.cache.contains(&path) {
            warn!("Refusing to load {} at nesting depth {}", path.display(), depth);
            return Err(LoaderError::NestingTooDeep {
                path,
                limit: MAX_MODULE_DEPTH,
            });
        }

        let (record, inserted) = self
            .inner
            .cache
            .get_or_insert_with(path.clone(), || ModuleRecord::new(path.clone()));

        if inserted {
            self.instantiate(&record, depth)
        } else {
            debug!("Cache hit for {} ({})", path.display(), record.state());
            self.cached_exports(&record)
        }
    }

    fn cached_exports(&self, record: &ModuleRecord) -> Result<Value> {
        match record.state() {
            ModuleState::Failed(reason) if self.inner.config.on_failure == FailurePolicy::Rethrow => {
                Err(LoaderError::PreviouslyFailed {
                    path: record.filename().to_path_buf(),
                    reason,
                })
            }
            // Executing means a cycle; the caller gets the partial exports.
            _ => Ok(record.exports()),
        }
    }

    fn instantiate(&self, record: &ModuleRecord, depth: usize) -> Result<Value> {
        let filename = record.filename();

        let source = match self.inner.fs.read_to_string(filename) {
            Ok(source) => source,
            Err(source) => {
                warn!("Failed to read {}: {}", filename.display(), source);
                self.inner.cache.remove(filename);
                return Err(LoaderError::Read {
                    path: filename.to_path_buf(),
                    source,
                });
            }
        };

        let scope = ModuleScope {
            require: require_function(
                Arc::downgrade(&self.inner),
                record.dirname().to_path_buf(),
                depth + 1,
            ),
            module: record.module().clone(),
            exports: record.exports(),
            filename: filename.to_path_buf(),
            dirname: record.dirname().to_path_buf(),
            globals: self.inner.globals.clone(),
        };

        debug!("Executing {}", filename.display());
        match self.executor_for(filename).execute(&scope, &source) {
            Ok(()) => {
                record.mark_loaded();
                debug!("Loaded {}", filename.display());
                Ok(record.exports())
            }
            Err(err) => {
                warn!("Module {} failed: {}", filename.display(), err);
                record.mark_failed(err.to_string());
                if self.inner.config.on_failure == FailurePolicy::Evict {
                    self.inner.cache.remove(filename);
                }
                Err(err)
            }
        }
    }

    fn executor_for(&self, path: &Path) -> &dyn Executor {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.inner.executors.get(&format!(".{}", ext)))
            .unwrap_or(&self.inner.default_executor)
            .as_ref()
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// Builder for [`ModuleLoader`]
#[derive(Default)]
pub struct ModuleLoaderBuilder {
    config: LoaderConfig,
    fs: Option<Arc<dyn FileSystem>>,
    executors: Vec<(String, Arc<dyn Executor>)>,
    globals: Vec<(String, Value)>,
}

impl ModuleLoaderBuilder {
    /// Use this configuration
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom file system
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Some(Arc::new(fs));
        self
    }

    /// Register an executor for an extension, overriding the configured one
    pub fn executor(mut self, extension: &str, executor: impl Executor + 'static) -> Self {
        if let Some(ext) = normalize_extension(extension) {
            self.executors.push((ext, Arc::new(executor)));
        }
        self
    }

    /// Add a global visible to every module
    pub fn global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.push((name.into(), value));
        self
    }

    /// Build the loader
    pub fn build(self) -> ModuleLoader {
        let fs = self.fs.unwrap_or_else(|| Arc::new(RealFileSystem));

        let mut executors: HashMap<String, Arc<dyn Executor>> = self
            .config
            .executors
            .iter()
            .filter_map(|(ext, kind)| Some((normalize_extension(ext)?, builtin_executor(*kind))))
            .collect();
        executors.extend(self.executors);

        ModuleLoader {
            inner: Arc::new(LoaderInner {
                resolver: Resolver::new(&self.config.extensions, Arc::clone(&fs)),
                config: self.config,
                cache: ModuleCache::new(),
                fs,
                executors,
                default_executor: Arc::new(ScriptExecutor),
                globals: self.globals,
            }),
        }
    }
}

fn builtin_executor(kind: ExecutorKind) -> Arc<dyn Executor> {
    match kind {
        ExecutorKind::Script => Arc::new(ScriptExecutor),
        ExecutorKind::Json => Arc::new(JsonExecutor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "exports.x = 1;").unwrap();

        let loader = ModuleLoader::default();
        let first = loader.load("./a", dir.path()).unwrap();
        let second = loader.load("./a.js", dir.path()).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(loader.cache().len(), 1);
        assert!(loader.cache().records()[0].loaded());
    }

    #[test]
    fn test_clear_cache_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "exports.x = 1;").unwrap();

        let loader = ModuleLoader::default();
        let first = loader.load("./a", dir.path()).unwrap();
        loader.clear_cache();
        assert!(loader.cache().is_empty());
        let second = loader.load("./a", dir.path()).unwrap();
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn test_load_from_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "module.exports = 'a';").unwrap();

        let loader = ModuleLoader::default();
        assert_eq!(loader.load_from(&dir.path().join("a.js")).unwrap(), Value::from("a"));
        assert!(loader.load_from(&dir.path().join("a")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_eval_returns_completion_and_can_require() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("num.json"), "41").unwrap();

        let loader = ModuleLoader::default();
        let value = loader.eval("require('./num') + 1;", dir.path()).unwrap();
        assert_eq!(value, Value::Number(42.0));
        // eval itself is not cached; the required module is.
        assert_eq!(loader.cache().len(), 1);
    }

    #[test]
    fn test_unknown_extension_runs_as_script() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mod"), "exports.kind = 'script';").unwrap();

        let loader = ModuleLoader::default();
        let exports = loader.load("./a.mod", dir.path()).unwrap();
        assert_eq!(exports.as_object().unwrap().get("kind"), Some(Value::from("script")));
    }

    #[test]
    fn test_configured_executor_mapping() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.cfg"), r#"{"port": 80}"#).unwrap();

        let mut config = LoaderConfig::default();
        config.executors.insert("cfg".to_string(), ExecutorKind::Json);
        let loader = ModuleLoader::new(config);
        let exports = loader.load("./data.cfg", dir.path()).unwrap();
        assert_eq!(exports.as_object().unwrap().get("port"), Some(Value::Number(80.0)));
    }

    #[test]
    fn test_require_rejects_non_string() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "require(42);").unwrap();

        let err = ModuleLoader::default().load("./a", dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::Execution { message, .. } if message.contains("must be of type string")));
    }

    #[test]
    fn test_require_outliving_loader() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "module.exports = require;").unwrap();

        let require = {
            let loader = ModuleLoader::default();
            loader.load("./a", dir.path()).unwrap()
        };
        let err = lodge_script::Engine::new()
            .call(&require, vec![Value::from("./a")])
            .unwrap_err();
        assert!(matches!(
            err.downcast_host::<LoaderError>(),
            Ok(LoaderError::LoaderDropped)
        ));
    }
}
