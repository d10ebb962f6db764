// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache for require()

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lodge_script::{ObjectRef, Value};
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lifecycle of a cached module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    /// Inserted and running (or waiting on a nested require)
    Executing,
    /// Finished successfully
    Loaded,
    /// Execution failed with this message
    Failed(String),
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executing => f.write_str("executing"),
            Self::Loaded => f.write_str("loaded"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// A cached module.
///
/// The `module` object is what scripts see as `module`; its `exports`
/// property is the exports container handed back to callers.
pub struct ModuleRecord {
    /// Canonical absolute path, the cache key
    filename: PathBuf,
    /// Directory nested requires resolve against
    dirname: PathBuf,
    module: ObjectRef,
    state: RwLock<ModuleState>,
}

impl ModuleRecord {
    /// Create a record in the `Executing` state with empty exports
    pub fn new(filename: PathBuf) -> Self {
        let dirname = filename
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| filename.clone());
        let name = filename.display().to_string();
        let module = ObjectRef::from_entries([
            ("id", Value::from(name.clone())),
            ("filename", Value::from(name)),
            ("loaded", Value::Boolean(false)),
            ("exports", Value::Object(ObjectRef::new())),
        ]);

        Self {
            filename,
            dirname,
            module,
            state: RwLock::new(ModuleState::Executing),
        }
    }

    /// The module's absolute path
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// The module's directory
    pub fn dirname(&self) -> &Path {
        &self.dirname
    }

    /// The `module` object
    pub fn module(&self) -> &ObjectRef {
        &self.module
    }

    /// The current value of `module.exports`
    pub fn exports(&self) -> Value {
        self.module.get("exports").unwrap_or_default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModuleState {
        self.state.read().clone()
    }

    /// True once execution has finished successfully
    pub fn loaded(&self) -> bool {
        *self.state.read() == ModuleState::Loaded
    }

    pub(crate) fn mark_loaded(&self) {
        *self.state.write() = ModuleState::Loaded;
        self.module.set("loaded", Value::Boolean(true));
    }

    pub(crate) fn mark_failed(&self, reason: impl Into<String>) {
        *self.state.write() = ModuleState::Failed(reason.into());
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("filename", &self.filename)
            .field("state", &self.state())
            .finish()
    }
}

/// Thread-safe module cache keyed by absolute path
pub struct ModuleCache {
    records: DashMap<PathBuf, Arc<ModuleRecord>>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Get a cached module by path
    pub fn get(&self, path: &Path) -> Option<Arc<ModuleRecord>> {
        self.records.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a module is cached
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Return the record for `path`, creating it with `make` if absent.
    ///
    /// The flag is true when this call inserted the record. No shard lock is
    /// held once this returns.
    pub fn get_or_insert_with(
        &self,
        path: PathBuf,
        make: impl FnOnce() -> ModuleRecord,
    ) -> (Arc<ModuleRecord>, bool) {
        match self.records.entry(path) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let record = Arc::new(make());
                entry.insert(Arc::clone(&record));
                (record, true)
            }
        }
    }

    /// Remove a module from the cache
    pub fn remove(&self, path: &Path) -> Option<Arc<ModuleRecord>> {
        self.records.remove(path).map(|(_, record)| record)
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        self.records.clear();
    }

    /// All cached records, sorted by path
    pub fn records(&self) -> Vec<Arc<ModuleRecord>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        records
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new()
    }
}
