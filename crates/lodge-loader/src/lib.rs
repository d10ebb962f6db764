// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lodge-loader
//!
//! A synchronous, cached, extension-resolving module loader.
//!
//! Given a specifier and a base directory, the loader resolves the specifier
//! to a file (the literal path first, then each configured extension in
//! order), executes it at most once in an isolated scope, and returns its
//! exports.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lodge_loader::{LoaderConfig, ModuleLoader};
//! use std::path::Path;
//!
//! let loader = ModuleLoader::new(LoaderConfig::default());
//! let exports = loader.load("./app", Path::new("/srv/site"))?;
//! println!("{}", exports);
//! # Ok::<(), lodge_loader::LoaderError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod module_system;

pub use config::{ExecutorKind, FailurePolicy, LoaderConfig};
pub use error::{LoaderError, Result};
pub use module_system::{
    Executor, FileSystem, JsonExecutor, ModuleCache, ModuleLoader, ModuleLoaderBuilder,
    ModuleRecord, ModuleScope, ModuleState, RealFileSystem, Resolver, ScriptExecutor,
};

// Re-export the value types hosts exchange with modules
pub use lodge_script::{ObjectRef, Value};
