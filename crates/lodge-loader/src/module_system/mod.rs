// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS-style module system
//!
//! - `require()` bound to each module's directory
//! - `module.exports` / `exports`
//! - Synchronous loading with a per-loader cache
//! - Pluggable executors per file extension

mod cache;
mod executor;
mod fs;
mod loader;
mod require;
mod resolver;

pub use cache::{ModuleCache, ModuleRecord, ModuleState};
pub use executor::{Executor, JsonExecutor, ModuleScope, ScriptExecutor, json_to_value, value_to_json};
pub use fs::{FileSystem, RealFileSystem};
pub use loader::{MAX_MODULE_DEPTH, ModuleLoader, ModuleLoaderBuilder};
pub use resolver::Resolver;
