// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS require() implementation

use crate::error::LoaderError;
use crate::module_system::loader::{LoaderInner, ModuleLoader};
use lodge_script::Value;
use std::path::PathBuf;
use std::sync::Weak;

/// Builds the `require` function handed to a module living in `base_dir`.
///
/// Modules it loads sit at nesting `depth`. The function holds the loader
/// weakly so modules that stash `require` in their exports don't keep the
/// loader (and its cache) alive.
pub(crate) fn require_function(
    loader: Weak<LoaderInner>,
    base_dir: PathBuf,
    depth: usize,
) -> Value {
    Value::native_function("require", move |args| {
        let specifier = match args.first() {
            Some(Value::String(s)) => s.clone(),
            other => {
                return Err(lodge_script::Error::TypeError(format!(
                    "The \"id\" argument must be of type string. Received {}",
                    other.map(Value::inspect).unwrap_or_else(|| "undefined".to_string())
                )));
            }
        };

        let loader = ModuleLoader::from_weak(&loader)
            .ok_or_else(|| lodge_script::Error::host(LoaderError::LoaderDropped))?;
        loader
            .load_nested(&specifier, &base_dir, depth)
            .map_err(lodge_script::Error::host)
    })
}
