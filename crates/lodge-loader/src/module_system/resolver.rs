// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution

use crate::config::normalize_extension;
use crate::error::{LoaderError, Result};
use crate::module_system::fs::FileSystem;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Maps a specifier and base directory to a module file.
///
/// The literal path is tried first, then the path with each configured
/// extension appended in order. Directories never match and no `index` or
/// package lookup happens.
pub struct Resolver {
    /// Extensions to try, each with a leading dot
    extensions: Vec<String>,
    fs: Arc<dyn FileSystem>,
}

impl Resolver {
    /// Create a resolver trying `extensions` in order
    pub fn new<I, S>(extensions: I, fs: Arc<dyn FileSystem>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            fs,
        }
    }

    /// The extension list, in lookup order
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Resolve `specifier` against `base_dir` to a canonical file path.
    ///
    /// An absolute specifier ignores `base_dir`.
    pub fn resolve(&self, specifier: &str, base_dir: &Path) -> Result<PathBuf> {
        if specifier.is_empty() {
            return Err(not_found(specifier, base_dir));
        }

        let candidate = base_dir.join(specifier);
        for path in self.candidates(&candidate) {
            trace!("Trying {}", path.display());
            if self.fs.is_file(&path) {
                let resolved = self
                    .fs
                    .canonicalize(&path)
                    .map_err(|source| LoaderError::Read {
                        path: path.clone(),
                        source,
                    })?;
                debug!("Resolved '{}' to {}", specifier, resolved.display());
                return Ok(resolved);
            }
        }

        Err(not_found(specifier, base_dir))
    }

    /// The literal path followed by one candidate per extension.
    fn candidates<'a>(&'a self, candidate: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        std::iter::once(candidate.to_path_buf()).chain(self.extensions.iter().map(move |ext| {
            // Appended, never substituted: `a.config` + `.js` is `a.config.js`.
            let mut name = OsString::from(candidate.as_os_str());
            name.push(ext);
            PathBuf::from(name)
        }))
    }
}

fn not_found(specifier: &str, base_dir: &Path) -> LoaderError {
    LoaderError::NotFound {
        specifier: specifier.to_string(),
        base_dir: base_dir.to_path_buf(),
    }
}
