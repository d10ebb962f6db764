// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module loader

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while resolving, reading or executing modules
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No file matched the specifier
    #[error("Cannot find module '{specifier}' from '{}'", base_dir.display())]
    NotFound {
        /// The specifier as written
        specifier: String,
        /// The directory it was resolved against
        base_dir: PathBuf,
    },

    /// The module file exists but could not be read
    #[error("Cannot read module '{}': {source}", path.display())]
    Read {
        /// Absolute module path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The module source could not be parsed
    #[error("Cannot compile module '{}': {message}", path.display())]
    Compile {
        /// Absolute module path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The module raised an error while executing
    #[error("Error in module '{}': {message}", path.display())]
    Execution {
        /// Absolute module path
        path: PathBuf,
        /// Rendered script error
        message: String,
    },

    /// The module failed earlier and stays cached as failed
    #[error("Module '{}' failed to load earlier: {reason}", path.display())]
    PreviouslyFailed {
        /// Absolute module path
        path: PathBuf,
        /// Message of the original failure
        reason: String,
    },

    /// A chain of nested `require` calls went deeper than the loader allows
    #[error("Cannot load module '{}': more than {limit} nested requires", path.display())]
    NestingTooDeep {
        /// Absolute path of the module that would have gone past the limit
        path: PathBuf,
        /// The nesting limit
        limit: usize,
    },

    /// Invalid loader configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A `require` function outlived the loader that created it
    #[error("Module loader has been dropped")]
    LoaderDropped,
}

impl LoaderError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Translates a script engine error raised while running `path`.
    ///
    /// Loader errors that crossed the script boundary from a nested
    /// `require` come back out unchanged.
    pub fn from_script(path: &Path, err: lodge_script::Error) -> Self {
        match err.downcast_host::<LoaderError>() {
            Ok(inner) => inner,
            Err(lodge_script::Error::SyntaxError(message)) => Self::Compile {
                path: path.to_path_buf(),
                message,
            },
            Err(other) => Self::Execution {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        }
    }

    /// Returns true for [`LoaderError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
