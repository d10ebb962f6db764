// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File system access used by the resolver and loader

use std::io;
use std::path::{Path, PathBuf};

/// The file system operations the loader needs.
///
/// Swap in another implementation to observe or fake disk access.
pub trait FileSystem: Send + Sync {
    /// True if `path` exists and is a regular file (directories never are).
    fn is_file(&self, path: &Path) -> bool;

    /// Reads a file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns the canonical absolute form of `path`.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The host file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        path.canonicalize()
    }
}
