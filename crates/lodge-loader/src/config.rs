// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration.
//!
//! Settings are layered: built-in defaults, then `lodge.toml`, then the
//! `LODGE_*` environment variables. The CLI applies its own flags last.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "lodge.toml";

/// Environment variable holding a comma-separated extension list.
pub const ENV_EXTENSIONS: &str = "LODGE_EXTENSIONS";

/// Environment variable holding the failure policy.
pub const ENV_ON_FAILURE: &str = "LODGE_ON_FAILURE";

/// What a later `load` sees after a module failed during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the failed record; later loads report the original failure
    #[default]
    Rethrow,
    /// Keep the failed record; later loads return its partial exports
    Partial,
    /// Drop the failed record; later loads read and execute the file again
    Evict,
}

impl FromStr for FailurePolicy {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rethrow" => Ok(Self::Rethrow),
            "partial" => Ok(Self::Partial),
            "evict" => Ok(Self::Evict),
            other => Err(LoaderError::config(format!(
                "unknown failure policy '{}' (expected rethrow, partial or evict)",
                other
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rethrow => "rethrow",
            Self::Partial => "partial",
            Self::Evict => "evict",
        };
        f.write_str(name)
    }
}

/// Built-in executors an extension can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Run the source with the script engine
    Script,
    /// Parse the source as JSON and export the result
    Json,
}

/// Configuration for a [`ModuleLoader`](crate::ModuleLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Extensions tried, in order, when the literal path is not a file
    pub extensions: Vec<String>,

    /// Behavior of later loads of a module that failed
    pub on_failure: FailurePolicy,

    /// Executor used per extension
    pub executors: BTreeMap<String, ExecutorKind>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string()],
            on_failure: FailurePolicy::default(),
            executors: BTreeMap::from([
                (".js".to_string(), ExecutorKind::Script),
                (".json".to_string(), ExecutorKind::Json),
            ]),
        }
    }
}

impl LoaderConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoaderConfig =
            toml::from_str(content).map_err(|e| LoaderError::config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Reads a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoaderError::config(format!("{}: {}", path.display(), e)))?;
        let config: LoaderConfig = toml::from_str(&content)
            .map_err(|e| LoaderError::config(format!("{}: {}", path.display(), e)))?;
        Ok(config.normalized())
    }

    /// Loads `lodge.toml` from `dir` if it exists, otherwise the defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies the `LODGE_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies `LODGE_*` overrides read through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(list) = lookup(ENV_EXTENSIONS) {
            self.set_extensions(list.split(','));
        }
        if let Some(policy) = lookup(ENV_ON_FAILURE) {
            self.on_failure = policy.parse()?;
        }
        Ok(())
    }

    /// Replaces the extension list. Blank entries are ignored.
    pub fn set_extensions<I, S>(&mut self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
    }

    fn normalized(mut self) -> Self {
        let extensions = std::mem::take(&mut self.extensions);
        self.set_extensions(extensions);
        self.executors = std::mem::take(&mut self.executors)
            .into_iter()
            .filter_map(|(ext, kind)| Some((normalize_extension(&ext)?, kind)))
            .collect();
        self
    }
}

/// Trims an extension and gives it a leading dot. Blank input yields `None`.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    if ext.is_empty() || ext == "." {
        None
    } else if ext.starts_with('.') {
        Some(ext.to_string())
    } else {
        Some(format!(".{}", ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.extensions, vec![".js", ".json"]);
        assert_eq!(config.on_failure, FailurePolicy::Rethrow);
        assert_eq!(config.executors.get(".json"), Some(&ExecutorKind::Json));
        assert_eq!(config.executors.get(".js"), Some(&ExecutorKind::Script));
        assert_eq!(config.executors.get(".txt"), None);
    }

    #[test]
    fn test_toml_partial_document_keeps_defaults() {
        let config = LoaderConfig::from_toml_str("on_failure = \"evict\"").unwrap();
        assert_eq!(config.on_failure, FailurePolicy::Evict);
        assert_eq!(config.extensions, vec![".js", ".json"]);
    }

    #[test]
    fn test_toml_normalizes_extensions() {
        let content = r#"
            extensions = ["mjs", ".js", " "]

            [executors]
            mjs = "script"
            data = "json"
        "#;
        let config = LoaderConfig::from_toml_str(content).unwrap();
        assert_eq!(config.extensions, vec![".mjs", ".js"]);
        assert_eq!(config.executors.get(".data"), Some(&ExecutorKind::Json));
        assert_eq!(config.executors.get(".mjs"), Some(&ExecutorKind::Script));
    }

    #[test]
    fn test_toml_rejects_unknown_policy() {
        let err = LoaderConfig::from_toml_str("on_failure = \"ignore\"").unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            (ENV_EXTENSIONS, "ts, .js"),
            (ENV_ON_FAILURE, "Partial"),
        ]);
        let mut config = LoaderConfig::default();
        config
            .apply_env_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.extensions, vec![".ts", ".js"]);
        assert_eq!(config.on_failure, FailurePolicy::Partial);
    }

    #[test]
    fn test_env_rejects_bad_policy() {
        let mut config = LoaderConfig::default();
        let result = config.apply_env_from(|key| (key == ENV_ON_FAILURE).then(|| "sometimes".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_discover_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(LoaderConfig::discover(dir.path()).unwrap(), LoaderConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "extensions = [\".json\"]\n").unwrap();
        let config = LoaderConfig::discover(dir.path()).unwrap();
        assert_eq!(config.extensions, vec![".json"]);
    }

    #[test]
    fn test_policy_round_trips_through_display() {
        for policy in [FailurePolicy::Rethrow, FailurePolicy::Partial, FailurePolicy::Evict] {
            assert_eq!(policy.to_string().parse::<FailurePolicy>().unwrap(), policy);
        }
    }
}
