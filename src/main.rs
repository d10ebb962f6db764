// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! lodge - run CommonJS-style modules with a cached, extension-resolving loader
//!
//! This is the main entry point for the lodge CLI/REPL.

mod repl;

use anyhow::Context;
use clap::Parser;
use lodge_loader::module_system::value_to_json;
use lodge_loader::{FailurePolicy, LoaderConfig, ModuleLoader};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lodge",
    about = "Run CommonJS-style modules with a cached, extension-resolving loader",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Entry module, resolved against the working directory
    script: Option<String>,

    /// Run code as an anonymous module and print the result
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Option<String>,

    /// Print the entry module's exports as JSON
    #[arg(short = 'p', long)]
    print: bool,

    /// Print the path a specifier resolves to and exit
    #[arg(long, value_name = "SPEC")]
    resolve: Option<String>,

    /// Extension to try, in order (repeatable; replaces the configured list)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// What later loads of a failed module do: rethrow, partial or evict
    #[arg(long, value_name = "POLICY")]
    on_failure: Option<FailurePolicy>,

    /// Configuration file (defaults to ./lodge.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Start interactive REPL
    #[arg(short = 'i', long = "interactive", alias = "repl")]
    interactive: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins over --verbose.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "lodge=debug,lodge_loader=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let config = load_config(cli, &cwd)?;
    tracing::debug!(
        "Extensions {:?}, on failure: {}",
        config.extensions,
        config.on_failure
    );
    let loader = ModuleLoader::new(config);

    if let Some(specifier) = &cli.resolve {
        println!("{}", loader.resolve(specifier, &cwd)?.display());
        return Ok(());
    }

    if let Some(code) = &cli.eval {
        let value = loader.eval(code, &cwd)?;
        if !value.is_undefined() {
            println!("{}", value);
        }
    }

    if let Some(script) = &cli.script {
        let exports = loader.load(script, &cwd)?;
        if cli.print {
            println!("{}", serde_json::to_string_pretty(&value_to_json(&exports))?);
        }
    }

    if cli.interactive || (cli.script.is_none() && cli.eval.is_none()) {
        let mut repl = repl::Repl::new(loader, cwd).context("failed to initialize REPL")?;
        repl.run()?;
    }

    Ok(())
}

/// Defaults, then the config file, then the environment, then flags.
fn load_config(cli: &Cli, cwd: &Path) -> anyhow::Result<LoaderConfig> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::discover(cwd)?,
    };
    config.apply_env()?;

    if !cli.extensions.is_empty() {
        config.set_extensions(&cli.extensions);
    }
    if let Some(policy) = cli.on_failure {
        config.on_failure = policy;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_options() {
        let cli = Cli::try_parse_from([
            "lodge",
            "--ext",
            "mjs",
            "--ext",
            ".js",
            "--on-failure",
            "evict",
            "-p",
            "./app",
        ])
        .unwrap();
        assert_eq!(cli.script.as_deref(), Some("./app"));
        assert_eq!(cli.extensions, vec!["mjs", ".js"]);
        assert_eq!(cli.on_failure, Some(FailurePolicy::Evict));
        assert!(cli.print);
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["lodge", "--on-failure", "never"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lodge.toml"),
            "extensions = [\".json\"]\non_failure = \"partial\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from(["lodge", "--ext", "txt"]).unwrap();
        let config = load_config(&cli, dir.path()).unwrap();
        assert_eq!(config.extensions, vec![".txt"]);
        assert_eq!(config.on_failure, FailurePolicy::Partial);
    }
}
