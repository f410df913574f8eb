//! # CLI Command Implementations
//!
//! Each subcommand of the `kustomize` command-line tool lives in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `kustomize` library.

pub mod accumulate;
pub mod build;
pub mod validate;

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write a YAML stream to `output`, or to stdout when none is given.
pub fn write_stream(yaml: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, yaml)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(yaml.as_bytes())
                .context("failed to write to stdout")?;
            stdout.flush().context("failed to flush stdout")
        }
    }
}
