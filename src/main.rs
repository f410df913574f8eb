//! # Kustomize CLI
//!
//! This is the binary entry point for the `kustomize` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Printing top-level errors, with their hints, to stderr.
//!
//! The build pipeline itself lives in the `kustomize` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use clap::Parser;
use kustomize::output::{error_prefix, OutputConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let out = OutputConfig::from_env_and_flag(cli.color());
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", error_prefix(&out), e);
            ExitCode::FAILURE
        }
    }
}
