//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Kustomize - Build customized manifests from kustomization roots
#[derive(Parser, Debug)]
#[command(name = "kustomize")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a kustomization root and print the resulting manifests
    Build(commands::build::BuildArgs),

    /// Check that a root's kustomization file loads, without building
    Validate(commands::validate::ValidateArgs),

    /// Print the accumulated resources before the root's transformers run
    Accumulate(commands::accumulate::AccumulateArgs),
}

impl Cli {
    /// The global `--color` value.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Build(args) => commands::build::execute(args),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Accumulate(args) => commands::accumulate::execute(args),
        }
    }
}

/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialisation (e.g. in tests) is not an error worth reporting.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
