//! Accumulate command implementation
//!
//! Prints what the root gathers before its own transformers run: raw
//! resources, fully built bases, components and generator output. Build
//! annotations are left in place so renames and generator behavior stay
//! visible.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use kustomize::options::BuildOptions;
use kustomize::suggestions;
use kustomize::target::KustTarget;

/// Arguments for the accumulate command
#[derive(Args, Debug)]
pub struct AccumulateArgs {
    /// Kustomization root to accumulate
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Allow exec and container plugins to run
    #[arg(long, env = "KUSTOMIZE_ENABLE_EXEC")]
    pub enable_exec: bool,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the accumulate command
pub fn execute(args: AccumulateArgs) -> Result<()> {
    let options = BuildOptions::default().with_external_plugins(args.enable_exec);
    let mut target = KustTarget::from_dir(&args.dir, options).map_err(suggestions::explain)?;
    let acc = target.accumulate_target().map_err(suggestions::explain)?;
    super::write_stream(&acc.resmap.as_yaml()?, args.output.as_deref())
}
