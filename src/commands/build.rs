//! Build command implementation
//!
//! Runs the full pipeline on one root and prints the customized manifests
//! as a YAML stream, with the internal build annotations removed.

use anyhow::Result;
use clap::Args;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use kustomize::defaults::default_cache_root;
use kustomize::options::BuildOptions;
use kustomize::suggestions;
use kustomize::target;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Kustomization root to build
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Allow exec and container plugins to run
    #[arg(long, env = "KUSTOMIZE_ENABLE_EXEC")]
    pub enable_exec: bool,

    /// Maximum run time of one external plugin, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub plugin_timeout: u64,

    /// Where remote bases are cloned
    ///
    /// Defaults to the system cache directory (e.g. `~/.cache/kustomize`).
    #[arg(long, value_name = "DIR", env = "KUSTOMIZE_CACHE")]
    pub cache_root: Option<PathBuf>,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl BuildArgs {
    pub fn options(&self) -> BuildOptions {
        BuildOptions::default()
            .with_external_plugins(self.enable_exec)
            .with_plugin_timeout(Duration::from_secs(self.plugin_timeout))
            .with_cache_root(Some(
                self.cache_root.clone().unwrap_or_else(default_cache_root),
            ))
    }
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<()> {
    let options = args.options();
    let map = target::build(&args.dir, options).map_err(suggestions::explain)?;
    info!("writing {} resources", map.len());
    super::write_stream(&map.as_yaml()?, args.output.as_deref())
}
