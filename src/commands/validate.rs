//! # Validate Command Implementation
//!
//! Loads a root's kustomization file and reports what it declares, without
//! reading resources or building anything.
//!
//! This command is a safe, read-only operation.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use kustomize::options::BuildOptions;
use kustomize::output::{emoji, OutputConfig};
use kustomize::suggestions;
use kustomize::target::KustTarget;

/// Validate a kustomization root
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Kustomization root to validate
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

/// Execute the `validate` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating kustomization in {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.dir.display()
    );

    let mut target =
        KustTarget::from_dir(&args.dir, BuildOptions::default()).map_err(suggestions::explain)?;
    let kust = match target.load() {
        Ok(kust) => kust.clone(),
        Err(e) => {
            println!("{} Loading failed", emoji(&out, "❌", "[ERR]"));
            return Err(suggestions::explain(e));
        }
    };

    println!(
        "{} {} parsed successfully",
        emoji(&out, "✅", "[OK]"),
        target.file_name().unwrap_or("kustomization")
    );
    println!("\n{} Summary:", emoji(&out, "📊", "[INFO]"));
    println!("   Kind: {}", kust.kind);
    println!("   Resources: {}", kust.resources.len());
    println!("   Components: {}", kust.components.len());
    println!(
        "   Generators: {}",
        kust.config_map_generator.len() + kust.secret_generator.len() + kust.generators.len()
    );
    println!(
        "   Transformers: {}",
        kust.transformers.len() + kust.patches.len() + kust.patches_json6902.len()
    );
    println!("   Configurations: {}", kust.configurations.len());
    Ok(())
}
