//! Stage 1: Accumulation
//!
//! Walks one root's `resources`, `components`, generators and
//! `configurations`, in that order, depth first. A base is built in full
//! (accumulated and transformed at its own level) before its output is
//! absorbed, so nothing a parent does can reach back into a base.
//! Components are different: they contribute to, and transform, the
//! collection of the root that names them.

use super::{transform, ResAccumulator};
use crate::config::{self, Kustomization};
use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::options::BuildOptions;
use crate::plugins::{ConfigMapGenerator, Generator, PluginLoader, SecretGenerator};
use crate::resmap::parse_resources;
use crate::tconfig::TransformerConfig;
use log::{debug, info};

/// Accumulate everything `kust` declares into `acc`.
pub fn execute(
    acc: &mut ResAccumulator,
    loader: &FileLoader,
    options: &BuildOptions,
    kust: &Kustomization,
) -> Result<()> {
    info!("accumulating {}", loader.root().display());

    for entry in &kust.resources {
        if loader.is_base(entry) {
            let base = accumulate_base(loader, options, entry)?;
            acc.absorb(base)?;
        } else {
            accumulate_file(acc, loader, entry)?;
        }
    }

    for entry in &kust.components {
        accumulate_component(acc, loader, options, entry)
            .map_err(|e| Error::in_base(entry.as_str(), e))?;
    }

    run_generators(acc, loader, options, kust)?;

    for fragment in TransformerConfig::load_fragments(loader, &kust.configurations)? {
        acc.tconfig.merge_override(fragment);
    }

    debug!(
        "accumulated {} resources under {}",
        acc.resmap.len(),
        loader.root().display()
    );
    Ok(())
}

/// Build the base at `location` into its own accumulator.
///
/// Any failure is wrapped with the base's location.
pub fn accumulate_base(
    loader: &FileLoader,
    options: &BuildOptions,
    location: &str,
) -> Result<ResAccumulator> {
    debug!("entering base {}", location);
    let result = build_base(loader, options, location);
    debug!("leaving base {}", location);
    result.map_err(|e| Error::in_base(location, e))
}

fn build_base(loader: &FileLoader, options: &BuildOptions, location: &str) -> Result<ResAccumulator> {
    let child = loader.new_loader(location)?;
    let (kust, file) = config::load(&child)?;
    if kust.is_component() {
        return Err(Error::Loader {
            path: child.root().join(file),
            message: "a Component may only be referenced from 'components'".to_string(),
        });
    }
    let mut acc = ResAccumulator::new();
    execute(&mut acc, &child, options, &kust)?;
    transform::execute(&mut acc, &child, options, &kust)?;
    Ok(acc)
}

fn accumulate_component(
    acc: &mut ResAccumulator,
    loader: &FileLoader,
    options: &BuildOptions,
    location: &str,
) -> Result<()> {
    debug!("applying component {}", location);
    let child = loader.new_loader(location)?;
    let (kust, file) = config::load(&child)?;
    if !kust.is_component() {
        return Err(Error::Loader {
            path: child.root().join(file),
            message: format!(
                "expected kind '{}' for a component, found '{}'",
                config::COMPONENT_KIND,
                kust.kind
            ),
        });
    }
    execute(acc, &child, options, &kust)?;
    transform::execute(acc, &child, options, &kust)
}

fn accumulate_file(acc: &mut ResAccumulator, loader: &FileLoader, path: &str) -> Result<()> {
    let content = loader.load(path)?;
    let resources = parse_resources(&content).map_err(|e| Error::in_file(path, e))?;
    for mut res in resources {
        if res.origin().is_none() {
            res.set_origin(path);
        }
        acc.resmap.append(res).map_err(|e| Error::in_file(path, e))?;
    }
    Ok(())
}

fn run_generators(
    acc: &mut ResAccumulator,
    loader: &FileLoader,
    options: &BuildOptions,
    kust: &Kustomization,
) -> Result<()> {
    let defaults = kust.generator_options.clone().unwrap_or_default();

    let mut generators: Vec<Box<dyn Generator>> = Vec::new();
    for entry in &kust.config_map_generator {
        generators.push(Box::new(ConfigMapGenerator::new(
            entry.args.clone(),
            &defaults,
            loader.clone(),
        )));
    }
    for entry in &kust.secret_generator {
        generators.push(Box::new(SecretGenerator::new(
            entry.args.clone(),
            entry.secret_type.clone(),
            &defaults,
            loader.clone(),
        )));
    }
    let plugins = PluginLoader::new(loader, options, kust.generator_options.clone());
    generators.extend(plugins.load_generators(&kust.generators)?);

    for generator in generators {
        info!("running generator {}", generator.name());
        let generated = generator.generate()?;
        acc.resmap.merge_all(generated)?;
    }
    Ok(())
}
