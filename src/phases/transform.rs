//! Stage 2: Transformation
//!
//! Applies one root's transformers to its accumulated collection in a fixed
//! order: namespace, name prefix, name suffix, common labels, common
//! annotations, JSON 6902 patches, field-merge patches, then the entries of
//! `transformers` as declared.

use super::ResAccumulator;
use crate::config::Kustomization;
use crate::error::Result;
use crate::loader::FileLoader;
use crate::options::BuildOptions;
use crate::plugins::{
    self, MapTransformer, NamespaceTransformer, PluginLoader, PrefixSuffixTransformer, Transformer,
};
use log::{debug, info};

/// The transformers `kust` declares, in application order.
pub fn transformers(
    acc: &ResAccumulator,
    loader: &FileLoader,
    options: &BuildOptions,
    kust: &Kustomization,
) -> Result<Vec<Box<dyn Transformer>>> {
    let tconfig = &acc.tconfig;
    let mut list: Vec<Box<dyn Transformer>> = vec![
        Box::new(NamespaceTransformer {
            namespace: kust.namespace.clone(),
            field_specs: tconfig.namespace.clone(),
        }),
        Box::new(PrefixSuffixTransformer {
            prefix: kust.name_prefix.clone(),
            suffix: String::new(),
            field_specs: tconfig.name_prefix.clone(),
        }),
        Box::new(PrefixSuffixTransformer {
            prefix: String::new(),
            suffix: kust.name_suffix.clone(),
            field_specs: tconfig.name_suffix.clone(),
        }),
        Box::new(MapTransformer::labels(
            kust.common_labels.clone(),
            tconfig.common_labels.clone(),
        )),
        Box::new(MapTransformer::annotations(
            kust.common_annotations.clone(),
            tconfig.common_annotations.clone(),
        )),
    ];
    for patch in plugins::json6902_transformers(loader, &kust.patches_json6902)? {
        list.push(Box::new(patch));
    }
    for patch in plugins::patch_transformers(loader, &kust.patches)? {
        list.push(Box::new(patch));
    }
    let declared = PluginLoader::new(loader, options, kust.generator_options.clone());
    list.extend(declared.load_transformers(&kust.transformers, tconfig)?);
    Ok(list)
}

/// Apply the root's transformers to `acc`.
pub fn execute(
    acc: &mut ResAccumulator,
    loader: &FileLoader,
    options: &BuildOptions,
    kust: &Kustomization,
) -> Result<()> {
    let list = transformers(acc, loader, options, kust)?;
    info!(
        "transforming {} resources under {}",
        acc.resmap.len(),
        loader.root().display()
    );
    for transformer in list {
        debug!("running transformer {}", transformer.name());
        transformer.transform(&mut acc.resmap)?;
    }
    Ok(())
}
