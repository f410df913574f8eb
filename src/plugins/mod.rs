//! Generator and transformer plugins
//!
//! Every generator and transformer, built-in or external, sits behind one of
//! two traits. The kustomization's own directives (`namePrefix`,
//! `configMapGenerator`, `patches`, ...) construct built-ins directly; the
//! `generators` and `transformers` lists declare plugins as documents, which
//! [`PluginLoader`] turns into boxed trait objects.
//!
//! A declared document carrying the [`exec::FUNCTION_ANNOTATION`] runs as an
//! external process. Otherwise its kind must name a built-in.

pub mod exec;
pub mod generators;
pub mod patch;
pub mod transformers;

use crate::config::{
    ConfigMapArgs, GeneratorOptions, PatchJson6902, SecretArgs, Selector,
};
use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::options::BuildOptions;
use crate::resmap::{parse_resources, ResMap};
use crate::resource::Resource;
use crate::tconfig::{FieldSpec, TransformerConfig};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

pub use exec::{ExternalPlugin, FUNCTION_ANNOTATION};
pub use generators::{ConfigMapGenerator, SecretGenerator};
pub use patch::{PatchJson6902Transformer, PatchTransformer};
pub use transformers::{
    HashSuffixTransformer, MapTransformer, NameReferenceTransformer, NamespaceTransformer,
    PrefixSuffixTransformer,
};

/// Produces new resources
pub trait Generator {
    /// Identity used in logs and errors
    fn name(&self) -> String;

    fn generate(&self) -> Result<ResMap>;
}

/// Mutates an existing collection in place
pub trait Transformer {
    /// Identity used in logs and errors
    fn name(&self) -> String;

    fn transform(&self, map: &mut ResMap) -> Result<()>;
}

/// Kinds that may be declared as generators without a function annotation
pub const BUILTIN_GENERATORS: &[&str] = &["ConfigMapGenerator", "SecretGenerator"];

/// Kinds that may be declared as transformers without a function annotation
pub const BUILTIN_TRANSFORMERS: &[&str] = &[
    "NamespaceTransformer",
    "PrefixSuffixTransformer",
    "LabelTransformer",
    "AnnotationsTransformer",
    "PatchJson6902Transformer",
    "PatchTransformer",
];

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct ConfigMapGeneratorConfig {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(flatten)]
    entry: ConfigMapArgs,
}

#[derive(Debug, Deserialize)]
struct SecretGeneratorConfig {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(flatten)]
    entry: SecretArgs,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceTransformerConfig {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    field_specs: Option<Vec<FieldSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrefixSuffixTransformerConfig {
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    suffix: String,
    #[serde(default)]
    field_specs: Option<Vec<FieldSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelTransformerConfig {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    field_specs: Option<Vec<FieldSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationsTransformerConfig {
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default)]
    field_specs: Option<Vec<FieldSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchJson6902TransformerConfig {
    target: Selector,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    json_op: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PatchTransformerConfig {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    target: Option<Selector>,
}

/// Whether a `generators`/`transformers` entry is an inline document
/// rather than a file path.
pub fn is_inline(entry: &str) -> bool {
    entry.contains('\n') || entry.trim_start().starts_with("apiVersion:")
}

/// Inline patch content, or the content of the root-relative `path`.
pub fn patch_content(
    loader: &FileLoader,
    path: Option<&str>,
    inline: Option<&str>,
    target: &str,
) -> Result<String> {
    match (inline, path) {
        (Some(patch), _) if !patch.trim().is_empty() => Ok(patch.to_string()),
        (_, Some(path)) if !path.is_empty() => loader.load_string(path),
        _ => Err(Error::Patch {
            target: target.to_string(),
            message: "patch has neither a path nor inline content".to_string(),
        }),
    }
}

/// Build the JSON 6902 transformers a kustomization declares.
pub fn json6902_transformers(
    loader: &FileLoader,
    entries: &[PatchJson6902],
) -> Result<Vec<PatchJson6902Transformer>> {
    entries
        .iter()
        .map(|entry| {
            let target = entry.target.to_string();
            let content =
                patch_content(loader, entry.path.as_deref(), entry.patch.as_deref(), &target)?;
            PatchJson6902Transformer::new(entry.target.clone(), &content)
        })
        .collect()
}

/// Build the patch transformers a kustomization declares.
pub fn patch_transformers(
    loader: &FileLoader,
    entries: &[crate::config::Patch],
) -> Result<Vec<PatchTransformer>> {
    entries
        .iter()
        .map(|entry| {
            let target = entry
                .target
                .as_ref()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "<patch target>".to_string());
            let content =
                patch_content(loader, entry.path.as_deref(), entry.patch.as_deref(), &target)?;
            PatchTransformer::new(&content, entry.target.clone())
        })
        .collect()
}

fn decode<T: DeserializeOwned>(res: &Resource) -> Result<T> {
    serde_yaml::from_value(res.value().clone()).map_err(|e| Error::PluginExecution {
        plugin: res.cur_id().to_string(),
        message: format!("invalid plugin configuration: {}", e),
        stderr: String::new(),
    })
}

fn unknown_plugin(res: &Resource) -> Error {
    Error::PluginExecution {
        plugin: res.cur_id().to_string(),
        message: format!(
            "unknown plugin kind '{}' and no {} annotation",
            res.kind(),
            FUNCTION_ANNOTATION
        ),
        stderr: String::new(),
    }
}

/// Fill empty args name/namespace from the declaring document's metadata.
fn with_metadata(mut args: crate::config::GeneratorArgs, meta: ObjectMeta) -> crate::config::GeneratorArgs {
    if args.name.is_empty() {
        args.name = meta.name;
    }
    if args.namespace.is_empty() {
        args.namespace = meta.namespace;
    }
    args
}

/// Turns declared plugin documents into runnable plugins for one root
pub struct PluginLoader<'a> {
    loader: &'a FileLoader,
    options: &'a BuildOptions,
    generator_options: GeneratorOptions,
}

impl<'a> PluginLoader<'a> {
    pub fn new(
        loader: &'a FileLoader,
        options: &'a BuildOptions,
        generator_options: Option<GeneratorOptions>,
    ) -> Self {
        Self {
            loader,
            options,
            generator_options: generator_options.unwrap_or_default(),
        }
    }

    /// Parse every entry into plugin documents, rejecting duplicate
    /// identities.
    pub fn load_configs(&self, entries: &[String]) -> Result<Vec<Resource>> {
        let mut registry = ResMap::new();
        for entry in entries {
            let content = if is_inline(entry) {
                entry.as_bytes().to_vec()
            } else {
                self.loader.load(entry)?
            };
            for res in parse_resources(&content)? {
                registry.append(res).map_err(|e| match e {
                    Error::IdentityConflict { id } => Error::DuplicatePluginIdentity { id },
                    other => other,
                })?;
            }
        }
        Ok(registry.into_resources())
    }

    /// Load the generators named by `entries`, in declared order.
    pub fn load_generators(&self, entries: &[String]) -> Result<Vec<Box<dyn Generator>>> {
        self.load_configs(entries)?
            .iter()
            .map(|res| self.make_generator(res))
            .collect()
    }

    /// Load the transformers named by `entries`, in declared order.
    pub fn load_transformers(
        &self,
        entries: &[String],
        tconfig: &TransformerConfig,
    ) -> Result<Vec<Box<dyn Transformer>>> {
        self.load_configs(entries)?
            .iter()
            .map(|res| self.make_transformer(res, tconfig))
            .collect()
    }

    fn make_generator(&self, res: &Resource) -> Result<Box<dyn Generator>> {
        if let Some(plugin) = ExternalPlugin::from_resource(res, self.loader, self.options)? {
            debug!("loaded external generator {}", Generator::name(&plugin));
            return Ok(Box::new(plugin));
        }
        match res.kind() {
            "ConfigMapGenerator" => {
                let config: ConfigMapGeneratorConfig = decode(res)?;
                let args = with_metadata(config.entry.args, config.metadata);
                Ok(Box::new(ConfigMapGenerator::new(
                    args,
                    &self.generator_options,
                    self.loader.clone(),
                )))
            }
            "SecretGenerator" => {
                let config: SecretGeneratorConfig = decode(res)?;
                let args = with_metadata(config.entry.args, config.metadata);
                Ok(Box::new(SecretGenerator::new(
                    args,
                    config.entry.secret_type,
                    &self.generator_options,
                    self.loader.clone(),
                )))
            }
            _ => Err(unknown_plugin(res)),
        }
    }

    fn make_transformer(
        &self,
        res: &Resource,
        tconfig: &TransformerConfig,
    ) -> Result<Box<dyn Transformer>> {
        if let Some(plugin) = ExternalPlugin::from_resource(res, self.loader, self.options)? {
            debug!("loaded external transformer {}", Transformer::name(&plugin));
            return Ok(Box::new(plugin));
        }
        match res.kind() {
            "NamespaceTransformer" => {
                let config: NamespaceTransformerConfig = decode(res)?;
                Ok(Box::new(NamespaceTransformer {
                    namespace: config.metadata.namespace,
                    field_specs: config
                        .field_specs
                        .unwrap_or_else(|| tconfig.namespace.clone()),
                }))
            }
            "PrefixSuffixTransformer" => {
                let config: PrefixSuffixTransformerConfig = decode(res)?;
                Ok(Box::new(PrefixSuffixTransformer {
                    prefix: config.prefix,
                    suffix: config.suffix,
                    field_specs: config
                        .field_specs
                        .unwrap_or_else(|| tconfig.name_prefix.clone()),
                }))
            }
            "LabelTransformer" => {
                let config: LabelTransformerConfig = decode(res)?;
                Ok(Box::new(MapTransformer::labels(
                    config.labels,
                    config
                        .field_specs
                        .unwrap_or_else(|| tconfig.common_labels.clone()),
                )))
            }
            "AnnotationsTransformer" => {
                let config: AnnotationsTransformerConfig = decode(res)?;
                Ok(Box::new(MapTransformer::annotations(
                    config.annotations,
                    config
                        .field_specs
                        .unwrap_or_else(|| tconfig.common_annotations.clone()),
                )))
            }
            "PatchJson6902Transformer" => {
                let config: PatchJson6902TransformerConfig = decode(res)?;
                let target = config.target.to_string();
                let content = patch_content(
                    self.loader,
                    config.path.as_deref(),
                    config.json_op.as_deref(),
                    &target,
                )?;
                Ok(Box::new(PatchJson6902Transformer::new(config.target, &content)?))
            }
            "PatchTransformer" => {
                let config: PatchTransformerConfig = decode(res)?;
                let content = patch_content(
                    self.loader,
                    config.path.as_deref(),
                    config.patch.as_deref(),
                    &res.cur_id().to_string(),
                )?;
                Ok(Box::new(PatchTransformer::new(&content, config.target)?))
            }
            _ => Err(unknown_plugin(res)),
        }
    }
}
