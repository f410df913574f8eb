//! # Kustomization Schema and Parsing
//!
//! This module defines the data structures that represent a kustomization
//! file and the logic for locating and parsing one inside a root.
//!
//! ## Key Components
//!
//! - **`Kustomization`**: The declarative settings of one root: resource,
//!   component and base references, generator and transformer plugin
//!   declarations, override-configuration fragments and the direct
//!   customization directives (prefix, suffix, namespace, labels,
//!   annotations, patches).
//!
//! - **Argument structs**: `Patch`, `PatchJson6902`, `Selector`,
//!   `ConfigMapArgs`, `SecretArgs` and `GeneratorOptions` hold the nested
//!   entries of the file.
//!
//! ## Loading
//!
//! `load_kust_file` finds exactly one of the recognized file names in the
//! loader's root. `parse` turns its content into a `Kustomization`, filling
//! in the type defaults and folding the deprecated `bases` list into
//! `resources`.

use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::resource::GenerationBehavior;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File names recognized as a kustomization, in lookup order
pub const KUSTOMIZATION_FILE_NAMES: [&str; 3] =
    ["kustomization.yaml", "kustomization.yml", "Kustomization"];

pub const KUSTOMIZATION_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
pub const COMPONENT_API_VERSION: &str = "kustomize.config.k8s.io/v1alpha1";
pub const KUSTOMIZATION_KIND: &str = "Kustomization";
pub const COMPONENT_KIND: &str = "Component";

/// Resource selector used by patch targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
    /// Anchored regular expression; empty matches every name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Comma-separated `key=value` pairs that must all be present.
    #[serde(default)]
    pub label_selector: String,
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        for (key, value) in [
            ("group", &self.group),
            ("version", &self.version),
            ("kind", &self.kind),
            ("name", &self.name),
            ("namespace", &self.namespace),
            ("labelSelector", &self.label_selector),
        ] {
            if !value.is_empty() {
                parts.push(format!("{}={}", key, value));
            }
        }
        if parts.is_empty() {
            write!(f, "<all resources>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

/// A `patches` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Root-relative file holding the patch
    #[serde(default)]
    pub path: Option<String>,
    /// Inline patch content
    #[serde(default)]
    pub patch: Option<String>,
    /// Resources to patch; without it the patch names its own target
    #[serde(default)]
    pub target: Option<Selector>,
}

/// A `patchesJson6902` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchJson6902 {
    pub target: Selector,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub patch: Option<String>,
}

/// Options shared by generated ConfigMaps and Secrets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub disable_name_suffix_hash: bool,
    #[serde(default)]
    pub immutable: bool,
}

impl GeneratorOptions {
    /// Layer `self` over `defaults`; entries in `self` win.
    pub fn over(&self, defaults: &GeneratorOptions) -> GeneratorOptions {
        let mut labels = defaults.labels.clone();
        labels.extend(self.labels.clone());
        let mut annotations = defaults.annotations.clone();
        annotations.extend(self.annotations.clone());
        GeneratorOptions {
            labels,
            annotations,
            disable_name_suffix_hash: self.disable_name_suffix_hash
                || defaults.disable_name_suffix_hash,
            immutable: self.immutable || defaults.immutable,
        }
    }
}

/// Arguments common to ConfigMap and Secret generators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorArgs {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub behavior: GenerationBehavior,
    /// `KEY=VALUE` pairs
    #[serde(default)]
    pub literals: Vec<String>,
    /// `[key=]path` entries
    #[serde(default)]
    pub files: Vec<String>,
    /// `.env` files
    #[serde(default)]
    pub envs: Vec<String>,
    /// Deprecated single `.env` file
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub options: Option<GeneratorOptions>,
}

/// A `configMapGenerator` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigMapArgs {
    #[serde(flatten)]
    pub args: GeneratorArgs,
}

/// A `secretGenerator` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretArgs {
    #[serde(flatten)]
    pub args: GeneratorArgs,
    /// Secret type, `Opaque` when unset
    #[serde(rename = "type", default)]
    pub secret_type: Option<String>,
}

/// The declarative settings of one root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    /// Deprecated alias of `resources`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default)]
    pub generators: Vec<String>,
    #[serde(default)]
    pub transformers: Vec<String>,
    /// Transformer override-configuration fragments
    #[serde(default)]
    pub configurations: Vec<String>,
    #[serde(default)]
    pub name_prefix: String,
    #[serde(default)]
    pub name_suffix: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub common_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub common_annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub patches_json6902: Vec<PatchJson6902>,
    #[serde(default)]
    pub patches: Vec<Patch>,
    #[serde(default)]
    pub config_map_generator: Vec<ConfigMapArgs>,
    #[serde(default)]
    pub secret_generator: Vec<SecretArgs>,
    #[serde(default)]
    pub generator_options: Option<GeneratorOptions>,
}

impl Kustomization {
    /// Fill in type defaults and fold deprecated fields into their
    /// replacements.
    pub fn fix_deprecated_fields(&mut self) {
        if self.kind.is_empty() {
            self.kind = KUSTOMIZATION_KIND.to_string();
        }
        if self.api_version.is_empty() {
            self.api_version = if self.is_component() {
                COMPONENT_API_VERSION
            } else {
                KUSTOMIZATION_API_VERSION
            }
            .to_string();
        }
        let bases = std::mem::take(&mut self.bases);
        self.resources.extend(bases);
    }

    pub fn is_component(&self) -> bool {
        self.kind == COMPONENT_KIND
    }
}

/// Find the single kustomization file in the loader's root.
///
/// Returns the raw content and the file name that was found.
pub fn load_kust_file(loader: &FileLoader) -> Result<(Vec<u8>, String)> {
    let found: Vec<&str> = KUSTOMIZATION_FILE_NAMES
        .iter()
        .copied()
        .filter(|name| loader.fs().is_file(&loader.root().join(name)))
        .collect();
    match found.as_slice() {
        [] => Err(Error::NotFound {
            dir: loader.root().display().to_string(),
        }),
        [name] => Ok((loader.load(name)?, name.to_string())),
        _ => Err(Error::AmbiguousConfig {
            dir: loader.root().display().to_string(),
            files: found.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

/// Parse kustomization content read from `file`.
pub fn parse(content: &[u8], file: &str) -> Result<Kustomization> {
    let text = String::from_utf8_lossy(content);
    if is_blank(&text) {
        return Err(Error::EmptyConfig {
            file: file.to_string(),
        });
    }
    let mut kustomization: Kustomization =
        serde_yaml::from_str(&text).map_err(|e| Error::ConfigParse {
            file: file.to_string(),
            message: e.to_string(),
            hint: hint_for(&text),
        })?;
    kustomization.fix_deprecated_fields();
    Ok(kustomization)
}

/// Locate, read and parse the kustomization of the loader's root.
pub fn load(loader: &FileLoader) -> Result<(Kustomization, String)> {
    let (content, file) = load_kust_file(loader)?;
    let kustomization = parse(&content, &file)?;
    Ok((kustomization, file))
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn hint_for(text: &str) -> Option<String> {
    let tab_indented = text
        .lines()
        .any(|line| line.chars().take_while(|c| c.is_whitespace()).any(|c| c == '\t'));
    if tab_indented {
        return Some(
            "found a tab character that violates indentation; indent with spaces".to_string(),
        );
    }
    None
}
