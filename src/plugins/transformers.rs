//! Built-in transformers
//!
//! Each transformer writes into the fields selected by its `FieldSpec`
//! rules. Transformers that change `metadata.name` or
//! `metadata.namespace` record the previous identity first, so later
//! patches can still find the resource by the name it was declared with.

use super::Transformer;
use crate::error::{Error, Result};
use crate::path::visit_field_path;
use crate::resmap::ResMap;
use crate::resource::Resource;
use crate::tconfig::{FieldSpec, NameBackReference};
use log::{debug, info};
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const NAME_PATH: &str = "metadata/name";
const NAMESPACE_PATH: &str = "metadata/namespace";

/// Kinds whose names are never prefixed or suffixed
const PREFIX_SUFFIX_SKIPPED_KINDS: &[&str] = &["CustomResourceDefinition", "APIService", "Namespace"];

/// Moves resources into one namespace
#[derive(Debug, Clone)]
pub struct NamespaceTransformer {
    pub namespace: String,
    pub field_specs: Vec<FieldSpec>,
}

impl Transformer for NamespaceTransformer {
    fn name(&self) -> String {
        format!("NamespaceTransformer/{}", self.namespace)
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        if self.namespace.is_empty() {
            return Ok(());
        }
        map.try_for_each_mut(|res| {
            let gvk = res.gvk();
            if gvk.is_cluster_scoped() {
                return Ok(());
            }
            for spec in self.field_specs.iter().filter(|fs| fs.applies_to(&gvk)) {
                if spec.path == NAMESPACE_PATH {
                    if res.namespace() != self.namespace {
                        res.store_previous_id();
                        res.set_namespace(&self.namespace);
                    }
                    continue;
                }
                let namespace = self.namespace.as_str();
                visit_field_path(res.value_mut(), &spec.path, spec.create, &mut |v| {
                    *v = Value::String(namespace.to_string());
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

/// Adds a prefix and/or suffix to names
#[derive(Debug, Clone)]
pub struct PrefixSuffixTransformer {
    pub prefix: String,
    pub suffix: String,
    pub field_specs: Vec<FieldSpec>,
}

impl Transformer for PrefixSuffixTransformer {
    fn name(&self) -> String {
        format!("PrefixSuffixTransformer/{}{}", self.prefix, self.suffix)
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        if self.prefix.is_empty() && self.suffix.is_empty() {
            return Ok(());
        }
        map.try_for_each_mut(|res| {
            let gvk = res.gvk();
            if PREFIX_SUFFIX_SKIPPED_KINDS.contains(&gvk.kind.as_str()) {
                return Ok(());
            }
            let mut renamed = false;
            for spec in self.field_specs.iter().filter(|fs| fs.applies_to(&gvk)) {
                if spec.path == NAME_PATH {
                    // The name is affixed once however many rules select it.
                    if !renamed {
                        let name = format!("{}{}{}", self.prefix, res.name(), self.suffix);
                        res.store_previous_id();
                        res.set_name(&name);
                        renamed = true;
                    }
                    continue;
                }
                visit_field_path(res.value_mut(), &spec.path, false, &mut |v| {
                    if let Some(current) = v.as_str() {
                        *v = Value::String(format!("{}{}{}", self.prefix, current, self.suffix));
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

/// Which metadata map a `MapTransformer` fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Labels,
    Annotations,
}

/// Adds labels or annotations to every selected map field
#[derive(Debug, Clone)]
pub struct MapTransformer {
    pub kind: MapKind,
    pub entries: BTreeMap<String, String>,
    pub field_specs: Vec<FieldSpec>,
}

impl MapTransformer {
    pub fn labels(entries: BTreeMap<String, String>, field_specs: Vec<FieldSpec>) -> Self {
        Self {
            kind: MapKind::Labels,
            entries,
            field_specs,
        }
    }

    pub fn annotations(entries: BTreeMap<String, String>, field_specs: Vec<FieldSpec>) -> Self {
        Self {
            kind: MapKind::Annotations,
            entries,
            field_specs,
        }
    }
}

impl Transformer for MapTransformer {
    fn name(&self) -> String {
        match self.kind {
            MapKind::Labels => "LabelTransformer".to_string(),
            MapKind::Annotations => "AnnotationsTransformer".to_string(),
        }
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        map.try_for_each_mut(|res| {
            let gvk = res.gvk();
            let id = res.cur_id();
            for spec in self.field_specs.iter().filter(|fs| fs.applies_to(&gvk)) {
                visit_field_path(res.value_mut(), &spec.path, spec.create, &mut |v| {
                    if v.is_null() {
                        *v = Value::Mapping(Mapping::new());
                    }
                    let Value::Mapping(target) = v else {
                        return Err(Error::InvalidResource {
                            message: format!("{}: '{}' is not a mapping", id, spec.path),
                        });
                    };
                    for (key, value) in &self.entries {
                        target.insert(key.as_str().into(), value.as_str().into());
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

/// Compute the content hash used as a generated resource's name suffix.
///
/// The hash covers the kind, the current name and the data fields, so two
/// generated resources with different content never share a final name.
pub fn content_hash(res: &Resource) -> Result<String> {
    let doc = res.value();
    let mut fields = serde_json::Map::new();
    fields.insert("kind".to_string(), res.kind().into());
    fields.insert("name".to_string(), res.name().into());
    let data = doc
        .get("data")
        .cloned()
        .unwrap_or_else(|| Value::Mapping(Mapping::new()));
    fields.insert("data".to_string(), serde_json::to_value(&data)?);
    if let Some(binary) = doc.get("binaryData") {
        fields.insert("binaryData".to_string(), serde_json::to_value(binary)?);
    }
    if res.kind() == "Secret" {
        let secret_type = doc.get("type").and_then(Value::as_str).unwrap_or("Opaque");
        fields.insert("type".to_string(), secret_type.into());
    }
    let encoded = serde_json::to_string(&serde_json::Value::Object(fields))?;
    let digest = Sha256::digest(encoded.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(encode_hash(&hex[..10]))
}

/// Swap characters that could make the suffix read like a word or number.
fn encode_hash(hex: &str) -> String {
    hex.chars()
        .map(|c| match c {
            '0' => 'g',
            '1' => 'h',
            '3' => 'k',
            'a' => 'm',
            'e' => 't',
            other => other,
        })
        .collect()
}

/// Appends a content hash to generated resources that asked for one
#[derive(Debug, Clone, Default)]
pub struct HashSuffixTransformer;

impl Transformer for HashSuffixTransformer {
    fn name(&self) -> String {
        "HashSuffixTransformer".to_string()
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        map.try_for_each_mut(|res| {
            if !res.needs_hash_suffix() {
                return Ok(());
            }
            let hash = content_hash(res)?;
            let renamed = format!("{}-{}", res.name(), hash);
            info!("assigning hash suffix: {} -> {}", res.cur_id(), renamed);
            res.store_previous_id();
            res.set_name(&renamed);
            res.set_needs_hash_suffix(false);
            Ok(())
        })
    }
}

/// Rewrites references to renamed resources
///
/// A referrer field holding the original name of a renamed ConfigMap or
/// Secret in the same namespace is updated to the final name.
#[derive(Debug, Clone)]
pub struct NameReferenceTransformer {
    pub back_refs: Vec<NameBackReference>,
}

struct Rename {
    back_ref: usize,
    namespace: String,
    from: String,
    to: String,
}

impl Transformer for NameReferenceTransformer {
    fn name(&self) -> String {
        "NameReferenceTransformer".to_string()
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        let mut renames = Vec::new();
        for res in map.iter() {
            let original = res.org_id();
            if original.name == res.name() {
                continue;
            }
            let gvk = res.gvk();
            for (idx, back_ref) in self.back_refs.iter().enumerate() {
                if gvk.is_selected_by(&back_ref.gvk()) {
                    renames.push(Rename {
                        back_ref: idx,
                        namespace: res.namespace().to_string(),
                        from: original.name.clone(),
                        to: res.name().to_string(),
                    });
                }
            }
        }
        if renames.is_empty() {
            return Ok(());
        }

        map.try_for_each_mut(|res| {
            let gvk = res.gvk();
            let namespace = res.namespace().to_string();
            for rename in renames.iter().filter(|r| r.namespace == namespace) {
                let back_ref = &self.back_refs[rename.back_ref];
                for spec in back_ref.field_specs.iter().filter(|fs| fs.applies_to(&gvk)) {
                    visit_field_path(res.value_mut(), &spec.path, false, &mut |v| {
                        if v.as_str() == Some(rename.from.as_str()) {
                            debug!("rewriting reference {} -> {}", rename.from, rename.to);
                            *v = Value::String(rename.to.clone());
                        }
                        Ok(())
                    })?;
                }
            }
            Ok(())
        })
    }
}
