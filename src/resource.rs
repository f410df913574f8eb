//! # Resources and Identity
//!
//! A `Resource` wraps one structured document (a `serde_yaml::Value`
//! mapping) and derives its identity from the document itself:
//!
//! - **`Gvk`**: group, version and kind, parsed from `apiVersion`/`kind`.
//! - **`ResId`**: a `Gvk` plus `metadata.name` and `metadata.namespace`.
//!
//! ## Build annotations
//!
//! Bookkeeping that must survive transformation (including a round-trip
//! through an external plugin) is kept inside the document as annotations
//! under `internal.config.kubernetes.io/`:
//!
//! - previous names, namespaces and kinds, appended whenever a transformer
//!   renames the resource; the oldest entry is the original identity
//! - the generator behavior (`create`, `merge`, `replace`)
//! - whether the name still needs a content-hash suffix
//! - the origin (root-relative path or generator) for diagnostics
//!
//! `remove_build_annotations` strips all of them and leaves every other
//! field untouched.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix shared by all internal bookkeeping annotations
pub const BUILD_ANNOTATION_PREFIX: &str = "internal.config.kubernetes.io/";
pub const PREVIOUS_NAMES: &str = "internal.config.kubernetes.io/previousNames";
pub const PREVIOUS_NAMESPACES: &str = "internal.config.kubernetes.io/previousNamespaces";
pub const PREVIOUS_KINDS: &str = "internal.config.kubernetes.io/previousKinds";
pub const GENERATOR_BEHAVIOR: &str = "internal.config.kubernetes.io/generatorBehavior";
pub const NEEDS_HASH_SUFFIX: &str = "internal.config.kubernetes.io/needsHashSuffix";
pub const ORIGIN: &str = "internal.config.kubernetes.io/origin";

const NO_GROUP: &str = "[noGrp]";
const NO_VERSION: &str = "[noVer]";
const NO_KIND: &str = "[noKind]";
const NO_NAMESPACE: &str = "[noNs]";

/// Kinds that never live in a namespace
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PriorityClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
];

/// Group, version and kind of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

impl Gvk {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Split an `apiVersion` on its first `/`; no slash means the core group.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// Reassemble the `apiVersion` string.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Whether resources of this kind are cluster-scoped.
    pub fn is_cluster_scoped(&self) -> bool {
        CLUSTER_SCOPED_KINDS.contains(&self.kind.as_str())
    }

    /// Whether this Gvk is selected by `selector`, where empty selector
    /// fields match anything.
    pub fn is_selected_by(&self, selector: &Gvk) -> bool {
        (selector.group.is_empty() || selector.group == self.group)
            && (selector.version.is_empty() || selector.version == self.version)
            && (selector.kind.is_empty() || selector.kind == self.kind)
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or = |s: &str, fallback: &'static str| {
            if s.is_empty() {
                fallback.to_string()
            } else {
                s.to_string()
            }
        };
        write!(
            f,
            "{}.{}.{}",
            or(&self.kind, NO_KIND),
            or(&self.version, NO_VERSION),
            or(&self.group, NO_GROUP)
        )
    }
}

/// Identity of a resource within one accumulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResId {
    pub gvk: Gvk,
    pub name: String,
    /// Empty for cluster-scoped or not-yet-namespaced resources.
    pub namespace: String,
}

impl ResId {
    pub fn new(gvk: Gvk, name: &str, namespace: &str) -> Self {
        Self {
            gvk,
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

impl fmt::Display for ResId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.namespace.is_empty() {
            NO_NAMESPACE
        } else {
            &self.namespace
        };
        write!(f, "{}/{}.{}", self.gvk, self.name, ns)
    }
}

/// How a generated resource combines with one of the same identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBehavior {
    /// Not set; treated like `create`.
    #[default]
    Unspecified,
    /// Must not collide with an existing resource.
    Create,
    /// Deep-merge into the existing resource.
    Merge,
    /// Swap the existing resource's content, keeping its position.
    Replace,
}

impl GenerationBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationBehavior::Unspecified => "unspecified",
            GenerationBehavior::Create => "create",
            GenerationBehavior::Merge => "merge",
            GenerationBehavior::Replace => "replace",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "create" => GenerationBehavior::Create,
            "merge" => GenerationBehavior::Merge,
            "replace" => GenerationBehavior::Replace,
            _ => GenerationBehavior::Unspecified,
        }
    }
}

/// One identified, mutable structured document
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    doc: Value,
}

impl Resource {
    /// Wrap a parsed document, checking that it carries an identity.
    pub fn from_value(doc: Value) -> Result<Self> {
        let map = doc.as_mapping().ok_or_else(|| Error::InvalidResource {
            message: format!("expected a mapping, found {}", describe(&doc)),
        })?;
        for key in ["apiVersion", "kind"] {
            if !map.get(key).map(Value::is_string).unwrap_or(false) {
                return Err(Error::InvalidResource {
                    message: format!("missing '{}' in {}", key, summarize(&doc)),
                });
            }
        }
        let has_name = map
            .get("metadata")
            .and_then(|m| m.get("name"))
            .map(Value::is_string)
            .unwrap_or(false);
        if !has_name {
            return Err(Error::InvalidResource {
                message: format!("missing 'metadata.name' in {}", summarize(&doc)),
            });
        }
        Ok(Self { doc })
    }

    /// Build a resource from parts; used by generators.
    pub fn new(api_version: &str, kind: &str, name: &str, namespace: Option<&str>) -> Self {
        let mut metadata = Mapping::new();
        metadata.insert("name".into(), name.into());
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            metadata.insert("namespace".into(), ns.into());
        }
        let mut doc = Mapping::new();
        doc.insert("apiVersion".into(), api_version.into());
        doc.insert("kind".into(), kind.into());
        doc.insert("metadata".into(), Value::Mapping(metadata));
        Self {
            doc: Value::Mapping(doc),
        }
    }

    pub fn value(&self) -> &Value {
        &self.doc
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.doc
    }

    pub fn into_value(self) -> Value {
        self.doc
    }

    fn str_at(&self, path: &[&str]) -> &str {
        let mut current = &self.doc;
        for key in path {
            match current.get(*key) {
                Some(v) => current = v,
                None => return "",
            }
        }
        current.as_str().unwrap_or("")
    }

    pub fn api_version(&self) -> &str {
        self.str_at(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.str_at(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"])
    }

    pub fn namespace(&self) -> &str {
        self.str_at(&["metadata", "namespace"])
    }

    pub fn gvk(&self) -> Gvk {
        Gvk::from_api_version(self.api_version(), self.kind())
    }

    /// The identity as the document reads right now.
    pub fn cur_id(&self) -> ResId {
        ResId::new(self.gvk(), self.name(), self.namespace())
    }

    /// Identities held before each rename, oldest first.
    pub fn prev_ids(&self) -> Vec<ResId> {
        let names = split_list(self.annotation(PREVIOUS_NAMES));
        let namespaces = split_list(self.annotation(PREVIOUS_NAMESPACES));
        let kinds = split_list(self.annotation(PREVIOUS_KINDS));
        let api_version = self.api_version().to_string();
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = kinds.get(i).map(String::as_str).unwrap_or(self.kind());
                let ns = namespaces.get(i).map(String::as_str).unwrap_or("");
                ResId::new(Gvk::from_api_version(&api_version, kind), name, ns)
            })
            .collect()
    }

    /// The identity this resource had before any transformer renamed it.
    pub fn org_id(&self) -> ResId {
        self.prev_ids()
            .into_iter()
            .next()
            .unwrap_or_else(|| self.cur_id())
    }

    /// Record the current identity before a transformer changes it.
    pub fn store_previous_id(&mut self) {
        let name = self.name().to_string();
        let namespace = self.namespace().to_string();
        let kind = self.kind().to_string();
        for (key, value) in [
            (PREVIOUS_NAMES, name),
            (PREVIOUS_NAMESPACES, namespace),
            (PREVIOUS_KINDS, kind),
        ] {
            let joined = match self.annotation(key) {
                Some(existing) => format!("{},{}", existing, value),
                None => value,
            };
            self.set_annotation(key, &joined);
        }
    }

    /// Set `metadata.name`.
    pub fn set_name(&mut self, name: &str) {
        self.metadata_mut().insert("name".into(), name.into());
    }

    /// Set `metadata.namespace`; an empty value removes it.
    pub fn set_namespace(&mut self, namespace: &str) {
        let metadata = self.metadata_mut();
        if namespace.is_empty() {
            metadata.remove("namespace");
        } else {
            metadata.insert("namespace".into(), namespace.into());
        }
    }

    fn metadata_mut(&mut self) -> &mut Mapping {
        let metadata = ensure_mapping(&mut self.doc)
            .entry("metadata".into())
            .or_insert(Value::Null);
        ensure_mapping(metadata)
    }

    fn string_map_at(&self, key: &str) -> BTreeMap<String, String> {
        self.doc
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(Value::as_mapping)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_string(v)?)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map_at("labels")
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map_at("annotations")
    }

    pub fn annotation(&self, key: &str) -> Option<String> {
        self.doc
            .get("metadata")
            .and_then(|m| m.get("annotations"))
            .and_then(|a| a.get(key))
            .and_then(scalar_string)
    }

    pub fn set_annotation(&mut self, key: &str, value: &str) {
        let annotations = self
            .metadata_mut()
            .entry("annotations".into())
            .or_insert(Value::Null);
        ensure_mapping(annotations).insert(key.into(), value.into());
    }

    pub fn set_label(&mut self, key: &str, value: &str) {
        let labels = self
            .metadata_mut()
            .entry("labels".into())
            .or_insert(Value::Null);
        ensure_mapping(labels).insert(key.into(), value.into());
    }

    pub fn behavior(&self) -> GenerationBehavior {
        self.annotation(GENERATOR_BEHAVIOR)
            .map(|b| GenerationBehavior::parse(&b))
            .unwrap_or_default()
    }

    pub fn set_behavior(&mut self, behavior: GenerationBehavior) {
        self.set_annotation(GENERATOR_BEHAVIOR, behavior.as_str());
    }

    pub fn needs_hash_suffix(&self) -> bool {
        self.annotation(NEEDS_HASH_SUFFIX).as_deref() == Some("enabled")
    }

    pub fn set_needs_hash_suffix(&mut self, enabled: bool) {
        if enabled {
            self.set_annotation(NEEDS_HASH_SUFFIX, "enabled");
        } else {
            self.remove_annotation(NEEDS_HASH_SUFFIX);
        }
    }

    /// Where this resource came from, for diagnostics.
    pub fn origin(&self) -> Option<String> {
        self.annotation(ORIGIN)
    }

    pub fn set_origin(&mut self, origin: &str) {
        self.set_annotation(ORIGIN, origin);
    }

    fn remove_annotation(&mut self, key: &str) {
        if let Some(Value::Mapping(a)) = self
            .doc
            .get_mut("metadata")
            .and_then(|m| m.get_mut("annotations"))
        {
            a.remove(key);
        }
    }

    /// Strip every internal bookkeeping annotation.
    ///
    /// `metadata.annotations` is dropped only if stripping emptied it.
    pub fn remove_build_annotations(&mut self) {
        let Some(metadata) = self.doc.get_mut("metadata").and_then(Value::as_mapping_mut) else {
            return;
        };
        let Some(Value::Mapping(annotations)) = metadata.get_mut("annotations") else {
            return;
        };
        let before = annotations.len();
        annotations.retain(|k, _| {
            !k.as_str()
                .map(|k| k.starts_with(BUILD_ANNOTATION_PREFIX))
                .unwrap_or(false)
        });
        if annotations.is_empty() && before > 0 {
            metadata.remove("annotations");
        }
    }

    /// Take over `other`'s name, namespace and build annotations.
    ///
    /// Used when new content lands on an existing resource: the result keeps
    /// the identity and rename history of the resource it replaces.
    pub fn keep_identity_of(&mut self, other: &Resource) {
        self.remove_build_annotations();
        self.set_name(other.name());
        self.set_namespace(other.namespace());
        for (key, value) in other.annotations() {
            if key.starts_with(BUILD_ANNOTATION_PREFIX) {
                self.set_annotation(&key, &value);
            }
        }
    }

    /// Serialize this document alone.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.doc)?)
    }
}

/// Replace `value` with an empty mapping unless it already is one.
pub fn ensure_mapping(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(m) => m,
        _ => unreachable!("value was just replaced with a mapping"),
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Render a scalar as a string; mappings and sequences yield `None`.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn summarize(value: &Value) -> String {
    let text = serde_yaml::to_string(value).unwrap_or_default();
    let mut line: String = text.lines().take(3).collect::<Vec<_>>().join(" ");
    if line.len() > 80 {
        line.truncate(80);
        line.push_str("...");
    }
    format!("'{}'", line)
}
