//! # Transformer Configuration
//!
//! Field-path rules that tell the built-in transformers where to write:
//! which kinds get a name prefix, where labels live in a Deployment, which
//! fields of a pod template refer to a ConfigMap by name, and so on.
//!
//! `TransformerConfig::default()` is the built-in rule set. Roots may list
//! override fragments under `configurations`; `merge_override` applies one
//! fragment so that, per category, its rules replace the existing rules for
//! the same kind instead of being added next to them.

use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::resource::Gvk;
use serde::{Deserialize, Serialize};

/// Workloads whose pod template sits at `spec/template`.
const TEMPLATED_WORKLOADS: &[(&str, &str)] = &[
    ("apps", "Deployment"),
    ("apps", "ReplicaSet"),
    ("apps", "DaemonSet"),
    ("apps", "StatefulSet"),
    ("batch", "Job"),
];

/// One field-path rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub path: String,
    /// Create the field (and missing parents) when absent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub create: bool,
}

impl FieldSpec {
    pub fn new(group: &str, kind: &str, path: &str, create: bool) -> Self {
        Self {
            group: group.to_string(),
            version: String::new(),
            kind: kind.to_string(),
            path: path.to_string(),
            create,
        }
    }

    pub fn gvk(&self) -> Gvk {
        Gvk::new(&self.group, &self.version, &self.kind)
    }

    /// Whether this rule applies to resources of type `gvk`.
    pub fn applies_to(&self, gvk: &Gvk) -> bool {
        gvk.is_selected_by(&self.gvk())
    }
}

/// Fields that refer to resources of one kind by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameBackReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub kind: String,
    #[serde(default)]
    pub field_specs: Vec<FieldSpec>,
}

impl NameBackReference {
    pub fn gvk(&self) -> Gvk {
        Gvk::new(&self.group, &self.version, &self.kind)
    }
}

/// The resolved rule set, one list per transformer category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerConfig {
    #[serde(default)]
    pub name_prefix: Vec<FieldSpec>,
    #[serde(default)]
    pub name_suffix: Vec<FieldSpec>,
    #[serde(default)]
    pub namespace: Vec<FieldSpec>,
    #[serde(default)]
    pub common_labels: Vec<FieldSpec>,
    #[serde(default)]
    pub common_annotations: Vec<FieldSpec>,
    #[serde(default)]
    pub name_reference: Vec<NameBackReference>,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        let mut labels = vec![FieldSpec::new("", "", "metadata/labels", true)];
        let mut annotations = vec![FieldSpec::new("", "", "metadata/annotations", true)];
        for (group, kind) in TEMPLATED_WORKLOADS {
            if *kind != "Job" {
                labels.push(FieldSpec::new(group, kind, "spec/selector/matchLabels", true));
            }
            labels.push(FieldSpec::new(group, kind, "spec/template/metadata/labels", true));
            annotations.push(FieldSpec::new(
                group,
                kind,
                "spec/template/metadata/annotations",
                true,
            ));
        }
        labels.push(FieldSpec::new(
            "batch",
            "CronJob",
            "spec/jobTemplate/spec/template/metadata/labels",
            true,
        ));
        annotations.push(FieldSpec::new(
            "batch",
            "CronJob",
            "spec/jobTemplate/spec/template/metadata/annotations",
            true,
        ));
        labels.push(FieldSpec::new("", "Service", "spec/selector", true));

        Self {
            name_prefix: vec![FieldSpec::new("", "", "metadata/name", false)],
            name_suffix: vec![FieldSpec::new("", "", "metadata/name", false)],
            namespace: vec![FieldSpec::new("", "", "metadata/namespace", true)],
            common_labels: labels,
            common_annotations: annotations,
            name_reference: default_name_references(),
        }
    }
}

fn pod_spec_roots() -> Vec<(String, String, String)> {
    let mut roots = vec![("".to_string(), "Pod".to_string(), "spec".to_string())];
    for (group, kind) in TEMPLATED_WORKLOADS {
        roots.push((group.to_string(), kind.to_string(), "spec/template/spec".to_string()));
    }
    roots.push((
        "batch".to_string(),
        "CronJob".to_string(),
        "spec/jobTemplate/spec/template/spec".to_string(),
    ));
    roots
}

fn default_name_references() -> Vec<NameBackReference> {
    let config_map_fields = [
        "volumes[]/configMap/name",
        "volumes[]/projected/sources[]/configMap/name",
        "containers[]/env[]/valueFrom/configMapKeyRef/name",
        "initContainers[]/env[]/valueFrom/configMapKeyRef/name",
        "containers[]/envFrom[]/configMapRef/name",
        "initContainers[]/envFrom[]/configMapRef/name",
    ];
    let secret_fields = [
        "volumes[]/secret/secretName",
        "volumes[]/projected/sources[]/secret/name",
        "containers[]/env[]/valueFrom/secretKeyRef/name",
        "initContainers[]/env[]/valueFrom/secretKeyRef/name",
        "containers[]/envFrom[]/secretRef/name",
        "initContainers[]/envFrom[]/secretRef/name",
        "imagePullSecrets[]/name",
    ];
    let expand = |fields: &[&str]| {
        let mut specs = Vec::new();
        for (group, kind, root) in pod_spec_roots() {
            for field in fields {
                specs.push(FieldSpec::new(&group, &kind, &format!("{}/{}", root, field), false));
            }
        }
        specs
    };
    vec![
        NameBackReference {
            group: String::new(),
            version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            field_specs: expand(&config_map_fields),
        },
        NameBackReference {
            group: String::new(),
            version: "v1".to_string(),
            kind: "Secret".to_string(),
            field_specs: expand(&secret_fields),
        },
    ]
}

impl TransformerConfig {
    /// A config with no rules at all.
    pub fn empty() -> Self {
        Self {
            name_prefix: Vec::new(),
            name_suffix: Vec::new(),
            namespace: Vec::new(),
            common_labels: Vec::new(),
            common_annotations: Vec::new(),
            name_reference: Vec::new(),
        }
    }

    /// Parse one override fragment.
    pub fn from_yaml(content: &str, file: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::empty());
        }
        serde_yaml::from_str(content).map_err(|e| Error::ConfigParse {
            file: file.to_string(),
            message: e.to_string(),
            hint: None,
        })
    }

    /// Load every fragment in `paths`, relative to the loader's root.
    pub fn load_fragments(loader: &FileLoader, paths: &[String]) -> Result<Vec<Self>> {
        paths
            .iter()
            .map(|path| {
                let content = loader.load_string(path)?;
                Self::from_yaml(&content, path)
            })
            .collect()
    }

    /// Apply an override fragment.
    ///
    /// For every category, a rule in `fragment` removes existing rules for
    /// the same kind, and wildcard-kind rules for the same path, before the
    /// fragment's rules are added.
    pub fn merge_override(&mut self, fragment: TransformerConfig) {
        override_rules(&mut self.name_prefix, fragment.name_prefix);
        override_rules(&mut self.name_suffix, fragment.name_suffix);
        override_rules(&mut self.namespace, fragment.namespace);
        override_rules(&mut self.common_labels, fragment.common_labels);
        override_rules(&mut self.common_annotations, fragment.common_annotations);
        for reference in fragment.name_reference {
            self.name_reference.retain(|r| r.kind != reference.kind);
            self.name_reference.push(reference);
        }
    }

    /// Add every rule of `other` not already present.
    pub fn union(&mut self, other: &TransformerConfig) {
        union_rules(&mut self.name_prefix, &other.name_prefix);
        union_rules(&mut self.name_suffix, &other.name_suffix);
        union_rules(&mut self.namespace, &other.namespace);
        union_rules(&mut self.common_labels, &other.common_labels);
        union_rules(&mut self.common_annotations, &other.common_annotations);
        for reference in &other.name_reference {
            match self.name_reference.iter_mut().find(|r| r.gvk() == reference.gvk()) {
                Some(existing) => union_rules(&mut existing.field_specs, &reference.field_specs),
                None => self.name_reference.push(reference.clone()),
            }
        }
    }
}

fn override_rules(existing: &mut Vec<FieldSpec>, overrides: Vec<FieldSpec>) {
    if overrides.is_empty() {
        return;
    }
    existing.retain(|old| {
        !overrides
            .iter()
            .any(|rule| old.kind == rule.kind || (old.kind.is_empty() && old.path == rule.path))
    });
    for rule in overrides {
        if !existing.contains(&rule) {
            existing.push(rule);
        }
    }
}

fn union_rules(existing: &mut Vec<FieldSpec>, extra: &[FieldSpec]) {
    for rule in extra {
        let covered = existing.iter().any(|old| {
            old.group.is_empty() && old.version.is_empty() && old.kind.is_empty() && old.path == rule.path
        });
        if !covered && !existing.contains(rule) {
            existing.push(rule.clone());
        }
    }
}
