//! Patch transformers
//!
//! Two flavors share target selection:
//!
//! - `PatchJson6902Transformer` applies an RFC 6902 operation list to the
//!   single resource its target selects.
//! - `PatchTransformer` applies either a field-merge patch or, when the
//!   content is a sequence, a JSON patch to every resource its target
//!   selects. A field-merge patch without a target selects the resource it
//!   names itself.
//!
//! A resource is selected when its current identity or any identity it had
//! before being renamed matches, so a patch written against `web` still
//! reaches `prod-web` after a prefix was added.

use super::Transformer;
use crate::config::Selector;
use crate::error::{Error, Result};
use crate::merge::json::{apply_patch, parse_patch, PatchOp};
use crate::merge::yaml::{directive_of, merge_yaml_values, strip_directives, Directive};
use crate::path::selector_match;
use crate::resmap::ResMap;
use crate::resource::{Gvk, ResId, Resource};
use log::debug;
use serde::Deserialize;
use serde_yaml::Value;

/// Positions of the resources selected by `selector`.
pub fn select(map: &ResMap, selector: &Selector) -> Result<Vec<usize>> {
    let gvk = Gvk::new(&selector.group, &selector.version, &selector.kind);
    let labels = parse_label_selector(&selector.label_selector)?;
    map.positions_where(|res| {
        if !labels.iter().all(|req| req.matches(res)) {
            return Ok(false);
        }
        let mut ids = vec![res.cur_id()];
        ids.extend(res.prev_ids());
        for id in ids {
            if id_matches(&id, &gvk, selector)? {
                return Ok(true);
            }
        }
        Ok(false)
    })
}

fn id_matches(id: &ResId, gvk: &Gvk, selector: &Selector) -> Result<bool> {
    Ok(id.gvk.is_selected_by(gvk)
        && (selector.namespace.is_empty() || selector.namespace == id.namespace)
        && selector_match(&selector.name, &id.name)?)
}

enum LabelRequirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
}

impl LabelRequirement {
    fn matches(&self, res: &Resource) -> bool {
        let labels = res.labels();
        match self {
            LabelRequirement::Equals(k, v) => labels.get(k) == Some(v),
            LabelRequirement::NotEquals(k, v) => labels.get(k) != Some(v),
            LabelRequirement::Exists(k) => labels.contains_key(k),
        }
    }
}

fn parse_label_selector(selector: &str) -> Result<Vec<LabelRequirement>> {
    let mut out = Vec::new();
    for term in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let requirement = if let Some((k, v)) = term.split_once("!=") {
            LabelRequirement::NotEquals(k.trim().to_string(), v.trim().to_string())
        } else if let Some((k, v)) = term.split_once("==") {
            LabelRequirement::Equals(k.trim().to_string(), v.trim().to_string())
        } else if let Some((k, v)) = term.split_once('=') {
            LabelRequirement::Equals(k.trim().to_string(), v.trim().to_string())
        } else {
            LabelRequirement::Exists(term.to_string())
        };
        let key = match &requirement {
            LabelRequirement::Equals(k, _)
            | LabelRequirement::NotEquals(k, _)
            | LabelRequirement::Exists(k) => k,
        };
        if key.is_empty() {
            return Err(Error::Patch {
                target: selector.to_string(),
                message: "label selector term has an empty key".to_string(),
            });
        }
        out.push(requirement);
    }
    Ok(out)
}

/// Apply `ops` to the resource at `idx`.
fn apply_ops_at(map: &mut ResMap, idx: usize, ops: &[PatchOp]) -> Result<()> {
    let Some(existing) = map.get(idx) else {
        return Ok(());
    };
    let mut patched = existing.clone();
    let target = patched.cur_id().to_string();
    apply_patch(patched.value_mut(), ops, &target)?;
    debug!("applied JSON patch to {}", target);
    map.replace_at(idx, patched)
}

/// Applies a JSON patch to exactly one resource
#[derive(Debug, Clone)]
pub struct PatchJson6902Transformer {
    pub target: Selector,
    pub ops: Vec<PatchOp>,
}

impl PatchJson6902Transformer {
    pub fn new(target: Selector, patch: &str) -> Result<Self> {
        Ok(Self {
            target,
            ops: parse_patch(patch)?,
        })
    }
}

impl Transformer for PatchJson6902Transformer {
    fn name(&self) -> String {
        format!("PatchJson6902Transformer/{}", self.target)
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        let matches = select(map, &self.target)?;
        match matches.as_slice() {
            [] => Err(Error::PatchTargetNotFound {
                target: self.target.to_string(),
                message: "no resource matches the target".to_string(),
            }),
            [idx] => apply_ops_at(map, *idx, &self.ops),
            many => Err(Error::PatchTargetNotFound {
                target: self.target.to_string(),
                message: format!("target is ambiguous, {} resources match", many.len()),
            }),
        }
    }
}

/// Content of a `patches` entry, decided at construction
#[derive(Debug, Clone)]
enum PatchBody {
    Json(Vec<PatchOp>),
    Merge(Vec<Value>),
}

/// Applies a field-merge or JSON patch to every selected resource
#[derive(Debug, Clone)]
pub struct PatchTransformer {
    target: Option<Selector>,
    body: PatchBody,
}

impl PatchTransformer {
    /// Parse patch content; a top-level sequence means a JSON patch.
    pub fn new(patch: &str, target: Option<Selector>) -> Result<Self> {
        let mut docs = Vec::new();
        for document in serde_yaml::Deserializer::from_str(patch) {
            let value = Value::deserialize(document)?;
            if !value.is_null() {
                docs.push(value);
            }
        }
        let body = match docs.as_slice() {
            [Value::Sequence(_)] => PatchBody::Json(parse_patch(patch)?),
            [] => {
                return Err(Error::Patch {
                    target: target.map(|t| t.to_string()).unwrap_or_default(),
                    message: "patch is empty".to_string(),
                })
            }
            _ => PatchBody::Merge(docs),
        };
        if matches!(body, PatchBody::Json(_)) && target.is_none() {
            return Err(Error::Patch {
                target: "<none>".to_string(),
                message: "a JSON patch needs a target".to_string(),
            });
        }
        Ok(Self { target, body })
    }

    fn self_target(doc: &Value) -> Result<Selector> {
        let str_at = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or_default().to_string();
        let gvk = Gvk::from_api_version(&str_at(doc.get("apiVersion")), &str_at(doc.get("kind")));
        let metadata = doc.get("metadata");
        let name = str_at(metadata.and_then(|m| m.get("name")));
        if gvk.kind.is_empty() || name.is_empty() {
            return Err(Error::Patch {
                target: "<none>".to_string(),
                message: "a patch without a target must carry kind and metadata.name".to_string(),
            });
        }
        Ok(Selector {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            name: regex::escape(&name),
            namespace: str_at(metadata.and_then(|m| m.get("namespace"))),
            label_selector: String::new(),
        })
    }

    fn apply_merge(&self, map: &mut ResMap, doc: &Value) -> Result<()> {
        let selector = match &self.target {
            Some(target) => target.clone(),
            None => Self::self_target(doc)?,
        };
        let matches = select(map, &selector)?;
        if matches.is_empty() {
            return Err(Error::PatchTargetNotFound {
                target: selector.to_string(),
                message: "no resource matches the patch".to_string(),
            });
        }
        // A patch that names its own target must name exactly one resource.
        if self.target.is_none() && matches.len() > 1 {
            return Err(Error::PatchTargetNotFound {
                target: selector.to_string(),
                message: format!(
                    "found multiple possible resources to match, {} resources match",
                    matches.len()
                ),
            });
        }

        if directive_of(doc) == Directive::Delete {
            for idx in matches.into_iter().rev() {
                let removed = map.remove_at(idx);
                debug!("patch deleted {}", removed.cur_id());
            }
            return Ok(());
        }

        let mut body = doc.clone();
        if let Value::Mapping(top) = &mut body {
            top.remove("apiVersion");
            top.remove("kind");
            if let Some(Value::Mapping(metadata)) = top.get_mut("metadata") {
                metadata.remove("name");
                metadata.remove("namespace");
            }
        }

        for idx in matches {
            let Some(existing) = map.get(idx) else {
                continue;
            };
            let mut patched = existing.clone();
            if directive_of(&body) == Directive::Replace {
                let mut replacement = strip_directives(&body);
                if let Value::Mapping(top) = &mut replacement {
                    top.insert("apiVersion".into(), existing.api_version().into());
                    top.insert("kind".into(), existing.kind().into());
                }
                *patched.value_mut() = replacement;
            } else {
                merge_yaml_values(patched.value_mut(), &body, "");
            }
            patched.keep_identity_of(existing);
            debug!("applied merge patch to {}", patched.cur_id());
            map.replace_at(idx, patched)?;
        }
        Ok(())
    }
}

impl Transformer for PatchTransformer {
    fn name(&self) -> String {
        match &self.target {
            Some(target) => format!("PatchTransformer/{}", target),
            None => "PatchTransformer".to_string(),
        }
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        match &self.body {
            PatchBody::Json(ops) => {
                let Some(target) = &self.target else {
                    return Ok(());
                };
                let matches = select(map, target)?;
                if matches.is_empty() {
                    return Err(Error::PatchTargetNotFound {
                        target: target.to_string(),
                        message: "no resource matches the target".to_string(),
                    });
                }
                for idx in matches {
                    apply_ops_at(map, idx, ops)?;
                }
                Ok(())
            }
            PatchBody::Merge(docs) => {
                for doc in docs {
                    self.apply_merge(map, doc)?;
                }
                Ok(())
            }
        }
    }
}
