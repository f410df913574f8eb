//! Field-merge patches
//!
//! This module deep-merges a partial document into a target document. It is
//! used both for `patches` entries whose content is a mapping and for
//! generators declared with `behavior: merge`.
//!
//! ## Rules
//!
//! - Mappings merge recursively; keys only present in the patch are added.
//! - Scalars from the patch win.
//! - A `null` value in the patch deletes the key from the target.
//! - Sequences are replaced wholesale, except when every item on both sides
//!   is a mapping carrying a `name` key: then items are merged by name and
//!   new names are appended in patch order.
//! - A mapping carrying `$patch: replace` replaces the target value instead
//!   of merging into it; `$patch: delete` removes it.

use log::debug;
use serde_yaml::{Mapping, Value as YamlValue};

/// Directive key recognised inside patch mappings
pub const PATCH_DIRECTIVE: &str = "$patch";

/// What a `$patch` directive asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Merge,
    Replace,
    Delete,
}

/// Read the `$patch` directive of a patch value, defaulting to merge.
pub fn directive_of(patch: &YamlValue) -> Directive {
    match patch.get(PATCH_DIRECTIVE).and_then(YamlValue::as_str) {
        Some("replace") => Directive::Replace,
        Some("delete") => Directive::Delete,
        _ => Directive::Merge,
    }
}

/// Recursively merge `patch` into `target`
///
/// `path` is the dotted location of `target`, used for debug logging.
pub fn merge_yaml_values(target: &mut YamlValue, patch: &YamlValue, path: &str) {
    match (target, patch) {
        (YamlValue::Mapping(target_map), YamlValue::Mapping(patch_map)) => {
            for (key, value) in patch_map {
                if key.as_str() == Some(PATCH_DIRECTIVE) {
                    continue;
                }
                let key_str = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", key));
                let child_path = if path.is_empty() {
                    key_str
                } else {
                    format!("{}.{}", path, key_str)
                };

                if value.is_null() {
                    target_map.remove(key);
                    continue;
                }
                match directive_of(value) {
                    Directive::Delete => {
                        debug!("deleting '{}' per patch directive", child_path);
                        target_map.remove(key);
                    }
                    Directive::Replace => {
                        target_map.insert(key.clone(), strip_directives(value));
                    }
                    Directive::Merge => match target_map.get_mut(key) {
                        Some(existing) => merge_yaml_values(existing, value, &child_path),
                        None => {
                            target_map.insert(key.clone(), strip_directives(value));
                        }
                    },
                }
            }
        }
        (YamlValue::Sequence(target_seq), YamlValue::Sequence(patch_seq)) => {
            if is_named_list(target_seq) && is_named_list(patch_seq) {
                merge_named_lists(target_seq, patch_seq, path);
            } else {
                debug!(
                    "replacing sequence at '{}' (old size: {}, new size: {})",
                    path,
                    target_seq.len(),
                    patch_seq.len()
                );
                *target_seq = patch_seq.iter().map(strip_directives).collect();
            }
        }
        (target, patch) => {
            *target = strip_directives(patch);
        }
    }
}

fn name_of(item: &YamlValue) -> Option<&YamlValue> {
    item.as_mapping().and_then(|m| m.get("name"))
}

fn is_named_list(seq: &[YamlValue]) -> bool {
    seq.iter().all(|item| name_of(item).is_some())
}

fn merge_named_lists(target: &mut Vec<YamlValue>, patch: &[YamlValue], path: &str) {
    for item in patch {
        let Some(name) = name_of(item).cloned() else {
            continue;
        };
        let position = target.iter().position(|t| name_of(t) == Some(&name));
        match (position, directive_of(item)) {
            (Some(idx), Directive::Delete) => {
                target.remove(idx);
            }
            (Some(idx), Directive::Replace) => target[idx] = strip_directives(item),
            (Some(idx), Directive::Merge) => {
                let child_path = format!("{}[name={}]", path, name.as_str().unwrap_or_default());
                merge_yaml_values(&mut target[idx], item, &child_path);
            }
            (None, Directive::Delete) => {}
            (None, _) => target.push(strip_directives(item)),
        }
    }
}

/// Copy a patch value without `$patch` keys and without `null` entries.
pub fn strip_directives(value: &YamlValue) -> YamlValue {
    match value {
        YamlValue::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                if k.as_str() == Some(PATCH_DIRECTIVE) || v.is_null() {
                    continue;
                }
                out.insert(k.clone(), strip_directives(v));
            }
            YamlValue::Mapping(out)
        }
        YamlValue::Sequence(seq) => YamlValue::Sequence(seq.iter().map(strip_directives).collect()),
        other => other.clone(),
    }
}
