//! JSON patch (RFC 6902) operations
//!
//! Operations are applied in order to a `serde_yaml::Value`; the first one
//! that fails aborts the patch and leaves the target unchanged.
//!
//! Supported operations: `add`, `remove`, `replace`, `move`, `copy`, `test`.

use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use super::{parse_pointer, PathSegment};
use crate::error::{Error, Result};

/// A single JSON patch operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: YamlValue },
    Remove { path: String },
    Replace { path: String, value: YamlValue },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: YamlValue },
}

/// Parse a JSON patch from JSON or YAML text.
///
/// Both forms parse with `serde_yaml`, since JSON is valid YAML here.
pub fn parse_patch(content: &str) -> Result<Vec<PatchOp>> {
    let ops: Vec<PatchOp> = serde_yaml::from_str(content)?;
    Ok(ops)
}

/// Apply a list of operations to `doc`.
///
/// `target` names the resource in error messages.
pub fn apply_patch(doc: &mut YamlValue, ops: &[PatchOp], target: &str) -> Result<()> {
    let mut working = doc.clone();
    for op in ops {
        apply_op(&mut working, op).map_err(|message| Error::Patch {
            target: target.to_string(),
            message,
        })?;
    }
    *doc = working;
    Ok(())
}

fn apply_op(doc: &mut YamlValue, op: &PatchOp) -> std::result::Result<(), String> {
    match op {
        PatchOp::Add { path, value } => add(doc, path, value.clone()),
        PatchOp::Remove { path } => remove(doc, path).map(|_| ()),
        PatchOp::Replace { path, value } => {
            let slot = get_mut(doc, path)?;
            *slot = value.clone();
            Ok(())
        }
        PatchOp::Move { from, path } => {
            if path.starts_with(&format!("{}/", from)) {
                return Err(format!("cannot move '{}' into its own child '{}'", from, path));
            }
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        PatchOp::Copy { from, path } => {
            let value = get_mut(doc, from)?.clone();
            add(doc, path, value)
        }
        PatchOp::Test { path, value } => {
            let actual = get_mut(doc, path)?;
            if *actual == *value {
                Ok(())
            } else {
                Err(format!("test failed at '{}'", path))
            }
        }
    }
}

fn split_parent(path: &str) -> std::result::Result<(Vec<PathSegment>, PathSegment), String> {
    let mut segments = parse_pointer(path).map_err(|e| e.to_string())?;
    let last = segments
        .pop()
        .ok_or_else(|| "operation on the document root is not supported".to_string())?;
    Ok((segments, last))
}

fn navigate<'a>(
    doc: &'a mut YamlValue,
    segments: &[PathSegment],
    path: &str,
) -> std::result::Result<&'a mut YamlValue, String> {
    let mut current = doc;
    for segment in segments {
        current = match current {
            YamlValue::Mapping(map) => match segment {
                PathSegment::Key(key) => map
                    .get_mut(key.as_str())
                    .ok_or_else(|| format!("path '{}' does not exist (missing '{}')", path, key))?,
                PathSegment::End => return Err(format!("'-' is not valid inside '{}'", path)),
            },
            YamlValue::Sequence(seq) => {
                let len = seq.len();
                let idx = segment
                    .as_index(len)
                    .filter(|i| *i < len)
                    .ok_or_else(|| format!("index out of range in '{}'", path))?;
                &mut seq[idx]
            }
            _ => return Err(format!("path '{}' traverses a scalar", path)),
        };
    }
    Ok(current)
}

fn get_mut<'a>(doc: &'a mut YamlValue, path: &str) -> std::result::Result<&'a mut YamlValue, String> {
    let segments = parse_pointer(path).map_err(|e| e.to_string())?;
    navigate(doc, &segments, path)
}

fn add(doc: &mut YamlValue, path: &str, value: YamlValue) -> std::result::Result<(), String> {
    let (parents, last) = split_parent(path)?;
    let parent = navigate(doc, &parents, path)?;
    match parent {
        YamlValue::Mapping(map) => match last {
            PathSegment::Key(key) => {
                map.insert(YamlValue::String(key), value);
                Ok(())
            }
            PathSegment::End => Err(format!("'-' is not valid for a mapping in '{}'", path)),
        },
        YamlValue::Sequence(seq) => {
            let len = seq.len();
            let idx = last
                .as_index(len)
                .filter(|i| *i <= len)
                .ok_or_else(|| format!("index out of range in '{}'", path))?;
            seq.insert(idx, value);
            Ok(())
        }
        _ => Err(format!("cannot add to a scalar at '{}'", path)),
    }
}

fn remove(doc: &mut YamlValue, path: &str) -> std::result::Result<YamlValue, String> {
    let (parents, last) = split_parent(path)?;
    let parent = navigate(doc, &parents, path)?;
    match parent {
        YamlValue::Mapping(map) => match &last {
            PathSegment::Key(key) => map
                .remove(key.as_str())
                .ok_or_else(|| format!("path '{}' does not exist", path)),
            PathSegment::End => Err(format!("'-' is not valid for a mapping in '{}'", path)),
        },
        YamlValue::Sequence(seq) => {
            let len = seq.len();
            let idx = last
                .as_index(len)
                .filter(|i| *i < len)
                .ok_or_else(|| format!("index out of range in '{}'", path))?;
            Ok(seq.remove(idx))
        }
        _ => Err(format!("cannot remove from a scalar at '{}'", path)),
    }
}
