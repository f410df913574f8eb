//! Path and pattern helpers shared by the loader and the transformers

use crate::error::Result;
use regex::Regex;
use serde_yaml::{Mapping, Value};

/// Compile a selector pattern that must match the whole input.
///
/// Patch selectors treat names as regular expressions, but `web` must not
/// match `web-canary`, so the pattern is anchored at both ends.
pub fn anchored_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}

/// Match `value` against a selector pattern, treating an empty pattern as a
/// wildcard.
pub fn selector_match(pattern: &str, value: &str) -> Result<bool> {
    if pattern.is_empty() {
        return Ok(true);
    }
    if pattern == value {
        return Ok(true);
    }
    Ok(anchored_regex(pattern)?.is_match(value))
}

/// Encode a URL path to be filesystem-safe
///
/// This converts URL characters that are problematic for filesystems
/// into safe alternatives.
pub fn encode_url_path(url: &str) -> String {
    url.chars()
        .map(|c| match c {
            '/' => '-',
            '\\' => '-',
            ':' => '_',
            '*' => '_',
            '?' => '_',
            '"' => '_',
            '<' => '_',
            '>' => '_',
            '|' => '_',
            // Keep alphanumeric, dots, dashes, underscores as-is
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}

/// Split a `/`-separated field path into segments.
///
/// `spec/containers[]/env` yields `["spec", "containers[]", "env"]`; a
/// segment ending in `[]` marks a sequence whose items are all visited.
pub fn split_field_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Visit every value addressed by the field path `path` inside `doc`.
///
/// With `create`, missing mappings along the way are created and a missing
/// leaf is handed to `visit` as `Null`. Without it, paths that do not exist
/// are skipped. Sequences marked with `[]` are never created.
pub fn visit_field_path<F>(doc: &mut Value, path: &str, create: bool, visit: &mut F) -> Result<()>
where
    F: FnMut(&mut Value) -> Result<()>,
{
    let segments = split_field_path(path);
    visit_segments(doc, &segments, create, visit)
}

fn visit_segments<F>(node: &mut Value, segments: &[&str], create: bool, visit: &mut F) -> Result<()>
where
    F: FnMut(&mut Value) -> Result<()>,
{
    let Some((first, rest)) = segments.split_first() else {
        return visit(node);
    };
    let (key, fan_out) = match first.strip_suffix("[]") {
        Some(key) => (key, true),
        None => (*first, false),
    };
    if node.is_null() && create {
        *node = Value::Mapping(Mapping::new());
    }
    let Some(map) = node.as_mapping_mut() else {
        return Ok(());
    };
    if !map.contains_key(key) {
        if !create || fan_out {
            return Ok(());
        }
        map.insert(key.into(), Value::Null);
    }
    let Some(child) = map.get_mut(key) else {
        return Ok(());
    };
    if fan_out {
        if let Value::Sequence(items) = child {
            for item in items {
                visit_segments(item, rest, create, visit)?;
            }
        }
        return Ok(());
    }
    visit_segments(child, rest, create, visit)
}
