//! Merge and patch primitives for structured documents
//!
//! Two patch dialects are supported, both operating on `serde_yaml::Value`:
//!
//! - Field-merge patches (yaml.rs): a partial document deep-merged into the
//!   target, also used when a generator with `merge` behavior meets an
//!   existing resource.
//! - JSON patches (json.rs): an RFC 6902 operation list addressed with JSON
//!   pointers.
//!
//! ## Common Types
//!
//! `PathSegment` and `parse_pointer` turn a JSON pointer such as
//! `/spec/containers/0/image` into navigable segments.

pub mod json;
pub mod yaml;

use crate::error::{Error, Result};

/// Represents a segment in a JSON pointer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A mapping key, or a sequence index still in textual form
    Key(String),
    /// The `-` token: one past the end of a sequence
    End,
}

impl PathSegment {
    /// Interpret this segment as a sequence index.
    pub fn as_index(&self, len: usize) -> Option<usize> {
        match self {
            PathSegment::End => Some(len),
            PathSegment::Key(k) => {
                if k.len() > 1 && k.starts_with('0') {
                    return None;
                }
                k.parse().ok()
            }
        }
    }
}

/// Parse a JSON pointer into segments
///
/// The empty pointer addresses the whole document. `~1` decodes to `/` and
/// `~0` to `~`, in that order.
///
/// # Examples
///
/// ```
/// use kustomize::merge::{parse_pointer, PathSegment};
///
/// let segments = parse_pointer("/metadata/annotations/a~1b").unwrap();
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[2], PathSegment::Key("a/b".to_string()));
/// ```
pub fn parse_pointer(pointer: &str) -> Result<Vec<PathSegment>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer.strip_prefix('/').ok_or_else(|| Error::Patch {
        target: pointer.to_string(),
        message: "JSON pointer must start with '/'".to_string(),
    })?;
    Ok(rest
        .split('/')
        .map(|raw| {
            if raw == "-" {
                PathSegment::End
            } else {
                PathSegment::Key(raw.replace("~1", "/").replace("~0", "~"))
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer_root() {
        assert!(parse_pointer("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pointer_escapes() {
        let segments = parse_pointer("/a~1b/c~0d/-").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("a/b".to_string()),
                PathSegment::Key("c~d".to_string()),
                PathSegment::End,
            ]
        );
    }

    #[test]
    fn test_parse_pointer_requires_slash() {
        assert!(parse_pointer("spec/replicas").is_err());
    }

    #[test]
    fn test_as_index() {
        assert_eq!(PathSegment::Key("2".to_string()).as_index(5), Some(2));
        assert_eq!(PathSegment::Key("02".to_string()).as_index(5), None);
        assert_eq!(PathSegment::Key("x".to_string()).as_index(5), None);
        assert_eq!(PathSegment::End.as_index(5), Some(5));
    }
}
