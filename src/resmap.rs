//! # Resource Collection
//!
//! `ResMap` is the ordered, identity-indexed container every phase of the
//! build reads and mutates. Insertion order is output order. An auxiliary
//! index from `ResId` to position gives constant-time conflict checks.
//!
//! ## Invariants
//!
//! - No two members share an identity. `append` checks this on every
//!   insert, and `try_for_each_mut` re-checks it after transformers have
//!   renamed resources in place.
//! - `merge` with `merge`/`replace` behavior never moves the existing
//!   resource; it keeps its position and identity.
//! - A `ResMap` owns its resources outright. Combining collections moves or
//!   clones resources into the receiver, never shares them.

use crate::error::{Error, Result};
use crate::merge::yaml::merge_yaml_values;
use crate::resource::{GenerationBehavior, ResId, Resource};
use log::warn;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;

/// Ordered collection of uniquely identified resources
#[derive(Debug, Clone, Default)]
pub struct ResMap {
    resources: Vec<Resource>,
    index: HashMap<ResId, usize>,
}

impl PartialEq for ResMap {
    fn eq(&self, other: &Self) -> bool {
        self.resources == other.resources
    }
}

impl ResMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML stream into a collection.
    ///
    /// Empty documents are skipped and `kind: List` documents are expanded
    /// into their `items`. Duplicate identities fail like `append`.
    pub fn from_yaml(content: &[u8]) -> Result<Self> {
        let mut map = ResMap::new();
        for resource in parse_resources(content)? {
            map.append(resource)?;
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Current identities in collection order.
    pub fn ids(&self) -> Vec<ResId> {
        self.resources.iter().map(Resource::cur_id).collect()
    }

    /// Insert at the end; fails if the identity is already present.
    pub fn append(&mut self, resource: Resource) -> Result<()> {
        let id = resource.cur_id();
        if self.index.contains_key(&id) {
            return Err(Error::IdentityConflict { id: id.to_string() });
        }
        self.index.insert(id, self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Append every member of `other`, all or nothing.
    pub fn append_all(&mut self, other: ResMap) -> Result<()> {
        for id in other.index.keys() {
            if self.index.contains_key(id) {
                return Err(Error::IdentityConflict { id: id.to_string() });
            }
        }
        for resource in other.resources {
            self.append(resource)?;
        }
        Ok(())
    }

    /// Combine `resource` according to its generation behavior.
    ///
    /// With `merge` or `replace`, the resource whose current or previous
    /// identity equals the incoming one is updated in place. Any other
    /// behavior, or no such resource, appends.
    pub fn merge(&mut self, resource: Resource) -> Result<()> {
        let behavior = resource.behavior();
        if matches!(behavior, GenerationBehavior::Merge | GenerationBehavior::Replace) {
            let id = resource.cur_id();
            if let Some(idx) = self.position_by_any_id(&id) {
                let existing = &self.resources[idx];
                let merged = combine(existing, resource, behavior);
                return self.replace_at(idx, merged);
            }
            warn!(
                "no resource matches {} for behavior '{}'; appending it instead",
                id,
                behavior.as_str()
            );
        }
        self.append(resource)
    }

    /// Merge every member of `other` in order.
    pub fn merge_all(&mut self, other: ResMap) -> Result<()> {
        for resource in other.resources {
            self.merge(resource)?;
        }
        Ok(())
    }

    /// Look up a resource by current identity.
    pub fn find(&self, id: &ResId) -> Option<&Resource> {
        self.index.get(id).map(|&idx| &self.resources[idx])
    }

    /// Position of the resource whose current or any previous identity is `id`.
    pub fn position_by_any_id(&self, id: &ResId) -> Option<usize> {
        if let Some(&idx) = self.index.get(id) {
            return Some(idx);
        }
        self.resources
            .iter()
            .position(|r| r.prev_ids().iter().any(|prev| prev == id))
    }

    /// Positions of resources accepted by `pred`, in order.
    pub fn positions_where<F>(&self, mut pred: F) -> Result<Vec<usize>>
    where
        F: FnMut(&Resource) -> Result<bool>,
    {
        let mut out = Vec::new();
        for (idx, resource) in self.resources.iter().enumerate() {
            if pred(resource)? {
                out.push(idx);
            }
        }
        Ok(out)
    }

    pub fn get(&self, idx: usize) -> Option<&Resource> {
        self.resources.get(idx)
    }

    /// Replace the resource at `idx`, keeping the identity index consistent.
    pub fn replace_at(&mut self, idx: usize, resource: Resource) -> Result<()> {
        let old_id = self.resources[idx].cur_id();
        let new_id = resource.cur_id();
        if new_id != old_id && self.index.contains_key(&new_id) {
            return Err(Error::IdentityConflict {
                id: new_id.to_string(),
            });
        }
        self.index.remove(&old_id);
        self.index.insert(new_id, idx);
        self.resources[idx] = resource;
        Ok(())
    }

    /// Remove and return the resource at `idx`.
    pub fn remove_at(&mut self, idx: usize) -> Resource {
        let removed = self.resources.remove(idx);
        self.rebuild_index_unchecked();
        removed
    }

    /// Mutate every resource in order, then re-verify uniqueness.
    ///
    /// On error the collection may be partially mutated; callers treat any
    /// error here as fatal for the whole build.
    pub fn try_for_each_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Resource) -> Result<()>,
    {
        for resource in &mut self.resources {
            f(resource)?;
        }
        self.rebuild_index()
    }

    /// Swap the whole content for `resources`, checking uniqueness.
    pub fn reset(&mut self, resources: Vec<Resource>) -> Result<()> {
        let mut fresh = ResMap::new();
        for resource in resources {
            fresh.append(resource)?;
        }
        *self = fresh;
        Ok(())
    }

    fn rebuild_index(&mut self) -> Result<()> {
        let mut index = HashMap::with_capacity(self.resources.len());
        for (idx, resource) in self.resources.iter().enumerate() {
            let id = resource.cur_id();
            if index.insert(id.clone(), idx).is_some() {
                return Err(Error::IdentityConflict { id: id.to_string() });
            }
        }
        self.index = index;
        Ok(())
    }

    fn rebuild_index_unchecked(&mut self) {
        self.index = self
            .resources
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.cur_id(), idx))
            .collect();
    }

    /// Strip internal bookkeeping annotations from every member.
    pub fn remove_build_annotations(&mut self) {
        for resource in &mut self.resources {
            resource.remove_build_annotations();
        }
    }

    /// Serialize all members in order as a YAML stream.
    pub fn as_yaml(&self) -> Result<String> {
        let mut docs = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            docs.push(resource.to_yaml()?);
        }
        Ok(docs.join("---\n"))
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }
}

impl IntoIterator for ResMap {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

/// Fold an incoming `merge`/`replace` resource into an existing one.
///
/// The existing name, namespace and build annotations survive, so the
/// result keeps its rename history and is not merged again further up.
fn combine(existing: &Resource, incoming: Resource, behavior: GenerationBehavior) -> Resource {
    let mut merged = match behavior {
        GenerationBehavior::Merge => {
            let mut merged = existing.clone();
            merge_yaml_values(merged.value_mut(), incoming.value(), "");
            merged
        }
        _ => incoming,
    };
    merged.keep_identity_of(existing);
    merged
}

/// Parse a YAML stream into resources without uniqueness checks.
pub fn parse_resources(content: &[u8]) -> Result<Vec<Resource>> {
    let mut out = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(content) {
        let value = Value::deserialize(document)?;
        push_document(value, &mut out)?;
    }
    Ok(out)
}

fn push_document(value: Value, out: &mut Vec<Resource>) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    let is_list = value.get("kind").and_then(Value::as_str) == Some("List");
    if is_list {
        if let Some(Value::Sequence(items)) = value.get("items") {
            for item in items.clone() {
                push_document(item, out)?;
            }
        }
        return Ok(());
    }
    out.push(Resource::from_value(value)?);
    Ok(())
}
