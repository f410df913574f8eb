//! The build pipeline, split by stage.
//!
//! ## Overview
//!
//! Building a root runs in three stages:
//! 1. Accumulation - Load resources, bases, components and generator output
//!    into one collection, and resolve the transformer configuration
//! 2. Transformation - Apply the root's own transformers in a fixed order
//! 3. Finalization - Hash generated names and fix up name references
//!
//! Bases run stages 1 and 2 for themselves before their output is absorbed
//! by the parent. Stage 3 only runs once, on the outermost root.

use crate::error::Result;
use crate::resmap::ResMap;
use crate::tconfig::TransformerConfig;

pub mod accumulate;
pub mod finalize;
pub mod transform;

/// Resources and field-path rules gathered for one root
#[derive(Debug, Clone, Default)]
pub struct ResAccumulator {
    pub resmap: ResMap,
    pub tconfig: TransformerConfig,
}

impl ResAccumulator {
    /// An empty collection with the default transformer configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over a fully built base: its resources are appended (all or
    /// nothing) and its rules unioned into ours.
    pub fn absorb(&mut self, base: ResAccumulator) -> Result<()> {
        self.resmap.append_all(base.resmap)?;
        self.tconfig.union(&base.tconfig);
        Ok(())
    }
}
