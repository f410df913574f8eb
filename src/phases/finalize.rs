//! Stage 3: Finalization
//!
//! Runs once on the outermost root, after every transformer: generated
//! resources receive their content-hash name suffix, then references to
//! any renamed resource are rewritten to the final names.

use super::ResAccumulator;
use crate::error::Result;
use crate::plugins::{HashSuffixTransformer, NameReferenceTransformer, Transformer};
use log::debug;

pub fn execute(acc: &mut ResAccumulator) -> Result<()> {
    debug!("finalizing {} resources", acc.resmap.len());
    HashSuffixTransformer.transform(&mut acc.resmap)?;
    NameReferenceTransformer {
        back_refs: acc.tconfig.name_reference.clone(),
    }
    .transform(&mut acc.resmap)
}
