//! Support probing
//!
//! A family is usable only when every one of its nodes exists. The check is
//! repeated at every activation point and never cached.

use hwtune_hal::NodeIo;
use std::path::Path;

use crate::ControlFamily;

/// Existence check gating a family
#[derive(Clone, Copy)]
pub struct SupportProbe<'a> {
    nodes: &'a dyn NodeIo,
}

impl<'a> SupportProbe<'a> {
    pub fn new(nodes: &'a dyn NodeIo) -> Self {
        Self { nodes }
    }

    /// True iff the family has at least one control and every one of its
    /// nodes is present.
    ///
    /// A family with no controls is reported unsupported rather than
    /// vacuously supported; catalog validation already rejects such
    /// families, so this only matters for hand-built ones.
    pub fn is_supported(&self, family: &ControlFamily) -> bool {
        if family.controls.is_empty() {
            tracing::debug!("Family {} has no controls", family.id);
            return false;
        }
        let missing = self.missing(family);
        if !missing.is_empty() {
            tracing::debug!(
                "Family {} unsupported, missing {} of {} nodes: {:?}",
                family.id,
                missing.len(),
                family.controls.len(),
                missing
            );
            return false;
        }
        true
    }

    /// Member nodes that do not exist right now
    pub fn missing<'f>(&self, family: &'f ControlFamily) -> Vec<&'f Path> {
        family
            .paths()
            .filter(|path| !self.nodes.exists(path))
            .collect()
    }
}
