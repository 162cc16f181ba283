use primforge_common::PrimPath;
use primforge_stage::SceneDescription;

use crate::dirty::DirtyBits;

/// Per-instance record of which output categories vary over time.
///
/// Created when a prim is populated, OR-accumulated as contributing
/// attributes are checked, never cleared, and dropped with the instance. The
/// owner keys it by prim path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariabilityState {
    varying: DirtyBits,
}

impl VariabilityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Categories known to vary.
    pub fn bits(&self) -> DirtyBits {
        self.varying
    }

    pub fn is_varying(&self, category: DirtyBits) -> bool {
        self.varying.contains(category)
    }

    /// Flag a category as varying without consulting the stage.
    pub fn mark_varying(&mut self, category: DirtyBits) {
        self.varying |= category;
    }

    /// Check one contributing attribute and flag `category` if it varies.
    ///
    /// Once a category is flagged, later calls for it return immediately
    /// without querying the stage. Callers invoke this once per contributing
    /// attribute and rely on that short-circuit to bound the number of stage
    /// queries; it is part of the contract, not an incidental optimization.
    ///
    /// Returns whether the category is varying after the call.
    pub fn check_and_mark_varying(
        &mut self,
        stage: &dyn SceneDescription,
        path: &PrimPath,
        attribute: &str,
        category: DirtyBits,
    ) -> bool {
        if self.is_varying(category) {
            return true;
        }
        if stage.is_attribute_time_varying(path, attribute) {
            tracing::trace!(prim = %path, attribute, ?category, "marking varying");
            self.varying |= category;
        }
        self.is_varying(category)
    }
}
