//! Resources requested stages need from upstream.

use crate::core::{ResourceReference, StageId};
use std::collections::{BTreeMap, BTreeSet};

/// The resources each requested stage's descriptors reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorDemand {
    by_stage: BTreeMap<StageId, BTreeSet<ResourceReference>>,
}

impl DescriptorDemand {
    /// Creates an empty demand table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records resources a stage needs.
    pub fn insert(&mut self, stage: StageId, resources: impl IntoIterator<Item = ResourceReference>) {
        self.by_stage.entry(stage).or_default().extend(resources);
    }

    /// Adds resources and returns self.
    #[must_use]
    pub fn with(mut self, stage: impl Into<StageId>, resources: impl IntoIterator<Item = ResourceReference>) -> Self {
        self.insert(stage.into(), resources);
        self
    }

    /// Returns what a stage needs.
    #[must_use]
    pub fn of(&self, stage: &StageId) -> Option<&BTreeSet<ResourceReference>> {
        self.by_stage.get(stage)
    }

    /// Returns true if no stage needs anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_stage.values().all(BTreeSet::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_merges_per_stage() {
        let demand = DescriptorDemand::new()
            .with("agents", [ResourceReference::connection("a")])
            .with("agents", [ResourceReference::connection("b")]);

        assert_eq!(demand.of(&StageId::from("agents")).unwrap().len(), 2);
        assert!(demand.of(&StageId::from("connections")).is_none());
        assert!(!demand.is_empty());
        assert!(DescriptorDemand::new().is_empty());
    }
}
