use serde::Serialize;
use serde::ser::SerializeMap;

use crate::contract::{FEATURE_COUNT, Feature, FeatureContract, Target};

/// Every feature value for one (player, as-of game) pair. `None` means the
/// feature is undefined, which is never the same thing as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSet {
    values: [Option<f64>; FEATURE_COUNT],
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            values: [None; FEATURE_COUNT],
        }
    }
}

impl FeatureSet {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        self.values[feature.index()] = value.filter(|v| v.is_finite());
    }

    pub fn fill(&mut self, feature: Feature, fallback: Option<f64>) {
        if self.get(feature).is_none() {
            self.set(feature, fallback);
        }
    }

    pub fn is_defined(&self, feature: Feature) -> bool {
        self.get(feature).is_some()
    }

    pub fn select(&self, contract: &FeatureContract) -> TargetVector {
        TargetVector {
            target: contract.target,
            version: contract.version,
            features: contract.features,
            values: contract.features.iter().map(|f| self.get(*f)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetVector {
    target: Target,
    version: u32,
    features: &'static [Feature],
    values: Vec<Option<f64>>,
}

impl TargetVector {
    pub fn target(&self) -> Target {
        self.target
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn features(&self) -> &'static [Feature] {
        self.features
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        let idx = self.features.iter().position(|f| *f == feature)?;
        self.values[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, Option<f64>)> + '_ {
        self.features.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for TargetVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::REGISTRY;

    #[test]
    fn select_follows_contract_order_and_keeps_gaps() {
        let mut set = FeatureSet::default();
        set.set(Feature::L5Reb, Some(7.0));
        set.set(Feature::IsHome, Some(0.0));
        set.set(Feature::L10Reb, Some(f64::NAN));

        let v = set.select(REGISTRY.contract(Target::Rebounds));
        assert_eq!(v.len(), 19);
        assert_eq!(v.values()[0], Some(7.0));
        assert_eq!(v.values()[1], None);
        assert_eq!(v.get(Feature::IsHome), Some(0.0));
        assert_eq!(v.get(Feature::L5Pts), None);
        assert_eq!(v.get(Feature::VsOppAvgPts), None);
    }

    #[test]
    fn fill_only_touches_undefined_values() {
        let mut set = FeatureSet::default();
        set.set(Feature::VsOppAvgPts, Some(0.0));
        set.fill(Feature::VsOppAvgPts, Some(12.0));
        set.fill(Feature::VsOppAvgReb, Some(4.0));
        assert_eq!(set.get(Feature::VsOppAvgPts), Some(0.0));
        assert_eq!(set.get(Feature::VsOppAvgReb), Some(4.0));
    }
}
