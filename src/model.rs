use anyhow::{Result, anyhow};

use crate::contract::{CONTRACT_VERSION, Feature, Target};
use crate::feature_set::TargetVector;

/// A trained model for one target. Implementations live with the model
/// library; this crate only guarantees that what it hands over matches the
/// contract the model was trained on.
pub trait PropModel: Send + Sync {
    fn target(&self) -> Target;

    fn contract_version(&self) -> u32 {
        CONTRACT_VERSION
    }

    fn predict_vector(&self, vector: &TargetVector) -> Option<f64>;

    fn predict(&self, vector: &TargetVector) -> Result<Option<f64>> {
        if vector.target() != self.target() {
            return Err(anyhow!(
                "{} model given a {} vector",
                self.target().column(),
                vector.target().column()
            ));
        }
        if vector.version() != self.contract_version() {
            return Err(anyhow!(
                "contract v{} vector for a v{} model",
                vector.version(),
                self.contract_version()
            ));
        }
        Ok(self.predict_vector(vector))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrailingMeanModel {
    target: Target,
}

impl TrailingMeanModel {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    fn windows(&self) -> (Feature, Feature) {
        match self.target {
            Target::Points => (Feature::L10Pts, Feature::L5Pts),
            Target::Rebounds => (Feature::L10Reb, Feature::L5Reb),
            Target::Assists => (Feature::L10Ast, Feature::L5Ast),
        }
    }
}

impl PropModel for TrailingMeanModel {
    fn target(&self) -> Target {
        self.target
    }

    fn predict_vector(&self, vector: &TargetVector) -> Option<f64> {
        let (long, short) = self.windows();
        vector.get(long).or_else(|| vector.get(short))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::REGISTRY;
    use crate::feature_set::FeatureSet;

    #[test]
    fn baseline_falls_back_to_short_window() {
        let mut set = FeatureSet::default();
        set.set(Feature::L5Reb, Some(8.0));
        let vector = set.select(REGISTRY.contract(Target::Rebounds));
        let model = TrailingMeanModel::new(Target::Rebounds);
        assert_eq!(model.predict(&vector).unwrap(), Some(8.0));

        set.set(Feature::L10Reb, Some(7.5));
        let vector = set.select(REGISTRY.contract(Target::Rebounds));
        assert_eq!(model.predict(&vector).unwrap(), Some(7.5));
    }

    #[test]
    fn wrong_target_vector_is_rejected() {
        let vector = FeatureSet::default().select(REGISTRY.contract(Target::Points));
        let model = TrailingMeanModel::new(Target::Assists);
        assert!(model.predict(&vector).is_err());
    }
}
