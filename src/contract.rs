use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::game_log::GameRecord;

pub const CONTRACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    IsHome,
    RestDays,
    IsBackToBack,
    IsRested,
    L5Pts,
    L10Pts,
    SeasonAvgPts,
    L10PtsStd,
    RecentTrendPts,
    L5Reb,
    L10Reb,
    L10RebStd,
    RecentTrendReb,
    L5Ast,
    L10Ast,
    L10AstStd,
    RecentTrendAst,
    L5Min,
    L10Min,
    UsageRate,
    FtRate,
    PpmL5,
    PpmL10,
    L5FgPct,
    L5Fg3Pct,
    L5Fg3m,
    VsOppAvgPts,
    VsOppAvgReb,
    VsOppAvgAst,
    OppDefStrengthPts,
    OppDefStrengthReb,
    OppDefStrengthAst,
    OppPace,
    TeamPace,
    L5WinPct,
    L5PlusMinus,
}

pub const FEATURE_COUNT: usize = 36;

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::IsHome,
        Feature::RestDays,
        Feature::IsBackToBack,
        Feature::IsRested,
        Feature::L5Pts,
        Feature::L10Pts,
        Feature::SeasonAvgPts,
        Feature::L10PtsStd,
        Feature::RecentTrendPts,
        Feature::L5Reb,
        Feature::L10Reb,
        Feature::L10RebStd,
        Feature::RecentTrendReb,
        Feature::L5Ast,
        Feature::L10Ast,
        Feature::L10AstStd,
        Feature::RecentTrendAst,
        Feature::L5Min,
        Feature::L10Min,
        Feature::UsageRate,
        Feature::FtRate,
        Feature::PpmL5,
        Feature::PpmL10,
        Feature::L5FgPct,
        Feature::L5Fg3Pct,
        Feature::L5Fg3m,
        Feature::VsOppAvgPts,
        Feature::VsOppAvgReb,
        Feature::VsOppAvgAst,
        Feature::OppDefStrengthPts,
        Feature::OppDefStrengthReb,
        Feature::OppDefStrengthAst,
        Feature::OppPace,
        Feature::TeamPace,
        Feature::L5WinPct,
        Feature::L5PlusMinus,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::IsHome => "IS_HOME",
            Feature::RestDays => "REST_DAYS",
            Feature::IsBackToBack => "IS_BACK_TO_BACK",
            Feature::IsRested => "IS_RESTED",
            Feature::L5Pts => "L5_PTS",
            Feature::L10Pts => "L10_PTS",
            Feature::SeasonAvgPts => "SEASON_AVG_PTS",
            Feature::L10PtsStd => "L10_PTS_STD",
            Feature::RecentTrendPts => "RECENT_TREND_PTS",
            Feature::L5Reb => "L5_REB",
            Feature::L10Reb => "L10_REB",
            Feature::L10RebStd => "L10_REB_STD",
            Feature::RecentTrendReb => "RECENT_TREND_REB",
            Feature::L5Ast => "L5_AST",
            Feature::L10Ast => "L10_AST",
            Feature::L10AstStd => "L10_AST_STD",
            Feature::RecentTrendAst => "RECENT_TREND_AST",
            Feature::L5Min => "L5_MIN",
            Feature::L10Min => "L10_MIN",
            Feature::UsageRate => "USAGE_RATE",
            Feature::FtRate => "FT_RATE",
            Feature::PpmL5 => "PPM_L5",
            Feature::PpmL10 => "PPM_L10",
            Feature::L5FgPct => "L5_FG_PCT",
            Feature::L5Fg3Pct => "L5_FG3_PCT",
            Feature::L5Fg3m => "L5_FG3M",
            Feature::VsOppAvgPts => "VS_OPP_AVG_PTS",
            Feature::VsOppAvgReb => "VS_OPP_AVG_REB",
            Feature::VsOppAvgAst => "VS_OPP_AVG_AST",
            Feature::OppDefStrengthPts => "OPP_DEF_STRENGTH_PTS",
            Feature::OppDefStrengthReb => "OPP_DEF_STRENGTH_REB",
            Feature::OppDefStrengthAst => "OPP_DEF_STRENGTH_AST",
            Feature::OppPace => "OPP_PACE",
            Feature::TeamPace => "TEAM_PACE",
            Feature::L5WinPct => "L5_WIN_PCT",
            Feature::L5PlusMinus => "L5_PLUS_MINUS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    #[serde(rename = "PTS")]
    Points,
    #[serde(rename = "REB")]
    Rebounds,
    #[serde(rename = "AST")]
    Assists,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Points, Target::Rebounds, Target::Assists];

    pub fn column(self) -> &'static str {
        match self {
            Target::Points => "PTS",
            Target::Rebounds => "REB",
            Target::Assists => "AST",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Target::Points => "Points",
            Target::Rebounds => "Rebounds",
            Target::Assists => "Assists",
        }
    }

    pub fn actual(self, game: &GameRecord) -> f64 {
        match self {
            Target::Points => game.points,
            Target::Rebounds => game.rebounds,
            Target::Assists => game.assists,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureContract {
    pub target: Target,
    pub version: u32,
    pub features: &'static [Feature],
}

impl FeatureContract {
    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    pub fn position(&self, feature: Feature) -> Option<usize> {
        self.features.iter().position(|f| *f == feature)
    }
}

const POINTS_FEATURES: [Feature; 26] = [
    Feature::L5Pts,
    Feature::L10Pts,
    Feature::SeasonAvgPts,
    Feature::L10PtsStd,
    Feature::RecentTrendPts,
    Feature::IsHome,
    Feature::RestDays,
    Feature::IsBackToBack,
    Feature::IsRested,
    Feature::L5Min,
    Feature::L10Min,
    Feature::UsageRate,
    Feature::FtRate,
    Feature::PpmL5,
    Feature::PpmL10,
    Feature::L5FgPct,
    Feature::L5Fg3Pct,
    Feature::L5Fg3m,
    Feature::L5Reb,
    Feature::L5Ast,
    Feature::VsOppAvgPts,
    Feature::OppDefStrengthPts,
    Feature::OppPace,
    Feature::TeamPace,
    Feature::L5WinPct,
    Feature::L5PlusMinus,
];

const REBOUNDS_FEATURES: [Feature; 19] = [
    Feature::L5Reb,
    Feature::L10Reb,
    Feature::L10RebStd,
    Feature::RecentTrendReb,
    Feature::IsHome,
    Feature::RestDays,
    Feature::IsBackToBack,
    Feature::IsRested,
    Feature::L5Min,
    Feature::L10Min,
    Feature::UsageRate,
    Feature::L5Pts,
    Feature::L5Ast,
    Feature::VsOppAvgReb,
    Feature::OppDefStrengthReb,
    Feature::OppPace,
    Feature::TeamPace,
    Feature::L5WinPct,
    Feature::L5PlusMinus,
];

const ASSISTS_FEATURES: [Feature; 19] = [
    Feature::L5Ast,
    Feature::L10Ast,
    Feature::L10AstStd,
    Feature::RecentTrendAst,
    Feature::IsHome,
    Feature::RestDays,
    Feature::IsBackToBack,
    Feature::IsRested,
    Feature::L5Min,
    Feature::L10Min,
    Feature::UsageRate,
    Feature::L5Pts,
    Feature::L5Reb,
    Feature::VsOppAvgAst,
    Feature::OppDefStrengthAst,
    Feature::OppPace,
    Feature::TeamPace,
    Feature::L5WinPct,
    Feature::L5PlusMinus,
];

/// Single source of truth for the per-target feature lists. Batch export
/// and realtime subsetting both read from here.
#[derive(Debug)]
pub struct FeatureRegistry {
    pub version: u32,
    points: FeatureContract,
    rebounds: FeatureContract,
    assists: FeatureContract,
}

pub static REGISTRY: FeatureRegistry = FeatureRegistry {
    version: CONTRACT_VERSION,
    points: FeatureContract {
        target: Target::Points,
        version: CONTRACT_VERSION,
        features: &POINTS_FEATURES,
    },
    rebounds: FeatureContract {
        target: Target::Rebounds,
        version: CONTRACT_VERSION,
        features: &REBOUNDS_FEATURES,
    },
    assists: FeatureContract {
        target: Target::Assists,
        version: CONTRACT_VERSION,
        features: &ASSISTS_FEATURES,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractManifest {
    pub version: u32,
    pub targets: Vec<TargetManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetManifest {
    pub target: Target,
    pub features: Vec<String>,
}

impl FeatureRegistry {
    pub fn contract(&self, target: Target) -> &FeatureContract {
        match target {
            Target::Points => &self.points,
            Target::Rebounds => &self.rebounds,
            Target::Assists => &self.assists,
        }
    }

    pub fn contracts(&self) -> [&FeatureContract; 3] {
        [&self.points, &self.rebounds, &self.assists]
    }

    pub fn union(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.contracts().iter().any(|c| c.features.contains(f)))
            .collect()
    }

    pub fn manifest(&self) -> ContractManifest {
        ContractManifest {
            version: self.version,
            targets: self
                .contracts()
                .iter()
                .map(|c| TargetManifest {
                    target: c.target,
                    features: c.names().into_iter().map(str::to_string).collect(),
                })
                .collect(),
        }
    }

    pub fn verify_manifest(&self, manifest: &ContractManifest) -> Result<()> {
        if manifest.version != self.version {
            return Err(anyhow!(
                "contract version mismatch: manifest v{}, registry v{}",
                manifest.version,
                self.version
            ));
        }
        for target in Target::ALL {
            let listed = manifest
                .targets
                .iter()
                .filter(|entry| entry.target == target)
                .count();
            if listed != 1 {
                return Err(anyhow!(
                    "manifest lists {} {listed} times, expected once",
                    target.column()
                ));
            }
        }
        for entry in &manifest.targets {
            let expected = self.contract(entry.target).names();
            if entry.features != expected {
                return Err(anyhow!(
                    "feature list drift for {}: manifest has {} features, registry {}",
                    entry.target.column(),
                    entry.features.len(),
                    expected.len()
                ));
            }
        }
        Ok(())
    }

    pub fn write_manifest(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let json = serde_json::to_string_pretty(&self.manifest()).context("serialize manifest")?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn read_manifest(path: &Path) -> Result<ContractManifest> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).context("invalid contract manifest json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_indices_follow_declaration_order() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(Feature::from_name(feature.name()), Some(*feature));
        }
    }

    #[test]
    fn contract_lengths_and_union() {
        assert_eq!(REGISTRY.contract(Target::Points).features.len(), 26);
        assert_eq!(REGISTRY.contract(Target::Rebounds).features.len(), 19);
        assert_eq!(REGISTRY.contract(Target::Assists).features.len(), 19);
        assert_eq!(REGISTRY.union().len(), FEATURE_COUNT);
    }

    #[test]
    fn manifest_detects_drift() {
        let mut manifest = REGISTRY.manifest();
        assert!(REGISTRY.verify_manifest(&manifest).is_ok());

        manifest.targets[1].features.pop();
        assert!(REGISTRY.verify_manifest(&manifest).is_err());
    }

    #[test]
    fn manifest_needs_each_target_once() {
        let mut missing = REGISTRY.manifest();
        missing.targets.remove(2);
        assert!(REGISTRY.verify_manifest(&missing).is_err());

        let mut empty = REGISTRY.manifest();
        empty.targets.clear();
        assert!(REGISTRY.verify_manifest(&empty).is_err());

        let mut doubled = REGISTRY.manifest();
        let again = doubled.targets[0].clone();
        doubled.targets.push(again);
        assert!(REGISTRY.verify_manifest(&doubled).is_err());
    }
}
