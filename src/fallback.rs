use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::contract::Feature;
use crate::feature_set::FeatureSet;

pub const CRITICAL_FEATURES: [Feature; 4] = [
    Feature::L10Pts,
    Feature::L10Min,
    Feature::RestDays,
    Feature::OppDefStrengthPts,
];

const OPPONENT_CONTEXT: [Feature; 4] = [
    Feature::OppDefStrengthPts,
    Feature::OppDefStrengthReb,
    Feature::OppDefStrengthAst,
    Feature::OppPace,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueAverages {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub pace: f64,
}

impl Default for LeagueAverages {
    fn default() -> Self {
        Self {
            points: 15.0,
            rebounds: 5.5,
            assists: 3.5,
            pace: 12.0,
        }
    }
}

impl LeagueAverages {
    /// Realtime fallback for the league-context features. These constants
    /// are not what the batch table holds for a real opponent, so served
    /// vectors carry a known approximation on these five columns.
    pub fn fill_context(&self, set: &mut FeatureSet) {
        set.fill(Feature::OppDefStrengthPts, Some(self.points));
        set.fill(Feature::OppDefStrengthReb, Some(self.rebounds));
        set.fill(Feature::OppDefStrengthAst, Some(self.assists));
        set.fill(Feature::OppPace, Some(self.pace));
        set.fill(Feature::TeamPace, Some(self.pace));
    }
}

pub fn fill_matchup(set: &mut FeatureSet) {
    set.fill(Feature::VsOppAvgPts, set.get(Feature::SeasonAvgPts));
    set.fill(Feature::VsOppAvgReb, set.get(Feature::L10Reb));
    set.fill(Feature::VsOppAvgAst, set.get(Feature::L10Ast));
}

pub fn missing_critical(set: &FeatureSet) -> Option<Feature> {
    CRITICAL_FEATURES.into_iter().find(|f| !set.is_defined(*f))
}

#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextMeans {
    by_opponent: BTreeMap<String, [RunningMean; 4]>,
    by_team: BTreeMap<String, RunningMean>,
}

impl ContextMeans {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str, &'a FeatureSet)>) -> Self {
        let mut out = Self::default();
        for (opponent, team, set) in rows {
            let slot = out.by_opponent.entry(opponent.to_string()).or_default();
            for (mean, feature) in slot.iter_mut().zip(OPPONENT_CONTEXT) {
                mean.push(set.get(feature));
            }
            out.by_team
                .entry(team.to_string())
                .or_default()
                .push(set.get(Feature::TeamPace));
        }
        out
    }

    pub fn opponent_mean(&self, opponent: &str, feature: Feature) -> Option<f64> {
        let idx = OPPONENT_CONTEXT.iter().position(|f| *f == feature)?;
        self.by_opponent.get(opponent)?[idx].mean()
    }

    pub fn team_pace(&self, team: &str) -> Option<f64> {
        self.by_team.get(team)?.mean()
    }

    pub fn fill(&self, opponent: &str, team: &str, set: &mut FeatureSet) {
        for feature in OPPONENT_CONTEXT {
            set.fill(feature, self.opponent_mean(opponent, feature));
        }
        set.fill(Feature::TeamPace, self.team_pace(team));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matchup_falls_back_to_player_baseline() {
        let mut set = FeatureSet::default();
        set.set(Feature::SeasonAvgPts, Some(21.5));
        set.set(Feature::L10Reb, Some(6.0));
        set.set(Feature::VsOppAvgAst, Some(9.0));
        set.set(Feature::L10Ast, Some(4.0));
        fill_matchup(&mut set);
        assert_eq!(set.get(Feature::VsOppAvgPts), Some(21.5));
        assert_eq!(set.get(Feature::VsOppAvgReb), Some(6.0));
        assert_eq!(set.get(Feature::VsOppAvgAst), Some(9.0));
    }

    #[test]
    fn context_means_fill_only_gaps() {
        let mut a = FeatureSet::default();
        a.set(Feature::OppDefStrengthPts, Some(10.0));
        a.set(Feature::TeamPace, Some(8.0));
        let mut b = FeatureSet::default();
        b.set(Feature::OppDefStrengthPts, Some(14.0));
        let c = FeatureSet::default();

        let means = ContextMeans::from_rows([
            ("BOS", "NYK", &a),
            ("BOS", "NYK", &b),
            ("MIA", "NYK", &c),
        ]);
        assert_eq!(means.opponent_mean("BOS", Feature::OppDefStrengthPts), Some(12.0));
        assert_eq!(means.opponent_mean("BOS", Feature::OppPace), None);
        assert_eq!(means.opponent_mean("MIA", Feature::OppDefStrengthPts), None);

        let mut target = c;
        means.fill("BOS", "NYK", &mut target);
        assert_eq!(target.get(Feature::OppDefStrengthPts), Some(12.0));
        assert_eq!(target.get(Feature::TeamPace), Some(8.0));
        assert_eq!(missing_critical(&target), Some(Feature::L10Pts));
    }

    #[test]
    fn league_constants_cover_all_context_columns() {
        let mut set = FeatureSet::default();
        LeagueAverages::default().fill_context(&mut set);
        assert_eq!(set.get(Feature::OppDefStrengthPts), Some(15.0));
        assert_eq!(set.get(Feature::OppDefStrengthReb), Some(5.5));
        assert_eq!(set.get(Feature::OppDefStrengthAst), Some(3.5));
        assert_eq!(set.get(Feature::OppPace), Some(12.0));
        assert_eq!(set.get(Feature::TeamPace), Some(12.0));
    }
}
