use crate::contract::Feature;
use crate::feature_set::FeatureSet;
use crate::game_log::GameRecord;
use crate::window;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchupAverages {
    pub points: Option<f64>,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
}

impl MatchupAverages {
    pub fn apply(&self, set: &mut FeatureSet) {
        set.set(Feature::VsOppAvgPts, self.points);
        set.set(Feature::VsOppAvgReb, self.rebounds);
        set.set(Feature::VsOppAvgAst, self.assists);
    }
}

pub fn timeline_matchups(games: &[GameRecord]) -> Vec<MatchupAverages> {
    let mut out = vec![MatchupAverages::default(); games.len()];
    let opponents: Vec<&str> = games.iter().map(|g| g.opponent.as_str()).collect();
    let order = window::sorted_positions(&opponents);

    for run in window::group_runs(&order, |i| opponents[i]) {
        let positions = &order[run];
        let pts: Vec<Option<f64>> = positions.iter().map(|&i| Some(games[i].points)).collect();
        let reb: Vec<Option<f64>> = positions.iter().map(|&i| Some(games[i].rebounds)).collect();
        let ast: Vec<Option<f64>> = positions.iter().map(|&i| Some(games[i].assists)).collect();
        let pts = window::prior_expanding_mean(&pts);
        let reb = window::prior_expanding_mean(&reb);
        let ast = window::prior_expanding_mean(&ast);
        for (k, &i) in positions.iter().enumerate() {
            out[i] = MatchupAverages {
                points: pts[k],
                rebounds: reb[k],
                assists: ast[k],
            };
        }
    }
    out
}

pub fn next_game_matchup(history: &[GameRecord], opponent: &str) -> MatchupAverages {
    let against: Vec<&GameRecord> = history.iter().filter(|g| g.opponent == opponent).collect();
    let column = |f: fn(&GameRecord) -> f64| -> Vec<Option<f64>> {
        against.iter().map(|g| Some(f(g))).collect()
    };
    MatchupAverages {
        points: window::expanding_mean(&column(|g| g.points)),
        rebounds: window::expanding_mean(&column(|g| g.rebounds)),
        assists: window::expanding_mean(&column(|g| g.assists)),
    }
}
