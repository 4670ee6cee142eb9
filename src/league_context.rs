use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::contract::Feature;
use crate::feature_set::FeatureSet;
use crate::game_log::GameRecord;
use crate::window::{self, RollingSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindowConfig {
    pub defense: RollingSpec,
    pub pace: RollingSpec,
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self {
            defense: RollingSpec::new(30, 5),
            pace: RollingSpec::new(20, 5),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContextFeatures {
    pub opp_def_pts: Option<f64>,
    pub opp_def_reb: Option<f64>,
    pub opp_def_ast: Option<f64>,
    pub opp_pace: Option<f64>,
    pub team_pace: Option<f64>,
}

impl ContextFeatures {
    pub fn apply(&self, set: &mut FeatureSet) {
        set.set(Feature::OppDefStrengthPts, self.opp_def_pts);
        set.set(Feature::OppDefStrengthReb, self.opp_def_reb);
        set.set(Feature::OppDefStrengthAst, self.opp_def_ast);
        set.set(Feature::OppPace, self.opp_pace);
        set.set(Feature::TeamPace, self.team_pace);
    }
}

/// Opponent and team rolling profiles for every row of `games`.
///
/// Rows are regrouped by opponent (then by team) and ordered by date. A
/// row's window only holds rows from strictly earlier dates, so box scores
/// from the same game, including teammates', never leak into it. The
/// returned vector is aligned with the input order.
pub fn context_features(games: &[GameRecord], cfg: &ContextWindowConfig) -> Vec<ContextFeatures> {
    let mut out = vec![ContextFeatures::default(); games.len()];

    let by_opponent = ordered_by(games, opponent_key);
    let pts = profile(games, &by_opponent, opponent_key, points, cfg.defense);
    let reb = profile(games, &by_opponent, opponent_key, rebounds, cfg.defense);
    let ast = profile(games, &by_opponent, opponent_key, assists, cfg.defense);
    let opp_pace = profile(games, &by_opponent, opponent_key, shot_attempts, cfg.pace);

    let by_team = ordered_by(games, team_key);
    let team_pace = profile(games, &by_team, team_key, shot_attempts, cfg.pace);

    for (i, row) in out.iter_mut().enumerate() {
        *row = ContextFeatures {
            opp_def_pts: pts[i],
            opp_def_reb: reb[i],
            opp_def_ast: ast[i],
            opp_pace: opp_pace[i],
            team_pace: team_pace[i],
        };
    }
    out
}

fn opponent_key(g: &GameRecord) -> &str {
    &g.opponent
}

fn team_key(g: &GameRecord) -> &str {
    &g.team
}

fn points(g: &GameRecord) -> Option<f64> {
    Some(g.points)
}

fn rebounds(g: &GameRecord) -> Option<f64> {
    Some(g.rebounds)
}

fn assists(g: &GameRecord) -> Option<f64> {
    Some(g.assists)
}

fn shot_attempts(g: &GameRecord) -> Option<f64> {
    g.fga
}

fn ordered_by<'a>(
    games: &'a [GameRecord],
    group: impl Fn(&'a GameRecord) -> &'a str,
) -> Vec<usize> {
    let keys: Vec<(&str, NaiveDate, u64, &str)> = games
        .iter()
        .map(|g| (group(g), g.game_date, g.player_id, g.game_id.as_str()))
        .collect();
    window::sorted_positions(&keys)
}

fn profile<'a>(
    games: &'a [GameRecord],
    order: &[usize],
    group: impl Fn(&'a GameRecord) -> &'a str,
    value: impl Fn(&GameRecord) -> Option<f64>,
    spec: RollingSpec,
) -> Vec<Option<f64>> {
    let mut out = vec![None; games.len()];
    for run in window::group_runs(order, |i| group(&games[i])) {
        let positions = &order[run];
        let series: Vec<Option<f64>> = positions.iter().map(|&i| value(&games[i])).collect();

        let mut block_start = 0usize;
        while block_start < positions.len() {
            let date = games[positions[block_start]].game_date;
            let block_end = positions[block_start..]
                .iter()
                .position(|&i| games[i].game_date != date)
                .map(|off| block_start + off)
                .unwrap_or(positions.len());
            let stat = window::window_mean(&series[..block_start], spec);
            for &i in &positions[block_start..block_end] {
                out[i] = stat;
            }
            block_start = block_end;
        }
    }
    out
}
