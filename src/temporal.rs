use serde::{Deserialize, Serialize};

use crate::contract::Feature;
use crate::feature_set::FeatureSet;
use crate::game_log::GameRecord;
use crate::validity::clip_rest_days;
use crate::window::{self, RollingSpec};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub short: RollingSpec,
    pub long: RollingSpec,
    pub ratio_offset: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            short: RollingSpec::new(5, 3),
            long: RollingSpec::new(10, 5),
            ratio_offset: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerSeries {
    pub points: Vec<Option<f64>>,
    pub rebounds: Vec<Option<f64>>,
    pub assists: Vec<Option<f64>>,
    pub minutes: Vec<Option<f64>>,
    pub fga: Vec<Option<f64>>,
    pub fta: Vec<Option<f64>>,
    pub fg_pct: Vec<Option<f64>>,
    pub fg3_pct: Vec<Option<f64>>,
    pub fg3m: Vec<Option<f64>>,
    pub wins: Vec<Option<f64>>,
    pub plus_minus: Vec<Option<f64>>,
}

impl PlayerSeries {
    pub fn from_games(games: &[GameRecord]) -> Self {
        let mut s = Self::default();
        for g in games {
            s.points.push(Some(g.points));
            s.rebounds.push(Some(g.rebounds));
            s.assists.push(Some(g.assists));
            s.minutes.push(Some(g.minutes));
            s.fga.push(g.fga);
            s.fta.push(g.fta);
            s.fg_pct.push(g.fg_pct);
            s.fg3_pct.push(g.fg3_pct);
            s.fg3m.push(g.fg3m);
            s.wins.push(g.win_indicator());
            s.plus_minus.push(g.plus_minus);
        }
        s
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Player-scoped rolling and expanding features for slots `0..=games.len()`.
/// Slot `i` only sees `games[..i]`; the last slot describes the next,
/// unplayed game.
pub fn timeline_features(games: &[GameRecord], cfg: &WindowConfig) -> Vec<FeatureSet> {
    let series = PlayerSeries::from_games(games);
    let season_pts = window::prior_expanding_mean(&series.points);
    (0..=series.len())
        .map(|i| features_before(&series, i, season_pts[i], cfg))
        .collect()
}

pub fn next_game_features(history: &[GameRecord], cfg: &WindowConfig) -> FeatureSet {
    timeline_features(history, cfg)
        .pop()
        .unwrap_or_default()
}

pub fn apply_game_context(set: &mut FeatureSet, is_home: bool, rest_days: Option<i64>) {
    set.set(Feature::IsHome, Some(flag(is_home)));
    let rest = rest_days.map(clip_rest_days);
    set.set(Feature::RestDays, rest.map(|r| r as f64));
    set.set(Feature::IsBackToBack, rest.map(|r| flag(r == 0)));
    set.set(Feature::IsRested, rest.map(|r| flag(r >= 2)));
}

fn features_before(
    s: &PlayerSeries,
    i: usize,
    season_avg_pts: Option<f64>,
    cfg: &WindowConfig,
) -> FeatureSet {
    let short = |v: &[Option<f64>]| window::window_mean(&v[..i], cfg.short);
    let long = |v: &[Option<f64>]| window::window_mean(&v[..i], cfg.long);
    let long_std = |v: &[Option<f64>]| window::window_std(&v[..i], cfg.long);

    let mut out = FeatureSet::default();

    let l5_pts = short(&s.points);
    let l10_pts = long(&s.points);
    out.set(Feature::L5Pts, l5_pts);
    out.set(Feature::L10Pts, l10_pts);
    out.set(Feature::SeasonAvgPts, season_avg_pts);
    out.set(Feature::L10PtsStd, long_std(&s.points));
    out.set(Feature::RecentTrendPts, window::difference(l5_pts, l10_pts));

    let l5_reb = short(&s.rebounds);
    let l10_reb = long(&s.rebounds);
    out.set(Feature::L5Reb, l5_reb);
    out.set(Feature::L10Reb, l10_reb);
    out.set(Feature::L10RebStd, long_std(&s.rebounds));
    out.set(Feature::RecentTrendReb, window::difference(l5_reb, l10_reb));

    let l5_ast = short(&s.assists);
    let l10_ast = long(&s.assists);
    out.set(Feature::L5Ast, l5_ast);
    out.set(Feature::L10Ast, l10_ast);
    out.set(Feature::L10AstStd, long_std(&s.assists));
    out.set(Feature::RecentTrendAst, window::difference(l5_ast, l10_ast));

    let l5_min = short(&s.minutes);
    let l10_min = long(&s.minutes);
    let l5_fga = short(&s.fga);
    let l5_fta = short(&s.fta);
    out.set(Feature::L5Min, l5_min);
    out.set(Feature::L10Min, l10_min);
    out.set(
        Feature::UsageRate,
        window::offset_ratio(l5_fga, l5_min, cfg.ratio_offset),
    );
    out.set(
        Feature::FtRate,
        window::offset_ratio(l5_fta, l5_min, cfg.ratio_offset),
    );
    out.set(
        Feature::PpmL5,
        window::offset_ratio(l5_pts, l5_min, cfg.ratio_offset),
    );
    out.set(
        Feature::PpmL10,
        window::offset_ratio(l10_pts, l10_min, cfg.ratio_offset),
    );

    out.set(Feature::L5FgPct, short(&s.fg_pct));
    out.set(Feature::L5Fg3Pct, short(&s.fg3_pct));
    out.set(Feature::L5Fg3m, short(&s.fg3m));

    out.set(Feature::L5WinPct, short(&s.wins));
    out.set(Feature::L5PlusMinus, short(&s.plus_minus));
    out
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
