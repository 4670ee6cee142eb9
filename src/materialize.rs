use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::info;

use crate::contract::{Feature, REGISTRY, Target};
use crate::fallback::{self, ContextMeans};
use crate::feature_set::{FeatureSet, TargetVector};
use crate::game_log::{self, GameRecord, RawGameLog};
use crate::league_context::{self, ContextWindowConfig};
use crate::matchup;
use crate::record_store::GameRecordStore;
use crate::temporal::{self, WindowConfig};
use crate::validity;

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializeConfig {
    pub windows: WindowConfig,
    pub context: ContextWindowConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub game_date: NaiveDate,
    pub player_id: u64,
    pub player_name: String,
    pub game_id: String,
    pub matchup: String,
    pub team: String,
    pub opponent: String,
    pub features: FeatureSet,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
}

impl FeatureRow {
    pub fn actual(&self, target: Target) -> f64 {
        match target {
            Target::Points => self.points,
            Target::Rebounds => self.rebounds,
            Target::Assists => self.assists,
        }
    }

    pub fn vector(&self, target: Target) -> TargetVector {
        self.features.select(REGISTRY.contract(target))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub input_rows: usize,
    /// Repeated (player, game) rows; only the last copy is used.
    pub duplicates: usize,
    pub malformed: usize,
    pub low_minutes: usize,
    pub implausible: usize,
    pub dropped_critical: usize,
    pub dropped_by_feature: BTreeMap<&'static str, usize>,
    pub output_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub report: MaterializeReport,
}

impl FeatureTable {
    pub fn vectors(&self, target: Target) -> Vec<TargetVector> {
        self.rows.iter().map(|r| r.vector(target)).collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.game_date).min()?;
        let max = self.rows.iter().map(|r| r.game_date).max()?;
        Some((min, max))
    }

    pub fn unique_players(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.player_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn columns() -> Vec<&'static str> {
        let mut cols = vec![
            "GAME_DATE",
            "PLAYER_ID",
            "PLAYER_NAME",
            "GAME_ID",
            "MATCHUP",
            "TEAM",
            "OPPONENT",
        ];
        cols.extend(REGISTRY.union().into_iter().map(Feature::name));
        cols.extend(Target::ALL.into_iter().map(Target::column));
        cols
    }
}

pub fn materialize_raw(rows: &[RawGameLog], cfg: &MaterializeConfig) -> FeatureTable {
    let parsed = game_log::records_from_raw(rows);
    let mut table = materialize(parsed.records, cfg);
    table.report.input_rows += parsed.malformed;
    table.report.malformed += parsed.malformed;
    table
}

pub fn materialize(records: Vec<GameRecord>, cfg: &MaterializeConfig) -> FeatureTable {
    let mut report = MaterializeReport {
        input_rows: records.len(),
        ..Default::default()
    };

    let store = GameRecordStore::new(records);
    report.duplicates = store.duplicates();
    let filtered = validity::filter_records(store.into_records());
    report.malformed = filtered.removed.malformed;
    report.low_minutes = filtered.removed.low_minutes;
    report.implausible = filtered.removed.implausible;
    let store = GameRecordStore::from_sorted(filtered.kept);
    let games = store.records();

    // Player/date order: rolling, expanding, matchup and rest context.
    let mut sets = vec![FeatureSet::default(); games.len()];
    for (start, timeline) in store.timelines() {
        let rolling = temporal::timeline_features(timeline.games, &cfg.windows);
        let matchups = matchup::timeline_matchups(timeline.games);
        for (k, game) in timeline.games.iter().enumerate() {
            let mut set = rolling[k];
            matchups[k].apply(&mut set);
            temporal::apply_game_context(&mut set, game.is_home, game.rest_days);
            sets[start + k] = set;
        }
    }

    // Opponent/date and team/date orders, written back by row position.
    let context = league_context::context_features(games, &cfg.context);
    for (set, ctx) in sets.iter_mut().zip(&context) {
        ctx.apply(set);
    }

    let means = ContextMeans::from_rows(
        games
            .iter()
            .zip(&sets)
            .map(|(g, s)| (g.opponent.as_str(), g.team.as_str(), s)),
    );

    let mut rows = Vec::with_capacity(games.len());
    for (game, mut set) in games.iter().zip(sets) {
        means.fill(&game.opponent, &game.team, &mut set);
        fallback::fill_matchup(&mut set);
        if let Some(missing) = fallback::missing_critical(&set) {
            report.dropped_critical += 1;
            *report.dropped_by_feature.entry(missing.name()).or_default() += 1;
            continue;
        }
        rows.push(FeatureRow {
            game_date: game.game_date,
            player_id: game.player_id,
            player_name: game.player_name.clone(),
            game_id: game.game_id.clone(),
            matchup: game.matchup.clone(),
            team: game.team.clone(),
            opponent: game.opponent.clone(),
            features: set,
            points: game.points,
            rebounds: game.rebounds,
            assists: game.assists,
        });
    }
    report.output_rows = rows.len();

    let table = FeatureTable { rows, report };
    log_summary(&table);
    table
}

fn log_summary(table: &FeatureTable) {
    let r = &table.report;
    info!(
        "feature table: {} input rows, {} duplicate, {} malformed, {} low-minute, {} implausible, {} missing critical, {} output rows",
        r.input_rows, r.duplicates, r.malformed, r.low_minutes, r.implausible, r.dropped_critical, r.output_rows
    );
    if let Some((from, to)) = table.date_range() {
        info!(
            "feature table covers {from} to {to}, {} players",
            table.unique_players()
        );
    }
}
