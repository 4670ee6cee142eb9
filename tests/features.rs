use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use prop_projector::contract::{Feature, REGISTRY, Target};
use prop_projector::fallback::CRITICAL_FEATURES;
use prop_projector::game_log::GameRecord;
use prop_projector::league_context::{self, ContextWindowConfig};
use prop_projector::matchup;
use prop_projector::materialize::{self, FeatureRow, FeatureTable, MaterializeConfig};
use prop_projector::record_store::GameRecordStore;
use prop_projector::temporal::{self, WindowConfig};

const PLAYER_SCOPED: &[Feature] = &[
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
    Feature::L5WinPct,
    Feature::L5PlusMinus,
];

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
}

fn game(player_id: u64, date: NaiveDate, opponent: &str, points: f64) -> GameRecord {
    GameRecord {
        player_id,
        player_name: format!("Player {player_id}"),
        game_id: format!("{player_id}-{date}"),
        season: Some("22023".to_string()),
        game_date: date,
        matchup: format!("LAL vs. {opponent}"),
        team: "LAL".to_string(),
        opponent: opponent.to_string(),
        is_home: true,
        minutes: 30.0,
        points,
        rebounds: 6.0,
        assists: 4.0,
        fgm: Some(8.0),
        fga: Some(16.0),
        fg_pct: Some(0.5),
        fg3m: Some(2.0),
        fg3a: Some(5.0),
        fg3_pct: Some(0.4),
        ftm: Some(3.0),
        fta: Some(4.0),
        plus_minus: Some(3.0),
        win: Some(true),
        rest_days: None,
    }
}

fn points_series(player_id: u64, points: &[f64]) -> Vec<GameRecord> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| game(player_id, day(2 * i as i64), "BOS", *p))
        .collect()
}

fn row_on(table: &FeatureTable, player_id: u64, date: NaiveDate) -> &FeatureRow {
    table
        .rows
        .iter()
        .find(|r| r.player_id == player_id && r.game_date == date)
        .expect("row should survive materialization")
}

fn league(rng: &mut StdRng) -> Vec<GameRecord> {
    let opponents = ["BOS", "NYK", "MIA", "DEN"];
    let mut out = Vec::new();
    for player in 1..=6u64 {
        let mut date = day(player as i64 % 3);
        for _ in 0..30 {
            let opp = opponents[rng.gen_range(0..opponents.len())];
            let mut g = game(player, date, opp, rng.gen_range(5.0..40.0));
            g.team = if player % 2 == 0 { "LAL" } else { "GSW" }.to_string();
            g.rebounds = rng.gen_range(0.0..15.0);
            g.assists = rng.gen_range(0.0..12.0);
            g.minutes = rng.gen_range(12.0..42.0);
            g.fga = Some(rng.gen_range(4.0..25.0));
            g.win = Some(rng.gen_range(0..2) == 1);
            out.push(g);
            date += Duration::days(rng.gen_range(1..5));
        }
    }
    out
}

#[test]
fn trailing_means_and_trend_for_seventh_game() {
    let games = points_series(1, &[20.0, 22.0, 18.0, 25.0, 19.0, 21.0, 30.0]);
    let table = materialize::materialize(games, &MaterializeConfig::default());

    let row = row_on(&table, 1, day(12));
    let l5 = row.features.get(Feature::L5Pts).unwrap();
    let l10 = row.features.get(Feature::L10Pts).unwrap();
    let trend = row.features.get(Feature::RecentTrendPts).unwrap();
    assert!((l5 - 21.0).abs() < 1e-9);
    assert!((l10 - 125.0 / 6.0).abs() < 1e-9);
    assert!((trend - (21.0 - 125.0 / 6.0)).abs() < 1e-9);
    assert!((trend - 0.167).abs() < 1e-3);
    assert_eq!(row.points, 30.0);
}

#[test]
fn long_rest_is_clipped_and_not_back_to_back() {
    let mut games = points_series(1, &[20.0; 8]);
    // Eleven days after the last game: ten nights off.
    games.push(game(1, day(14 + 11), "BOS", 24.0));
    let table = materialize::materialize(games, &MaterializeConfig::default());

    let row = row_on(&table, 1, day(25));
    assert_eq!(row.features.get(Feature::RestDays), Some(7.0));
    assert_eq!(row.features.get(Feature::IsBackToBack), Some(0.0));
    assert_eq!(row.features.get(Feature::IsRested), Some(1.0));
}

#[test]
fn consecutive_days_are_back_to_back() {
    let mut games = points_series(1, &[20.0; 8]);
    games.push(game(1, day(15), "BOS", 24.0));
    let table = materialize::materialize(games, &MaterializeConfig::default());

    let row = row_on(&table, 1, day(15));
    assert_eq!(row.features.get(Feature::RestDays), Some(0.0));
    assert_eq!(row.features.get(Feature::IsBackToBack), Some(1.0));
    assert_eq!(row.features.get(Feature::IsRested), Some(0.0));
}

#[test]
fn first_game_has_no_history_and_never_reaches_the_table() {
    let games = points_series(1, &[20.0, 22.0, 18.0, 25.0, 19.0, 21.0]);
    let sets = temporal::timeline_features(&games, &WindowConfig::default());
    for feature in PLAYER_SCOPED {
        assert_eq!(sets[0].get(*feature), None, "{}", feature.name());
    }
    let matchups = matchup::timeline_matchups(&games);
    assert_eq!(matchups[0].points, None);
    assert_eq!(matchups[0].rebounds, None);

    let table = materialize::materialize(games.clone(), &MaterializeConfig::default());
    assert!(table.rows.iter().all(|r| r.game_date != day(0)));
    for row in &table.rows {
        for feature in CRITICAL_FEATURES {
            assert!(row.features.is_defined(feature));
        }
    }
}

#[test]
fn ten_game_window_needs_five_observations() {
    let games = points_series(1, &[10.0, 12.0, 14.0, 16.0, 18.0]);
    let sets = temporal::timeline_features(&games, &WindowConfig::default());
    assert_eq!(sets.len(), 6);
    assert_eq!(sets[4].get(Feature::L10Pts), None);
    assert_eq!(sets[4].get(Feature::L10PtsStd), None);
    assert_eq!(sets[5].get(Feature::L10Pts), Some(14.0));
    assert!(sets[5].get(Feature::L10PtsStd).is_some());
    // The short window needs three.
    assert_eq!(sets[2].get(Feature::L5Pts), None);
    assert_eq!(sets[3].get(Feature::L5Pts), Some(12.0));
}

#[test]
fn features_ignore_the_current_and_later_games() {
    let mut rng = StdRng::seed_from_u64(7);
    let base = GameRecordStore::new(league(&mut rng)).into_records();
    let cfg = WindowConfig::default();

    for _ in 0..20 {
        let i = rng.gen_range(0..base.len());
        let player = base[i].player_id;
        let timeline: Vec<GameRecord> = base
            .iter()
            .filter(|g| g.player_id == player)
            .cloned()
            .collect();
        let k = timeline
            .iter()
            .position(|g| g.game_id == base[i].game_id)
            .unwrap();

        let mut perturbed = timeline.clone();
        for g in perturbed.iter_mut().skip(k) {
            g.points = rng.gen_range(0.0..60.0);
            g.rebounds = rng.gen_range(0.0..25.0);
            g.assists = rng.gen_range(0.0..20.0);
            g.minutes = rng.gen_range(6.0..48.0);
            g.fga = Some(rng.gen_range(0.0..30.0));
            g.win = Some(!g.win.unwrap_or(false));
        }

        let before = temporal::timeline_features(&timeline, &cfg);
        let after = temporal::timeline_features(&perturbed, &cfg);
        let m_before = matchup::timeline_matchups(&timeline);
        let m_after = matchup::timeline_matchups(&perturbed);
        for slot in 0..=k {
            assert_eq!(before[slot], after[slot], "player {player} slot {slot}");
        }
        for slot in 0..=k {
            assert_eq!(m_before[slot], m_after[slot], "player {player} slot {slot}");
        }
    }
}

#[test]
fn league_context_only_sees_earlier_dates() {
    let mut rng = StdRng::seed_from_u64(11);
    let base = GameRecordStore::new(league(&mut rng)).into_records();
    let cutoff = base[base.len() / 2].game_date;

    let mut perturbed = base.clone();
    for g in perturbed.iter_mut().filter(|g| g.game_date >= cutoff) {
        g.points = rng.gen_range(0.0..60.0);
        g.rebounds = rng.gen_range(0.0..25.0);
        g.assists = rng.gen_range(0.0..20.0);
        g.fga = Some(rng.gen_range(0.0..30.0));
    }

    let cfg = ContextWindowConfig::default();
    let before = league_context::context_features(&base, &cfg);
    let after = league_context::context_features(&perturbed, &cfg);
    for (idx, g) in base.iter().enumerate() {
        if g.game_date <= cutoff {
            assert_eq!(before[idx], after[idx], "row {idx} on {}", g.game_date);
        }
    }
}

#[test]
fn unseen_opponent_falls_back_to_season_average() {
    let mut games = points_series(1, &[26.0, 28.0, 30.0, 24.0, 27.0, 29.0, 25.0]);
    // First meeting with MIA; player 2 supplies its defensive profile.
    games.push(game(1, day(14), "MIA", 31.0));
    for (i, p) in [10.0, 12.0, 8.0, 9.0, 11.0, 10.0].into_iter().enumerate() {
        let mut other = game(2, day(2 * i as i64), "MIA", p);
        other.team = "NYK".to_string();
        games.push(other);
    }
    let table = materialize::materialize(games, &MaterializeConfig::default());

    let row = row_on(&table, 1, day(14));
    let season = row.features.get(Feature::SeasonAvgPts).unwrap();
    assert_eq!(row.features.get(Feature::VsOppAvgPts), Some(season));
    assert_ne!(season, 15.0);
    assert_eq!(
        row.features.get(Feature::VsOppAvgReb),
        row.features.get(Feature::L10Reb)
    );
    assert_eq!(
        row.features.get(Feature::VsOppAvgAst),
        row.features.get(Feature::L10Ast)
    );
}

#[test]
fn implausible_and_short_minute_games_are_counted_not_kept() {
    let mut games = points_series(1, &[20.0; 10]);
    games[3].minutes = 4.0;
    games[6].points = 75.0;
    games[8].rebounds = f64::NAN;
    let table = materialize::materialize(games, &MaterializeConfig::default());

    assert_eq!(table.report.input_rows, 10);
    assert_eq!(table.report.low_minutes, 1);
    assert_eq!(table.report.implausible, 1);
    assert_eq!(table.report.malformed, 1);
    assert!(table.rows.iter().all(|r| r.points < 70.0));
    assert_eq!(
        table.report.output_rows + table.report.dropped_critical,
        table.report.input_rows - 3
    );
}

#[test]
fn repeated_game_rows_collapse_to_the_last_copy() {
    let mut games = points_series(1, &[20.0; 8]);
    games.push(game(1, day(18), "BOS", 60.0));
    let clean = materialize::materialize(games.clone(), &MaterializeConfig::default());

    let mut repeated = games.clone();
    repeated.push(game(1, day(18), "BOS", 60.0));
    let table = materialize::materialize(repeated, &MaterializeConfig::default());

    assert_eq!(table.report.duplicates, 1);
    assert_eq!(table.rows, clean.rows);
    let row = row_on(&table, 1, day(18));
    assert_eq!(row.features.get(Feature::L5Pts), Some(20.0));
    assert_eq!(row.features.get(Feature::RestDays), Some(3.0));
    assert_eq!(row.features.get(Feature::IsBackToBack), Some(0.0));

    // A corrected re-send replaces the earlier copy.
    let mut corrected = games;
    corrected.push(game(1, day(18), "BOS", 24.0));
    let table = materialize::materialize(corrected, &MaterializeConfig::default());
    assert_eq!(row_on(&table, 1, day(18)).points, 24.0);
    assert_eq!(
        table.rows.iter().filter(|r| r.game_date == day(18)).count(),
        1
    );
}

#[test]
fn materialization_is_deterministic_under_input_order() {
    let mut rng = StdRng::seed_from_u64(3);
    let games = league(&mut rng);
    let mut shuffled = games.clone();
    shuffled.shuffle(&mut rng);

    let a = materialize::materialize(games, &MaterializeConfig::default());
    let b = materialize::materialize(shuffled, &MaterializeConfig::default());
    assert!(!a.rows.is_empty());
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.report, b.report);
}

#[test]
fn table_columns_cover_every_contract() {
    let columns = FeatureTable::columns();
    for target in Target::ALL {
        for name in REGISTRY.contract(target).names() {
            assert!(columns.contains(&name), "{name} missing");
        }
        assert!(columns.contains(&target.column()));
    }
    assert_eq!(columns[7], "IS_HOME");
    assert_eq!(columns.last(), Some(&"AST"));
}
