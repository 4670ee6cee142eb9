use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Utc};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{AppConfig, REALTIME_MIN_GAMES};
use crate::contract::{REGISTRY, Target};
use crate::error::FeatureUnavailable;
use crate::fallback::{self, LeagueAverages};
use crate::feature_set::{FeatureSet, TargetVector};
use crate::game_log::{self, GameRecord, RawGameLog};
use crate::matchup;
use crate::provider::{self, StatsProvider};
use crate::record_store::GameRecordStore;
use crate::temporal::{self, WindowConfig};
use crate::validity;

#[derive(Debug, Clone, Copy)]
pub struct RealtimeConfig {
    pub window_games: usize,
    pub min_games: usize,
    pub windows: WindowConfig,
    pub league: LeagueAverages,
    pub parallelism: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            window_games: 15,
            min_games: REALTIME_MIN_GAMES,
            windows: WindowConfig::default(),
            league: LeagueAverages::default(),
            parallelism: 6,
        }
    }
}

impl RealtimeConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            window_games: cfg.realtime_window_games.max(cfg.realtime_min_games),
            min_games: cfg.realtime_min_games,
            windows: WindowConfig::default(),
            league: cfg.league,
            parallelism: cfg.fetch_parallelism,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeRequest {
    pub player_name: String,
    pub opponent: String,
    pub is_home: bool,
    /// Nights off before the game. Clipped to 0..=7 before the rest flags
    /// are derived.
    pub rest_days: i64,
    pub season: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeFeatures {
    pub player_id: u64,
    pub player_name: String,
    pub season: String,
    pub points: TargetVector,
    pub rebounds: TargetVector,
    pub assists: TargetVector,
    pub recent_games: Vec<GameRecord>,
}

impl RealtimeFeatures {
    pub fn vector(&self, target: Target) -> &TargetVector {
        match target {
            Target::Points => &self.points,
            Target::Rebounds => &self.rebounds,
            Target::Assists => &self.assists,
        }
    }
}

pub struct RealtimeAssembler<P> {
    provider: P,
    cfg: RealtimeConfig,
    today: NaiveDate,
}

impl<P: StatsProvider> RealtimeAssembler<P> {
    pub fn new(provider: P, cfg: RealtimeConfig) -> Self {
        Self {
            provider,
            cfg,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.cfg
    }

    pub fn assemble(&self, req: &RealtimeRequest) -> Result<RealtimeFeatures, FeatureUnavailable> {
        let season = req
            .season
            .clone()
            .unwrap_or_else(|| provider::current_season(self.today));
        let player = self.provider.resolve_player(&req.player_name)?;
        let raw = self.provider.season_game_log(&player, &season)?;
        debug!(
            "{} {season}: {} raw game rows",
            player.full_name,
            raw.len()
        );
        let mut out = self.assemble_from_raw(&raw, req)?;
        out.player_id = player.id;
        out.player_name = player.full_name;
        out.season = season;
        Ok(out)
    }

    pub fn assemble_many(
        &self,
        reqs: &[RealtimeRequest],
    ) -> Vec<Result<RealtimeFeatures, FeatureUnavailable>> {
        let run = || reqs.par_iter().map(|req| self.assemble(req)).collect::<Vec<_>>();
        let threads = self.cfg.parallelism.clamp(2, 32);
        let results = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run),
            Err(_) => run(),
        };
        let served = results.iter().filter(|r| r.is_ok()).count();
        info!("realtime batch: {served}/{} requests served", reqs.len());
        results
    }

    pub fn assemble_from_raw(
        &self,
        raw: &[RawGameLog],
        req: &RealtimeRequest,
    ) -> Result<RealtimeFeatures, FeatureUnavailable> {
        let parsed = game_log::records_from_raw(raw);
        if parsed.malformed > 0 {
            debug!("{}: {} malformed rows skipped", req.player_name, parsed.malformed);
        }
        assemble_from_games(&self.cfg, self.today, parsed.records, req)
    }
}

pub fn assemble_from_games(
    cfg: &RealtimeConfig,
    today: NaiveDate,
    games: Vec<GameRecord>,
    req: &RealtimeRequest,
) -> Result<RealtimeFeatures, FeatureUnavailable> {
    let recent = recent_history(cfg, today, games);
    if recent.len() < cfg.min_games {
        return Err(FeatureUnavailable::NoRecentGames {
            available: recent.len(),
            required: cfg.min_games,
        });
    }

    let set = next_game_set(cfg, &recent, req);
    let (player_id, player_name) = recent
        .last()
        .map(|g| (g.player_id, g.player_name.clone()))
        .unwrap_or_default();
    let season = recent
        .last()
        .and_then(|g| g.season.clone())
        .or_else(|| req.season.clone())
        .unwrap_or_else(|| provider::current_season(today));

    Ok(RealtimeFeatures {
        player_id,
        player_name,
        season,
        points: set.select(REGISTRY.contract(Target::Points)),
        rebounds: set.select(REGISTRY.contract(Target::Rebounds)),
        assists: set.select(REGISTRY.contract(Target::Assists)),
        recent_games: recent,
    })
}

fn recent_history(cfg: &RealtimeConfig, today: NaiveDate, games: Vec<GameRecord>) -> Vec<GameRecord> {
    let completed: Vec<GameRecord> = games
        .into_iter()
        .filter(|g| g.win.is_some() && g.game_date <= today)
        .collect();
    let ordered = GameRecordStore::new(completed).into_records();
    let mut kept = validity::filter_records(ordered).kept;
    let drop = kept.len().saturating_sub(cfg.window_games);
    kept.drain(..drop);
    kept
}

fn next_game_set(cfg: &RealtimeConfig, history: &[GameRecord], req: &RealtimeRequest) -> FeatureSet {
    let mut set = temporal::next_game_features(history, &cfg.windows);
    matchup::next_game_matchup(history, &req.opponent).apply(&mut set);
    temporal::apply_game_context(&mut set, req.is_home, Some(req.rest_days));
    fallback::fill_matchup(&mut set);
    // League context has no cross-player data here; constants stand in.
    cfg.league.fill_context(&mut set);
    set
}

pub fn parse_rest_days(raw: &str) -> anyhow::Result<i64> {
    let rest = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("invalid rest value '{raw}'"))?;
    if rest < 0 {
        return Err(anyhow!("rest days cannot be negative, got {rest}"));
    }
    Ok(rest)
}

pub fn from_env<P: StatsProvider>(provider: P) -> RealtimeAssembler<P> {
    RealtimeAssembler::new(provider, RealtimeConfig::from_app(&AppConfig::from_env()))
}
