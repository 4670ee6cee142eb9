use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::AppConfig;
use crate::error::ProviderError;
use crate::game_log::RawGameLog;
use crate::http_cache::fetch_json_cached;
use crate::http_client::{self, http_client};

const STATS_BASE: &str = "https://stats.nba.com/stats";
const STATS_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Origin", "https://www.nba.com"),
    ("Referer", "https://www.nba.com/"),
    ("x-nba-stats-origin", "stats"),
    ("x-nba-stats-token", "true"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub id: u64,
    pub full_name: String,
}

pub trait StatsProvider: Send + Sync {
    fn resolve_player(&self, name: &str) -> Result<PlayerRef, ProviderError>;

    fn season_game_log(
        &self,
        player: &PlayerRef,
        season: &str,
    ) -> Result<Vec<RawGameLog>, ProviderError>;
}

pub fn current_season(today: NaiveDate) -> String {
    let start = if today.month() <= 6 {
        today.year() - 1
    } else {
        today.year()
    };
    format!("{start}-{:02}", (start + 1).rem_euclid(100))
}

pub fn match_player(query: &str, roster: &[PlayerRef]) -> Result<PlayerRef, ProviderError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(ProviderError::Unresolved(query.to_string()));
    }
    if let Some(exact) = roster
        .iter()
        .find(|p| p.full_name.to_lowercase() == needle)
    {
        return Ok(exact.clone());
    }
    let partial: Vec<&PlayerRef> = roster
        .iter()
        .filter(|p| p.full_name.to_lowercase().contains(&needle))
        .collect();
    match partial.as_slice() {
        [] => Err(ProviderError::Unresolved(query.to_string())),
        [one] => Ok((*one).clone()),
        many => Err(ProviderError::Ambiguous {
            query: query.to_string(),
            candidates: many.iter().map(|p| p.full_name.clone()).collect(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            max_attempts: cfg.provider_max_attempts.max(1),
            base_delay: cfg.provider_backoff,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }

    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{what}: attempt {attempt}/{} failed ({err}), retrying in {delay:?}",
                        self.max_attempts
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    fn records(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        self.row_set.iter().map(|row| {
            self.headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }
}

fn first_result_set(raw: &str, wanted: &str) -> Result<ResultSet, ProviderError> {
    let parsed: StatsResponse = serde_json::from_str(raw)
        .map_err(|err| ProviderError::Fatal(format!("invalid stats json: {err}")))?;
    let mut sets = parsed.result_sets.into_iter();
    let first = sets
        .next()
        .ok_or_else(|| ProviderError::Fatal("stats response without result sets".to_string()))?;
    if !first.name.is_empty() && first.name != wanted {
        debug!("expected result set {wanted}, got {}", first.name);
    }
    Ok(first)
}

pub fn parse_roster_json(raw: &str) -> Result<Vec<PlayerRef>, ProviderError> {
    let set = first_result_set(raw, "CommonAllPlayers")?;
    Ok(set
        .records()
        .filter_map(|rec| {
            let id = rec.get("PERSON_ID")?.as_u64()?;
            let name = rec.get("DISPLAY_FIRST_LAST")?.as_str()?.trim().to_string();
            (!name.is_empty()).then_some(PlayerRef {
                id,
                full_name: name,
            })
        })
        .collect())
}

pub fn parse_game_log_json(raw: &str, player: &PlayerRef) -> Result<Vec<RawGameLog>, ProviderError> {
    let set = first_result_set(raw, "PlayerGameLog")?;
    Ok(set
        .records()
        .map(|rec| {
            let mut log = serde_json::from_value::<RawGameLog>(Value::Object(rec)).unwrap_or_default();
            if log.player_name.is_none() {
                log.player_name = Some(player.full_name.clone());
            }
            log
        })
        .collect())
}

pub struct NbaStatsProvider {
    retry: RetryPolicy,
    roster_season: String,
    roster: OnceCell<Vec<PlayerRef>>,
}

impl NbaStatsProvider {
    pub fn new(retry: RetryPolicy, roster_season: impl Into<String>) -> Self {
        Self {
            retry,
            roster_season: roster_season.into(),
            roster: OnceCell::new(),
        }
    }

    fn get(&self, what: &str, url: &str) -> Result<String, ProviderError> {
        self.retry.run(what, || {
            let client = http_client().map_err(|err| ProviderError::Fatal(err.to_string()))?;
            fetch_json_cached(client, url, STATS_HEADERS).map_err(|err| {
                if http_client::is_transient(&err) {
                    ProviderError::Transient(format!("{err:#}"))
                } else {
                    ProviderError::Fatal(format!("{err:#}"))
                }
            })
        })
    }

    fn roster(&self) -> Result<&[PlayerRef], ProviderError> {
        let roster = self.roster.get_or_try_init(|| {
            let url = format!(
                "{STATS_BASE}/commonallplayers?LeagueID=00&Season={}&IsOnlyCurrentSeason=0",
                self.roster_season
            );
            let body = self.get("player roster", &url)?;
            parse_roster_json(&body)
        })?;
        Ok(roster.as_slice())
    }
}

impl StatsProvider for NbaStatsProvider {
    fn resolve_player(&self, name: &str) -> Result<PlayerRef, ProviderError> {
        match_player(name, self.roster()?)
    }

    fn season_game_log(
        &self,
        player: &PlayerRef,
        season: &str,
    ) -> Result<Vec<RawGameLog>, ProviderError> {
        let url = format!(
            "{STATS_BASE}/playergamelog?PlayerID={}&Season={season}&SeasonType=Regular%20Season",
            player.id
        );
        let body = self.get(&format!("game log {} {season}", player.full_name), &url)?;
        parse_game_log_json(&body, player)
    }
}

pub struct CachedProvider<P> {
    inner: P,
    histories: RwLock<HashMap<(u64, String), Arc<Vec<RawGameLog>>>>,
}

impl<P: StatsProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            histories: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cached_histories(&self) -> usize {
        self.histories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl<P: StatsProvider> StatsProvider for CachedProvider<P> {
    fn resolve_player(&self, name: &str) -> Result<PlayerRef, ProviderError> {
        self.inner.resolve_player(name)
    }

    fn season_game_log(
        &self,
        player: &PlayerRef,
        season: &str,
    ) -> Result<Vec<RawGameLog>, ProviderError> {
        let key = (player.id, season.to_string());
        if let Some(hit) = self
            .histories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return Ok(hit.as_ref().clone());
        }
        let fetched = Arc::new(self.inner.season_game_log(player, season)?);
        self.histories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(key)
            .or_insert_with(|| fetched.clone());
        Ok(fetched.as_ref().clone())
    }
}
