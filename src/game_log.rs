use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TEAM: &str = "UNK";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGameLog {
    #[serde(rename = "SEASON_ID", default)]
    pub season_id: Option<String>,
    #[serde(rename = "Player_ID", alias = "PLAYER_ID", default)]
    pub player_id: Option<u64>,
    #[serde(rename = "PLAYER_NAME", default)]
    pub player_name: Option<String>,
    #[serde(rename = "Game_ID", alias = "GAME_ID", default)]
    pub game_id: Option<String>,
    #[serde(rename = "GAME_DATE", default)]
    pub game_date: Option<String>,
    #[serde(rename = "MATCHUP", default)]
    pub matchup: Option<String>,
    #[serde(rename = "WL", default)]
    pub wl: Option<String>,
    #[serde(rename = "MIN", default)]
    pub minutes: Option<f64>,
    #[serde(rename = "FGM", default)]
    pub fgm: Option<f64>,
    #[serde(rename = "FGA", default)]
    pub fga: Option<f64>,
    #[serde(rename = "FG_PCT", default)]
    pub fg_pct: Option<f64>,
    #[serde(rename = "FG3M", default)]
    pub fg3m: Option<f64>,
    #[serde(rename = "FG3A", default)]
    pub fg3a: Option<f64>,
    #[serde(rename = "FG3_PCT", default)]
    pub fg3_pct: Option<f64>,
    #[serde(rename = "FTM", default)]
    pub ftm: Option<f64>,
    #[serde(rename = "FTA", default)]
    pub fta: Option<f64>,
    #[serde(rename = "REB", default)]
    pub rebounds: Option<f64>,
    #[serde(rename = "AST", default)]
    pub assists: Option<f64>,
    #[serde(rename = "PTS", default)]
    pub points: Option<f64>,
    #[serde(rename = "PLUS_MINUS", default)]
    pub plus_minus: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub team: String,
    pub opponent: String,
    pub is_home: bool,
}

impl Matchup {
    pub fn parse(raw: &str) -> Self {
        if let Some((team, opponent)) = raw.split_once(" vs. ") {
            return Self {
                team: team.trim().to_string(),
                opponent: opponent.trim().to_string(),
                is_home: true,
            };
        }
        if let Some((team, opponent)) = raw.split_once(" @ ") {
            return Self {
                team: team.trim().to_string(),
                opponent: opponent.trim().to_string(),
                is_home: false,
            };
        }
        Self {
            team: UNKNOWN_TEAM.to_string(),
            opponent: UNKNOWN_TEAM.to_string(),
            is_home: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub player_id: u64,
    pub player_name: String,
    pub game_id: String,
    pub season: Option<String>,
    pub game_date: NaiveDate,
    pub matchup: String,
    pub team: String,
    pub opponent: String,
    pub is_home: bool,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub fgm: Option<f64>,
    pub fga: Option<f64>,
    pub fg_pct: Option<f64>,
    pub fg3m: Option<f64>,
    pub fg3a: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub ftm: Option<f64>,
    pub fta: Option<f64>,
    pub plus_minus: Option<f64>,
    pub win: Option<bool>,
    pub rest_days: Option<i64>,
}

impl GameRecord {
    pub fn from_raw(raw: &RawGameLog) -> Option<Self> {
        let player_id = raw.player_id?;
        let game_date = parse_game_date(raw.game_date.as_deref()?)?;
        let matchup_raw = raw.matchup.as_deref()?.trim();
        if matchup_raw.is_empty() {
            return None;
        }
        let matchup = Matchup::parse(matchup_raw);

        Some(Self {
            player_id,
            player_name: raw.player_name.clone().unwrap_or_default(),
            game_id: raw
                .game_id
                .clone()
                .unwrap_or_else(|| format!("{player_id}-{game_date}")),
            season: raw.season_id.clone(),
            game_date,
            matchup: matchup_raw.to_string(),
            team: matchup.team,
            opponent: matchup.opponent,
            is_home: matchup.is_home,
            minutes: raw.minutes?,
            points: raw.points?,
            rebounds: raw.rebounds?,
            assists: raw.assists?,
            fgm: raw.fgm,
            fga: raw.fga,
            fg_pct: raw.fg_pct,
            fg3m: raw.fg3m,
            fg3a: raw.fg3a,
            fg3_pct: raw.fg3_pct,
            ftm: raw.ftm,
            fta: raw.fta,
            plus_minus: raw.plus_minus,
            win: parse_win_loss(raw.wl.as_deref()),
            rest_days: None,
        })
    }

    pub fn win_indicator(&self) -> Option<f64> {
        self.win.map(|w| if w { 1.0 } else { 0.0 })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLogs {
    pub records: Vec<GameRecord>,
    pub malformed: usize,
}

pub fn records_from_raw(rows: &[RawGameLog]) -> ParsedLogs {
    let mut out = ParsedLogs::default();
    for row in rows {
        match GameRecord::from_raw(row) {
            Some(record) => out.records.push(record),
            None => out.malformed += 1,
        }
    }
    out
}

pub fn read_raw_csv(path: &Path) -> Result<Vec<RawGameLog>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut out = Vec::new();
    for (idx, row) in reader.deserialize::<RawGameLog>().enumerate() {
        // A row whose cells do not even parse is kept as an empty log so the
        // malformed count stays honest.
        match row {
            Ok(row) => out.push(row),
            Err(err) => {
                log::debug!("raw csv row {} unreadable: {err}", idx + 1);
                out.push(RawGameLog::default());
            }
        }
    }
    Ok(out)
}

pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if trimmed.len() > 10
        && let Some(prefix) = trimmed.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date);
    }
    NaiveDate::parse_from_str(trimmed, "%b %d, %Y").ok()
}

fn parse_win_loss(raw: Option<&str>) -> Option<bool> {
    match raw?.trim() {
        "W" | "w" => Some(true),
        "L" | "l" => Some(false),
        _ => None,
    }
}
