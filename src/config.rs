use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::fallback::LeagueAverages;
use crate::game_db;

pub const REALTIME_MIN_GAMES: usize = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub realtime_window_games: usize,
    pub realtime_min_games: usize,
    pub provider_max_attempts: u32,
    pub provider_backoff: Duration,
    pub request_timeout: Duration,
    pub fetch_parallelism: usize,
    pub league: LeagueAverages,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: game_db::default_db_path(),
            realtime_window_games: 15,
            realtime_min_games: REALTIME_MIN_GAMES,
            provider_max_attempts: 3,
            provider_backoff: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(30),
            fetch_parallelism: 6,
            league: LeagueAverages::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let league = LeagueAverages {
            points: env_f64("LEAGUE_AVG_PTS", defaults.league.points),
            rebounds: env_f64("LEAGUE_AVG_REB", defaults.league.rebounds),
            assists: env_f64("LEAGUE_AVG_AST", defaults.league.assists),
            pace: env_f64("LEAGUE_AVG_PACE", defaults.league.pace),
        };
        Self {
            db_path: env::var("PROP_DB_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or(defaults.db_path),
            realtime_window_games: env::var("REALTIME_WINDOW_GAMES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.realtime_window_games)
                .clamp(REALTIME_MIN_GAMES, 82),
            realtime_min_games: REALTIME_MIN_GAMES,
            provider_max_attempts: env::var("PROVIDER_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.provider_max_attempts)
                .clamp(1, 6),
            provider_backoff: env::var("PROVIDER_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.provider_backoff),
            request_timeout: request_timeout(),
            fetch_parallelism: fetch_parallelism(),
            league,
        }
    }
}

pub fn request_timeout() -> Duration {
    let secs = env::var("REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30)
        .clamp(1, 300);
    Duration::from_secs(secs)
}

pub fn fetch_parallelism() -> usize {
    env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(6)
        .clamp(2, 32)
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}
