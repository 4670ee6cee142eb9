use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use prop_projector::config::{self, AppConfig};
use prop_projector::error::FeatureUnavailable;
use prop_projector::provider::{self, CachedProvider, NbaStatsProvider, RetryPolicy};
use prop_projector::realtime::{self, RealtimeRequest};

const USAGE: &str = "usage: realtime_features --player NAME --opponent CODE [--home] [--rest N] [--season 2024-25]";

fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("init logger")?;
    config::load_dotenv();
    let cfg = AppConfig::from_env();

    let player_name = parse_arg("--player").ok_or_else(|| anyhow!(USAGE))?;
    let opponent = parse_arg("--opponent").ok_or_else(|| anyhow!(USAGE))?;
    let rest_days = match parse_arg("--rest") {
        Some(raw) => realtime::parse_rest_days(&raw).context("--rest")?,
        None => 1,
    };
    let request = RealtimeRequest {
        player_name,
        opponent: opponent.to_uppercase(),
        is_home: has_flag("--home"),
        rest_days,
        season: parse_arg("--season"),
    };

    let roster_season = request
        .season
        .clone()
        .unwrap_or_else(|| provider::current_season(chrono::Utc::now().date_naive()));
    let stats = CachedProvider::new(NbaStatsProvider::new(
        RetryPolicy::from_config(&cfg),
        roster_season,
    ));
    let assembler = realtime::from_env(stats);

    match assembler.assemble(&request) {
        Ok(features) => {
            let json = serde_json::to_string_pretty(&features).context("serialize features")?;
            println!("{json}");
            Ok(())
        }
        Err(err) => {
            let reason = match &err {
                FeatureUnavailable::EntityNotFound(_) | FeatureUnavailable::AmbiguousEntity { .. } => {
                    "entity not found"
                }
                FeatureUnavailable::NoRecentGames { .. } => "no recent games",
                FeatureUnavailable::ProviderUnavailable(_) => "provider unavailable",
            };
            eprintln!("could not compute features ({reason}): {err}");
            std::process::exit(2);
        }
    }
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
