use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use prop_projector::config::{self, AppConfig};
use prop_projector::game_db::{self, IngestSummary};
use prop_projector::game_log;
use prop_projector::provider::{self, NbaStatsProvider, RetryPolicy, StatsProvider};

const USAGE: &str =
    "usage: ingest_logs [--db PATH] (--csv PATH | --player NAME [--season 2024-25])";

fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("init logger")?;
    config::load_dotenv();
    let cfg = AppConfig::from_env();

    let db_path = parse_db_path_arg()
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let mut conn = game_db::open_db(&db_path)?;

    let summary = if let Some(csv_path) = parse_arg("--csv") {
        let csv_path = PathBuf::from(csv_path);
        let rows = game_log::read_raw_csv(&csv_path)?;
        game_db::ingest_raw_logs(&mut conn, &format!("csv:{}", csv_path.display()), &rows)?
    } else if let Some(name) = parse_arg("--player") {
        let season =
            parse_arg("--season").unwrap_or_else(|| provider::current_season(Utc::now().date_naive()));
        let stats = NbaStatsProvider::new(RetryPolicy::from_config(&cfg), season.clone());
        let player = stats
            .resolve_player(&name)
            .with_context(|| format!("resolve player '{name}'"))?;
        let rows = stats
            .season_game_log(&player, &season)
            .with_context(|| format!("fetch {} game log for {season}", player.full_name))?;
        game_db::ingest_raw_logs(
            &mut conn,
            &format!("provider:{}:{season}", player.id),
            &rows,
        )?
    } else {
        return Err(anyhow!(USAGE));
    };

    print_summary(&db_path, &summary);
    Ok(())
}

fn print_summary(db_path: &std::path::Path, summary: &IngestSummary) {
    println!("Game log ingest complete");
    println!("DB: {}", db_path.display());
    println!("Source: {}", summary.source);
    println!(
        "Rows read: {} malformed: {} upserted: {}",
        summary.rows_read, summary.malformed, summary.rows_upserted
    );
    println!(
        "Latest game date: {}",
        summary.latest_game_date.as_deref().unwrap_or("n/a")
    );
}

fn parse_db_path_arg() -> Option<PathBuf> {
    parse_arg("--db").map(PathBuf::from)
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
