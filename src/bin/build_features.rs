use std::path::PathBuf;

use anyhow::{Context, Result};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use prop_projector::config::{self, AppConfig};
use prop_projector::contract::REGISTRY;
use prop_projector::game_db;
use prop_projector::game_log;
use prop_projector::materialize::{self, MaterializeConfig};
use prop_projector::table_export;

const DEFAULT_OUT: &str = "player_features.csv";

fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("init logger")?;
    config::load_dotenv();
    let cfg = AppConfig::from_env();

    // A raw CSV can be materialized directly, skipping the store.
    let table = if let Some(csv_path) = parse_arg("--csv") {
        let rows = game_log::read_raw_csv(&PathBuf::from(csv_path))?;
        materialize::materialize_raw(&rows, &MaterializeConfig::default())
    } else {
        let db_path = parse_arg("--db")
            .map(PathBuf::from)
            .or_else(|| cfg.db_path.clone())
            .context("unable to resolve sqlite path")?;
        let conn = game_db::open_db(&db_path)?;
        let games = game_db::load_games(&conn)?;
        materialize::materialize(games, &MaterializeConfig::default())
    };

    let out = PathBuf::from(parse_arg("--out").unwrap_or_else(|| DEFAULT_OUT.to_string()));
    let export = table_export::export_table(&table, &out)?;
    let manifest_path = out.with_extension("contract.json");
    REGISTRY.write_manifest(&manifest_path)?;

    let report = &table.report;
    println!("Feature table written: {}", out.display());
    println!("Rows: {} Columns: {}", export.rows, export.columns);
    println!(
        "Removed: duplicates={} malformed={} low_minutes={} implausible={} missing_critical={}",
        report.duplicates, report.malformed, report.low_minutes, report.implausible, report.dropped_critical
    );
    for (feature, count) in &report.dropped_by_feature {
        println!("  missing {feature}: {count}");
    }
    if let Some((from, to)) = table.date_range() {
        println!("Dates: {from} .. {to} players={}", table.unique_players());
    }
    println!("Contract manifest: {}", manifest_path.display());
    Ok(())
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
