use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use prop_projector::config::{self, AppConfig};
use prop_projector::contract::Target;
use prop_projector::evaluation::{self, RegressionMetrics};
use prop_projector::game_db;
use prop_projector::game_log;
use prop_projector::materialize::{self, FeatureRow, MaterializeConfig};
use prop_projector::model::TrailingMeanModel;

const DEFAULT_TRAIN_FRACTION: f64 = 0.8;
const DEFAULT_FOLDS: usize = 5;

fn main() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .context("init logger")?;
    config::load_dotenv();
    let cfg = AppConfig::from_env();

    let table = if let Some(csv_path) = parse_arg("--csv") {
        let rows = game_log::read_raw_csv(&PathBuf::from(csv_path))?;
        materialize::materialize_raw(&rows, &MaterializeConfig::default())
    } else {
        let db_path = parse_arg("--db")
            .map(PathBuf::from)
            .or_else(|| cfg.db_path.clone())
            .context("unable to resolve sqlite path")?;
        let conn = game_db::open_db(&db_path)?;
        materialize::materialize(game_db::load_games(&conn)?, &MaterializeConfig::default())
    };
    if table.rows.len() < 2 {
        return Err(anyhow!(
            "need at least 2 feature rows to backtest, have {}",
            table.rows.len()
        ));
    }

    let train_fraction = parse_arg("--train")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_TRAIN_FRACTION)
        .clamp(0.1, 0.95);
    let folds = parse_arg("--folds")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_FOLDS)
        .clamp(2, 20);

    let (train, test) = evaluation::chronological_split(&table.rows, train_fraction);
    println!(
        "Backtest rows={} train={} test={}",
        table.rows.len(),
        train.len(),
        test.len()
    );

    let ordered: Vec<&FeatureRow> = train.iter().chain(test.iter()).copied().collect();
    for target in Target::ALL {
        let model = TrailingMeanModel::new(target);
        let (metrics, skipped) = evaluation::evaluate_model(&model, &test, target)?;
        println!("{} baseline (held-out):", target.label());
        print_metrics(metrics, skipped);

        let mut fold_mae = Vec::new();
        for (_, test_range) in evaluation::time_series_folds(ordered.len(), folds) {
            let (m, _) = evaluation::evaluate_model(&model, &ordered[test_range], target)?;
            if m.samples > 0 {
                fold_mae.push(m.mae);
            }
        }
        if !fold_mae.is_empty() {
            let mean = fold_mae.iter().sum::<f64>() / fold_mae.len() as f64;
            println!("  cv folds={} mean_mae={:.3}", fold_mae.len(), mean);
        }
    }
    Ok(())
}

fn print_metrics(metrics: RegressionMetrics, skipped: usize) {
    println!(
        "  samples={} skipped={} mae={:.3} rmse={:.3} r2={:.3}",
        metrics.samples, skipped, metrics.mae, metrics.rmse, metrics.r2
    );
    println!(
        "  within1={:.3} within2={:.3} within3={:.3} within5={:.3}",
        metrics.within_1, metrics.within_2, metrics.within_3, metrics.within_5
    );
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
