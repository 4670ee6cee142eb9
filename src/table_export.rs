use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::contract::{REGISTRY, Target};
use crate::materialize::{FeatureRow, FeatureTable, MaterializeReport};

const METADATA_COLUMNS: usize = 7;

pub struct ExportReport {
    pub rows: usize,
    pub columns: usize,
}

pub fn export_table(table: &FeatureTable, path: &Path) -> Result<ExportReport> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        export_xlsx(table, path)
    } else {
        export_csv(table, path)
    }
}

pub fn export_csv(table: &FeatureTable, path: &Path) -> Result<ExportReport> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    let header = FeatureTable::columns();
    writer.write_record(&header).context("write csv header")?;
    for row in &table.rows {
        writer
            .write_record(table_row(row))
            .with_context(|| format!("write row for player {}", row.player_id))?;
    }
    writer.flush().context("flush csv")?;
    Ok(ExportReport {
        rows: table.rows.len(),
        columns: header.len(),
    })
}

pub fn export_xlsx(table: &FeatureTable, path: &Path) -> Result<ExportReport> {
    let header: Vec<String> = FeatureTable::columns()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut feature_rows = vec![header.clone()];
    feature_rows.extend(table.rows.iter().map(table_row));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Features")?;
        write_rows(sheet, &feature_rows, METADATA_COLUMNS)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Report")?;
        write_rows(sheet, &report_rows(&table.report), 1)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Contracts")?;
        write_rows(sheet, &contract_rows(), 1)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        rows: table.rows.len(),
        columns: header.len(),
    })
}

fn table_row(row: &FeatureRow) -> Vec<String> {
    let mut out = vec![
        row.game_date.format("%Y-%m-%d").to_string(),
        row.player_id.to_string(),
        row.player_name.clone(),
        row.game_id.clone(),
        row.matchup.clone(),
        row.team.clone(),
        row.opponent.clone(),
    ];
    out.extend(
        REGISTRY
            .union()
            .into_iter()
            .map(|f| opt_to_string(row.features.get(f))),
    );
    out.extend(Target::ALL.into_iter().map(|t| row.actual(t).to_string()));
    out
}

fn report_rows(report: &MaterializeReport) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["metric".to_string(), "value".to_string()],
        vec!["input_rows".to_string(), report.input_rows.to_string()],
        vec!["duplicates".to_string(), report.duplicates.to_string()],
        vec!["malformed".to_string(), report.malformed.to_string()],
        vec!["low_minutes".to_string(), report.low_minutes.to_string()],
        vec!["implausible".to_string(), report.implausible.to_string()],
        vec![
            "dropped_critical".to_string(),
            report.dropped_critical.to_string(),
        ],
        vec!["output_rows".to_string(), report.output_rows.to_string()],
    ];
    for (feature, count) in &report.dropped_by_feature {
        rows.push(vec![format!("missing_{feature}"), count.to_string()]);
    }
    rows
}

fn contract_rows() -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "target".to_string(),
        "position".to_string(),
        "feature".to_string(),
    ]];
    for contract in REGISTRY.contracts() {
        for (pos, name) in contract.names().into_iter().enumerate() {
            rows.push(vec![
                contract.target.column().to_string(),
                pos.to_string(),
                name.to_string(),
            ]);
        }
    }
    rows
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>], numeric_from: usize) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let res = match value.parse::<f64>() {
                Ok(num) if row_idx > 0 && col_idx >= numeric_from => {
                    worksheet.write_number(row_idx as u32, col_idx as u16, num)
                }
                _ => worksheet.write_string(row_idx as u32, col_idx as u16, value),
            };
            res.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
