use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::game_log::{self, GameRecord, RawGameLog};
use crate::http_cache::app_cache_dir;

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub source: String,
    pub rows_read: usize,
    pub malformed: usize,
    pub rows_upserted: usize,
    pub latest_game_date: Option<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("game_logs.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS game_logs (
            player_id INTEGER NOT NULL,
            game_id TEXT NOT NULL,
            player_name TEXT NOT NULL,
            season TEXT NULL,
            game_date TEXT NOT NULL,
            matchup TEXT NOT NULL,
            minutes REAL NOT NULL,
            points REAL NOT NULL,
            rebounds REAL NOT NULL,
            assists REAL NOT NULL,
            fgm REAL NULL,
            fga REAL NULL,
            fg_pct REAL NULL,
            fg3m REAL NULL,
            fg3a REAL NULL,
            fg3_pct REAL NULL,
            ftm REAL NULL,
            fta REAL NULL,
            plus_minus REAL NULL,
            wl TEXT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (player_id, game_id)
        );
        CREATE INDEX IF NOT EXISTS idx_game_logs_date ON game_logs(game_date);
        CREATE INDEX IF NOT EXISTS idx_game_logs_player_date ON game_logs(player_id, game_date);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source TEXT NOT NULL,
            rows_read INTEGER NOT NULL,
            malformed INTEGER NOT NULL,
            rows_upserted INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn ingest_raw_logs(
    conn: &mut Connection,
    source: &str,
    rows: &[RawGameLog],
) -> Result<IngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, source, rows_read, malformed, rows_upserted)
         VALUES (?1, NULL, ?2, ?3, 0, 0)",
        params![started_at, source, rows.len() as i64],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    let parsed = game_log::records_from_raw(rows);
    let tx = conn.transaction().context("begin ingest transaction")?;
    let mut rows_upserted = 0usize;
    for record in &parsed.records {
        upsert_game(&tx, record)?;
        rows_upserted += 1;
    }
    tx.commit().context("commit ingest transaction")?;

    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, malformed = ?2, rows_upserted = ?3
         WHERE run_id = ?4",
        params![
            Utc::now().to_rfc3339(),
            parsed.malformed as i64,
            rows_upserted as i64,
            run_id
        ],
    )
    .context("update ingest run")?;

    let latest_game_date = conn
        .query_row("SELECT MAX(game_date) FROM game_logs", [], |row| {
            row.get::<_, Option<String>>(0)
        })
        .context("query latest game_date")?;

    Ok(IngestSummary {
        source: source.to_string(),
        rows_read: rows.len(),
        malformed: parsed.malformed,
        rows_upserted,
        latest_game_date,
    })
}

pub fn load_games(conn: &Connection) -> Result<Vec<GameRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                player_id, game_id, player_name, season, game_date, matchup,
                minutes, points, rebounds, assists,
                fgm, fga, fg_pct, fg3m, fg3a, fg3_pct, ftm, fta, plus_minus, wl
            FROM game_logs
            ORDER BY player_id ASC, game_date ASC, game_id ASC
            "#,
        )
        .context("prepare load games query")?;

    let rows = stmt
        .query_map([], |row| {
            let date_raw: String = row.get(4)?;
            let matchup: String = row.get(5)?;
            let wl: Option<String> = row.get(19)?;
            Ok((
                date_raw,
                RawGameLog {
                    player_id: Some(row.get::<_, i64>(0)? as u64),
                    game_id: Some(row.get(1)?),
                    player_name: Some(row.get(2)?),
                    season_id: row.get(3)?,
                    game_date: None,
                    matchup: Some(matchup),
                    wl,
                    minutes: Some(row.get(6)?),
                    points: Some(row.get(7)?),
                    rebounds: Some(row.get(8)?),
                    assists: Some(row.get(9)?),
                    fgm: row.get(10)?,
                    fga: row.get(11)?,
                    fg_pct: row.get(12)?,
                    fg3m: row.get(13)?,
                    fg3a: row.get(14)?,
                    fg3_pct: row.get(15)?,
                    ftm: row.get(16)?,
                    fta: row.get(17)?,
                    plus_minus: row.get(18)?,
                },
            ))
        })
        .context("query load games")?;

    let mut out = Vec::new();
    for row in rows {
        let (date_raw, mut raw) = row.context("decode game row")?;
        raw.game_date = Some(date_raw.clone());
        let record = GameRecord::from_raw(&raw)
            .ok_or_else(|| anyhow!("stored game row is incomplete (date {date_raw})"))?;
        out.push(record);
    }
    Ok(out)
}

fn upsert_game(tx: &rusqlite::Transaction<'_>, g: &GameRecord) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO game_logs (
            player_id, game_id, player_name, season, game_date, matchup,
            minutes, points, rebounds, assists,
            fgm, fga, fg_pct, fg3m, fg3a, fg3_pct, ftm, fta, plus_minus, wl,
            updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
            ?21
        )
        ON CONFLICT(player_id, game_id) DO UPDATE SET
            player_name = excluded.player_name,
            season = excluded.season,
            game_date = excluded.game_date,
            matchup = excluded.matchup,
            minutes = excluded.minutes,
            points = excluded.points,
            rebounds = excluded.rebounds,
            assists = excluded.assists,
            fgm = excluded.fgm,
            fga = excluded.fga,
            fg_pct = excluded.fg_pct,
            fg3m = excluded.fg3m,
            fg3a = excluded.fg3a,
            fg3_pct = excluded.fg3_pct,
            ftm = excluded.ftm,
            fta = excluded.fta,
            plus_minus = excluded.plus_minus,
            wl = excluded.wl,
            updated_at = excluded.updated_at
        "#,
        params![
            g.player_id as i64,
            g.game_id,
            g.player_name,
            g.season,
            format_date(g.game_date),
            g.matchup,
            g.minutes,
            g.points,
            g.rebounds,
            g.assists,
            g.fgm,
            g.fga,
            g.fg_pct,
            g.fg3m,
            g.fg3a,
            g.fg3_pct,
            g.ftm,
            g.fta,
            g.plus_minus,
            g.win.map(|w| if w { "W" } else { "L" }),
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert game")?;
    Ok(())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
