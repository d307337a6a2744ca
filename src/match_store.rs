//! SQLite persistence for normalized match records.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use tracing::info;

use crate::csv_loader::LoadSummary;
use crate::match_record::{FullTimeResult, MatchRecord, SideStats};
use crate::paths::app_cache_dir;

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub run_id: i64,
    pub league_prefix: String,
    pub files: usize,
    pub matches_upserted: usize,
    pub rows_dropped: usize,
    pub stored_total: usize,
    pub latest_date: Option<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("matches.sqlite"))
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
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            league TEXT NULL,
            season TEXT NOT NULL,
            date TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NOT NULL,
            away_goals INTEGER NOT NULL,
            result TEXT NOT NULL,
            ht_home_goals INTEGER NULL,
            ht_away_goals INTEGER NULL,
            referee TEXT NULL,
            home_shots INTEGER NULL,
            away_shots INTEGER NULL,
            home_shots_on_target INTEGER NULL,
            away_shots_on_target INTEGER NULL,
            home_corners INTEGER NULL,
            away_corners INTEGER NULL,
            home_fouls INTEGER NULL,
            away_fouls INTEGER NULL,
            home_yellow INTEGER NULL,
            away_yellow INTEGER NULL,
            home_red INTEGER NULL,
            away_red INTEGER NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(date, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            league_prefix TEXT NOT NULL,
            files INTEGER NOT NULL,
            matches_upserted INTEGER NOT NULL,
            rows_dropped INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Writes a loaded league into the store and records the run.
pub fn ingest_league(
    conn: &mut Connection,
    db_path: PathBuf,
    league_prefix: &str,
    loaded: &LoadSummary,
) -> Result<IngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, league_prefix, files, matches_upserted, rows_dropped)
         VALUES (?1, NULL, ?2, ?3, 0, ?4)",
        params![
            started_at,
            league_prefix,
            loaded.files.len() as i64,
            loaded.dropped as i64
        ],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    // Rows from files without a Div column are filed under the ingested prefix.
    let tagged: Vec<MatchRecord> = loaded
        .matches
        .iter()
        .map(|m| {
            let mut m = m.clone();
            if m.league.is_none() {
                m.league = Some(league_prefix.to_string());
            }
            m
        })
        .collect();
    let matches_upserted = upsert_matches(conn, &tagged)?;

    conn.execute(
        "UPDATE ingest_runs SET finished_at = ?1, matches_upserted = ?2 WHERE run_id = ?3",
        params![Utc::now().to_rfc3339(), matches_upserted as i64, run_id],
    )
    .context("update ingest run")?;

    let stored_total = conn
        .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get::<_, i64>(0))
        .context("count stored matches")? as usize;
    let latest_date = conn
        .query_row("SELECT MAX(date) FROM matches", [], |row| {
            row.get::<_, Option<String>>(0)
        })
        .context("query latest match date")?;

    info!(run_id, matches_upserted, stored_total, "ingest run finished");
    Ok(IngestSummary {
        db_path,
        run_id,
        league_prefix: league_prefix.to_string(),
        files: loaded.files.len(),
        matches_upserted,
        rows_dropped: loaded.dropped,
        stored_total,
        latest_date,
    })
}

pub fn upsert_matches(conn: &mut Connection, matches: &[MatchRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin ingest transaction")?;
    let now = Utc::now().to_rfc3339();
    for m in matches {
        upsert_match(&tx, m, &now)?;
    }
    tx.commit().context("commit ingest transaction")?;
    Ok(matches.len())
}

/// All stored matches, oldest first. Same-day rows keep insertion order.
pub fn load_matches(conn: &Connection) -> Result<Vec<MatchRecord>> {
    query_matches(conn, None)
}

/// Stored matches whose league code starts with `league_prefix`, oldest
/// first.
pub fn load_league_matches(conn: &Connection, league_prefix: &str) -> Result<Vec<MatchRecord>> {
    query_matches(conn, Some(league_prefix))
}

fn query_matches(conn: &Connection, league_prefix: Option<&str>) -> Result<Vec<MatchRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                league, season, date, home_team, away_team,
                home_goals, away_goals, result, ht_home_goals, ht_away_goals, referee,
                home_shots, home_shots_on_target, home_corners, home_fouls, home_yellow, home_red,
                away_shots, away_shots_on_target, away_corners, away_fouls, away_yellow, away_red
            FROM matches
            WHERE ?1 IS NULL OR substr(league, 1, length(?1)) = ?1
            ORDER BY date ASC, id ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map(params![league_prefix], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<u32>>(8)?,
                row.get::<_, Option<u32>>(9)?,
                row.get::<_, Option<String>>(10)?,
                SideStats {
                    shots: row.get(11)?,
                    shots_on_target: row.get(12)?,
                    corners: row.get(13)?,
                    fouls: row.get(14)?,
                    yellow_cards: row.get(15)?,
                    red_cards: row.get(16)?,
                },
                SideStats {
                    shots: row.get(17)?,
                    shots_on_target: row.get(18)?,
                    corners: row.get(19)?,
                    fouls: row.get(20)?,
                    yellow_cards: row.get(21)?,
                    red_cards: row.get(22)?,
                },
            ))
        })
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        let (
            league,
            season,
            date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            result,
            half_time_home_goals,
            half_time_away_goals,
            referee,
            home_stats,
            away_stats,
        ) = row.context("decode match row")?;
        let date = NaiveDate::parse_from_str(&date, DATE_FMT)
            .with_context(|| format!("invalid stored date {date}"))?;
        let result = FullTimeResult::from_code(&result)
            .ok_or_else(|| anyhow!("invalid stored result {result}"))?;
        out.push(MatchRecord {
            league,
            season,
            date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            result,
            half_time_home_goals,
            half_time_away_goals,
            referee,
            home_stats,
            away_stats,
        });
    }
    Ok(out)
}

fn upsert_match(tx: &rusqlite::Transaction<'_>, m: &MatchRecord, now: &str) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO matches (
            league, season, date, home_team, away_team,
            home_goals, away_goals, result, ht_home_goals, ht_away_goals, referee,
            home_shots, away_shots, home_shots_on_target, away_shots_on_target,
            home_corners, away_corners, home_fouls, away_fouls,
            home_yellow, away_yellow, home_red, away_red, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19,
            ?20, ?21, ?22, ?23, ?24
        )
        ON CONFLICT(date, home_team, away_team) DO UPDATE SET
            league = excluded.league,
            season = excluded.season,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            result = excluded.result,
            ht_home_goals = excluded.ht_home_goals,
            ht_away_goals = excluded.ht_away_goals,
            referee = excluded.referee,
            home_shots = excluded.home_shots,
            away_shots = excluded.away_shots,
            home_shots_on_target = excluded.home_shots_on_target,
            away_shots_on_target = excluded.away_shots_on_target,
            home_corners = excluded.home_corners,
            away_corners = excluded.away_corners,
            home_fouls = excluded.home_fouls,
            away_fouls = excluded.away_fouls,
            home_yellow = excluded.home_yellow,
            away_yellow = excluded.away_yellow,
            home_red = excluded.home_red,
            away_red = excluded.away_red,
            updated_at = excluded.updated_at
        "#,
        params![
            m.league,
            m.season,
            m.date.format(DATE_FMT).to_string(),
            m.home_team,
            m.away_team,
            m.home_goals,
            m.away_goals,
            m.result.code().to_string(),
            m.half_time_home_goals,
            m.half_time_away_goals,
            m.referee,
            m.home_stats.shots,
            m.away_stats.shots,
            m.home_stats.shots_on_target,
            m.away_stats.shots_on_target,
            m.home_stats.corners,
            m.away_stats.corners,
            m.home_stats.fouls,
            m.away_stats.fouls,
            m.home_stats.yellow_cards,
            m.away_stats.yellow_cards,
            m.home_stats.red_cards,
            m.away_stats.red_cards,
            now,
        ],
    )
    .context("upsert match")?;
    Ok(())
}
