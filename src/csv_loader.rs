//! Season CSV ingestion (football-data.co.uk layout).
//!
//! Every `<prefix>*.csv` in a folder is read, decoded, mapped onto
//! [`MatchRecord`] and the union is returned sorted by date.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::match_record::{FullTimeResult, MatchRecord, SideStats};

const CURRENT_SEASON: &str = "Current";

#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub records: Vec<MatchRecord>,
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub matches: Vec<MatchRecord>,
    pub files: Vec<PathBuf>,
    pub dropped: usize,
}

pub fn discover_league_files(dir: &Path, league_prefix: &str) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read data folder {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context("read data folder entry")?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(league_prefix) && name.to_ascii_lowercase().ends_with(".csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads and merges every season file of a league. Rows are stably sorted by
/// date so same-day fixtures keep file order.
pub fn load_league(dir: &Path, league_prefix: &str) -> Result<LoadSummary> {
    let files = discover_league_files(dir, league_prefix)?;
    if files.is_empty() {
        return Err(anyhow!(
            "no {league_prefix}*.csv files found in {}",
            dir.display()
        ));
    }

    let mut matches = Vec::new();
    let mut dropped = 0usize;
    for path in &files {
        let parsed = load_file(path)?;
        debug!(
            file = %path.display(),
            rows = parsed.records.len(),
            dropped = parsed.dropped,
            "parsed season file"
        );
        dropped += parsed.dropped;
        matches.extend(parsed.records);
    }
    matches.sort_by(|a, b| a.date.cmp(&b.date));

    if dropped > 0 {
        warn!(dropped, "skipped rows without a usable date, teams, goals or result");
    }
    info!(
        league = league_prefix,
        files = files.len(),
        matches = matches.len(),
        "loaded league history"
    );

    Ok(LoadSummary {
        matches,
        files,
        dropped,
    })
}

pub fn load_file(path: &Path) -> Result<ParsedFile> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = decode_text(&bytes);
    let season = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(season_from_file_name)
        .unwrap_or_else(|| CURRENT_SEASON.to_string());
    parse_csv_text(&text, &season).with_context(|| format!("parse {}", path.display()))
}

/// UTF-8 when valid, otherwise Latin-1 (every byte maps to one code point).
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// `E0(2022-2023).csv` -> `2022-2023`; files without brackets hold the
/// running season.
pub fn season_from_file_name(name: &str) -> String {
    let Some((_, rest)) = name.split_once('(') else {
        return CURRENT_SEASON.to_string();
    };
    match rest.split_once(')') {
        Some((season, _)) if !season.trim().is_empty() => season.trim().to_string(),
        _ => CURRENT_SEASON.to_string(),
    }
}

pub fn parse_csv_text(text: &str, season: &str) -> Result<ParsedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().context("read csv header")?.clone();
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name, idx))
        .collect();
    for required in ["Date", "HomeTeam", "AwayTeam", "FTHG", "FTAG", "FTR"] {
        if !columns.contains_key(required) {
            return Err(anyhow!("missing required column {required}"));
        }
    }

    let mut out = ParsedFile::default();
    for row in reader.records() {
        let row = row.context("read csv row")?;
        match parse_row(&row, &columns, season) {
            Some(record) => out.records.push(record),
            None => out.dropped += 1,
        }
    }
    Ok(out)
}

fn cell<'r>(
    row: &'r csv::StringRecord,
    columns: &HashMap<&str, usize>,
    name: &str,
) -> Option<&'r str> {
    columns
        .get(name)
        .and_then(|idx| row.get(*idx))
        .filter(|s| !s.is_empty())
}

fn parse_row(
    row: &csv::StringRecord,
    columns: &HashMap<&str, usize>,
    season: &str,
) -> Option<MatchRecord> {
    let get = |name: &str| cell(row, columns, name);
    let count = |name: &str| get(name).and_then(parse_count);

    let date = parse_match_date(get("Date")?)?;
    let home_team = get("HomeTeam")?.to_string();
    let away_team = get("AwayTeam")?.to_string();
    let home_goals = count("FTHG")?;
    let away_goals = count("FTAG")?;
    let result = FullTimeResult::from_code(get("FTR")?)?;

    let side = |shots: &str, target: &str, corners: &str, fouls: &str, yellow: &str, red: &str| {
        SideStats {
            shots: count(shots),
            shots_on_target: count(target),
            corners: count(corners),
            fouls: count(fouls),
            yellow_cards: count(yellow),
            red_cards: count(red),
        }
    };

    Some(MatchRecord {
        league: get("Div").map(|s| s.to_string()),
        season: season.to_string(),
        date,
        home_team,
        away_team,
        home_goals,
        away_goals,
        result,
        half_time_home_goals: count("HTHG"),
        half_time_away_goals: count("HTAG"),
        referee: get("Referee").map(|s| s.to_string()),
        home_stats: side("HS", "HST", "HC", "HF", "HY", "HR"),
        away_stats: side("AS", "AST", "AC", "AF", "AY", "AR"),
    })
}

/// Day-first dates with either a two or four digit year.
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let year = raw.rsplit('/').next()?;
    let fmt = if year.len() == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
    NaiveDate::parse_from_str(raw, fmt).ok()
}

fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
        Some(f as u32)
    } else {
        None
    }
}
