use std::path::PathBuf;

use anyhow::{Context, Result};

use matchday_form::config::AppConfig;
use matchday_form::{csv_loader, logging, match_store};

fn main() -> Result<()> {
    logging::init_logging();
    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_path_arg("--data") {
        cfg.data_dir = dir;
    }

    let db_path = parse_path_arg("--db")
        .or(cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;

    let loaded = csv_loader::load_league(&cfg.data_dir, &cfg.league_prefix)?;
    let mut conn = match_store::open_db(&db_path)?;
    let summary =
        match_store::ingest_league(&mut conn, db_path.clone(), &cfg.league_prefix, &loaded)?;

    println!("Match ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Run: {}", summary.run_id);
    println!("League prefix: {}", summary.league_prefix);
    println!("Files: {}", summary.files);
    println!("Matches upserted: {}", summary.matches_upserted);
    println!("Rows dropped: {}", summary.rows_dropped);
    println!(
        "Stored total: {} (latest {})",
        summary.stored_total,
        summary.latest_date.as_deref().unwrap_or("n/a")
    );
    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
