use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use matchday_form::aggregator::aggregate_checked;
use matchday_form::backtest::{format_summary, run_backtest};
use matchday_form::backtest_export::export_backtest;
use matchday_form::config::AppConfig;
use matchday_form::{csv_loader, logging, match_store};

fn main() -> Result<()> {
    logging::init_logging();
    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_path_arg("--data") {
        cfg.data_dir = dir;
    }
    if let Some(raw) = parse_string_arg("--cutoff") {
        cfg.backtest_cutoff = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|err| anyhow!("invalid --cutoff {raw}: {err}"))?;
    }
    if let Some(n) = parse_usize_arg("--min-history") {
        cfg.training.min_history = n as u32;
    }
    if let Some(n) = parse_usize_arg("--rounds") {
        cfg.training.gbt.rounds = n.max(1);
    }

    let matches = if has_flag("--from-db") {
        let db_path = parse_path_arg("--db")
            .or(cfg.db_path.clone())
            .context("unable to resolve sqlite path")?;
        let conn = match_store::open_db(&db_path)?;
        match_store::load_league_matches(&conn, &cfg.league_prefix)?
    } else {
        csv_loader::load_league(&cfg.data_dir, &cfg.league_prefix)
            .context("load match history")?
            .matches
    };

    let (rows, _) = aggregate_checked(&matches)?;
    let report = run_backtest(&rows, cfg.backtest_cutoff, &cfg.training)?;
    print!("{}", format_summary(&report));

    if let Some(path) = parse_path_arg("--xlsx") {
        let export = export_backtest(&path, &report)?;
        println!(
            "Wrote {} ({} predictions, {} calibration rows)",
            path.display(),
            export.predictions,
            export.calibration_rows
        );
    }
    Ok(())
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_string_arg(name).and_then(|v| v.parse::<usize>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
