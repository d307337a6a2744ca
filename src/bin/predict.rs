use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchday_form::config::AppConfig;
use matchday_form::predictor::predict_fixture;
use matchday_form::{csv_loader, logging, model_store};

fn main() -> Result<()> {
    logging::init_logging();
    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_path_arg("--data") {
        cfg.data_dir = dir;
    }
    if let Some(dir) = parse_path_arg("--models") {
        cfg.models_dir = dir;
    }

    let teams = positional_args();
    let [home, away] = teams.as_slice() else {
        return Err(anyhow!(
            "usage: predict HOME AWAY [--data DIR] [--models DIR]"
        ));
    };

    let artifacts = model_store::load_artifacts(&cfg.models_dir)?.ok_or_else(|| {
        anyhow!(
            "no model found in {}, run `train` first",
            cfg.models_dir.display()
        )
    })?;
    let loaded = csv_loader::load_league(&cfg.data_dir, &cfg.league_prefix)
        .context("load match history")?;

    let prediction = predict_fixture(&loaded.matches, home, away, &artifacts)?;
    println!("{home} v {away} ({})", prediction.fixture_date);
    for (result, p) in &prediction.ranked {
        println!("  {:<24} {:>5.1}%", prediction.label(*result), p * 100.0);
    }
    for (team, form) in [
        (home, prediction.home_form.as_ref()),
        (away, prediction.away_form.as_ref()),
    ] {
        match form {
            Some(f) => println!(
                "  {team}: P{} W{} D{} L{} GF{} GA{} form {}",
                f.matches_played,
                f.wins,
                f.draws,
                f.losses,
                f.goals_scored,
                f.goals_conceded,
                f.form_string()
            ),
            None => println!("  {team}: no matches on record"),
        }
    }
    Ok(())
}

/// Arguments that are neither flags nor flag values.
fn positional_args() -> Vec<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !arg.contains('=');
            continue;
        }
        out.push(arg.clone());
    }
    out
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
