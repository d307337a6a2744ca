use std::path::PathBuf;

use anyhow::{Context, Result};

use matchday_form::aggregator::aggregate_checked;
use matchday_form::backtest::{format_summary, run_backtest};
use matchday_form::config::AppConfig;
use matchday_form::metrics::{Metrics, format_report};
use matchday_form::predictor::predict_fixture;
use matchday_form::{csv_loader, logging, model_store, training};

const SAMPLE_HOME: &str = "Man United";
const SAMPLE_AWAY: &str = "Liverpool";

fn main() -> Result<()> {
    logging::init_logging();
    let mut cfg = AppConfig::from_env();
    if let Some(dir) = parse_path_arg("--data") {
        cfg.data_dir = dir;
    }
    if let Some(dir) = parse_path_arg("--models") {
        cfg.models_dir = dir;
    }
    if let Some(n) = parse_usize_arg("--min-history") {
        cfg.training.min_history = n as u32;
    }
    if let Some(n) = parse_usize_arg("--rounds") {
        cfg.training.gbt.rounds = n.max(1);
    }
    let retrain = has_flag("--retrain");

    let loaded = csv_loader::load_league(&cfg.data_dir, &cfg.league_prefix)
        .context("load match history")?;
    println!(
        "Loaded {} matches from {} file(s) ({} rows dropped)",
        loaded.matches.len(),
        loaded.files.len(),
        loaded.dropped
    );

    let (rows, aggregator) = aggregate_checked(&loaded.matches)?;
    println!(
        "Features computed for {} matches across {} teams",
        rows.len(),
        aggregator.teams().len()
    );

    let existing = if retrain {
        None
    } else {
        model_store::load_artifacts(&cfg.models_dir)?
    };
    let artifacts = match existing {
        Some(artifacts) => {
            println!(
                "Loaded model trained at {} on {} rows ({} boosting rounds)",
                artifacts.trained_at,
                artifacts.training_rows,
                artifacts.model.rounds()
            );
            artifacts
        }
        None => {
            println!("Training a new model...");
            let outcome = training::train_and_evaluate(&rows, &cfg.training)?;
            println!(
                "Rows: train={} test={}",
                outcome.train_rows, outcome.test_rows
            );
            print_metrics("held-out", &outcome.evaluation.metrics);
            print_metrics("uniform", &outcome.evaluation.uniform);
            print_metrics("empirical", &outcome.evaluation.empirical);
            println!();
            print!(
                "{}",
                format_report(&outcome.evaluation.class_report, &outcome.evaluation.confusion)
            );
            let path = model_store::save_artifacts(&cfg.models_dir, &outcome.artifacts)?;
            println!("Saved model to {}", path.display());
            outcome.artifacts
        }
    };

    println!();
    let report = run_backtest(&rows, cfg.backtest_cutoff, &cfg.training)?;
    print!("{}", format_summary(&report));

    println!();
    let home = parse_string_arg("--home").unwrap_or_else(|| SAMPLE_HOME.to_string());
    let away = parse_string_arg("--away").unwrap_or_else(|| SAMPLE_AWAY.to_string());
    match predict_fixture(&loaded.matches, &home, &away, &artifacts) {
        Ok(prediction) => {
            println!("Prediction {home} v {away} ({}):", prediction.fixture_date);
            for (result, p) in &prediction.ranked {
                println!("  {:<24} {:>5.1}%", prediction.label(*result), p * 100.0);
            }
        }
        Err(err) => println!("Prediction {home} v {away} failed: {err:#}"),
    }

    Ok(())
}

fn print_metrics(label: &str, metrics: &Metrics) {
    println!(
        "  {label:<10} samples={} brier={:.4} log_loss={:.4} accuracy={:.3}",
        metrics.samples, metrics.brier, metrics.log_loss, metrics.accuracy
    );
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
