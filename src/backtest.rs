//! Walk-forward check: train on everything before a cut-off date, score
//! everything on or after it.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::feature_schema::FeatureRow;
use crate::match_record::FullTimeResult;
use crate::metrics::{Metrics, Prob3, format_report};
use crate::training::{Evaluation, TrainingConfig, evaluate, filter_min_history, fit_artifacts};

#[derive(Debug, Clone)]
pub struct BacktestPrediction {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub actual: FullTimeResult,
    pub probs: Prob3,
    pub predicted: FullTimeResult,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub cutoff: NaiveDate,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when either side of the cut-off is empty.
    pub evaluation: Option<Evaluation>,
    pub predictions: Vec<BacktestPrediction>,
}

pub fn split_at_cutoff(rows: &[FeatureRow], cutoff: NaiveDate) -> (Vec<FeatureRow>, Vec<FeatureRow>) {
    rows.iter().cloned().partition(|r| r.date < cutoff)
}

/// The model fitted here is throwaway and never persisted.
pub fn run_backtest(
    rows: &[FeatureRow],
    cutoff: NaiveDate,
    cfg: &TrainingConfig,
) -> Result<BacktestReport> {
    let rows = filter_min_history(rows, cfg.min_history);
    let (train, test) = split_at_cutoff(&rows, cutoff);
    info!(%cutoff, train = train.len(), test = test.len(), "backtest split");

    if train.is_empty() || test.is_empty() {
        warn!(%cutoff, "backtest split has an empty side, nothing to evaluate");
        return Ok(BacktestReport {
            cutoff,
            train_rows: train.len(),
            test_rows: test.len(),
            evaluation: None,
            predictions: Vec::new(),
        });
    }

    let artifacts = fit_artifacts(&train, cfg.gbt)?;
    let reference: Vec<FullTimeResult> = train.iter().map(|r| r.result).collect();
    let evaluation = evaluate(&artifacts, &test, &reference);

    let predictions = test
        .iter()
        .zip(&evaluation.predictions)
        .map(|(row, probs)| BacktestPrediction {
            date: row.date,
            home_team: row.home_team.clone(),
            away_team: row.away_team.clone(),
            actual: row.result,
            probs: *probs,
            predicted: probs.argmax(),
        })
        .collect();

    Ok(BacktestReport {
        cutoff,
        train_rows: train.len(),
        test_rows: test.len(),
        evaluation: Some(evaluation),
        predictions,
    })
}

fn metrics_line(out: &mut String, label: &str, m: &Metrics) {
    let _ = writeln!(
        out,
        "  {label:<10} samples={} brier={:.4} log_loss={:.4} accuracy={:.3}",
        m.samples, m.brier, m.log_loss, m.accuracy
    );
}

pub fn format_summary(report: &BacktestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Backtest cut-off: {}", report.cutoff);
    let _ = writeln!(
        out,
        "Rows: train={} test={}",
        report.train_rows, report.test_rows
    );
    let Some(eval) = report.evaluation.as_ref() else {
        let _ = writeln!(out, "Not enough data on both sides of the cut-off to evaluate.");
        return out;
    };
    metrics_line(&mut out, "model", &eval.metrics);
    metrics_line(&mut out, "uniform", &eval.uniform);
    metrics_line(&mut out, "empirical", &eval.empirical);
    let _ = writeln!(out);
    out.push_str(&format_report(&eval.class_report, &eval.confusion));
    out
}
