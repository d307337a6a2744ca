use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::backtest::BacktestReport;
use crate::match_record::FullTimeResult;
use crate::metrics::{Metrics, Prob3, calibration_bins};

const CALIBRATION_BINS: usize = 10;

pub struct ExportReport {
    pub summary_rows: usize,
    pub predictions: usize,
    pub calibration_rows: usize,
}

pub fn export_backtest(path: &Path, report: &BacktestReport) -> Result<ExportReport> {
    let mut summary_rows = vec![
        vec!["Key".to_string(), "Value".to_string()],
        vec!["Cutoff".to_string(), report.cutoff.to_string()],
        vec!["Train rows".to_string(), report.train_rows.to_string()],
        vec!["Test rows".to_string(), report.test_rows.to_string()],
    ];
    let mut prediction_rows = vec![vec![
        "Date".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Actual".to_string(),
        "Predicted".to_string(),
        "P(H)".to_string(),
        "P(D)".to_string(),
        "P(A)".to_string(),
        "Correct".to_string(),
    ]];
    let mut calibration_rows = vec![vec![
        "Result".to_string(),
        "Bucket".to_string(),
        "Count".to_string(),
        "Avg predicted".to_string(),
        "Actual rate".to_string(),
    ]];

    if let Some(eval) = report.evaluation.as_ref() {
        push_metrics(&mut summary_rows, "Model", &eval.metrics);
        push_metrics(&mut summary_rows, "Uniform", &eval.uniform);
        push_metrics(&mut summary_rows, "Empirical", &eval.empirical);
        for r in &eval.class_report {
            summary_rows.push(vec![
                format!("{} precision/recall/f1", r.result),
                format!("{:.3} / {:.3} / {:.3} (n={})", r.precision, r.recall, r.f1, r.support),
            ]);
        }

        let probs: Vec<Prob3> = report.predictions.iter().map(|p| p.probs).collect();
        let outcomes: Vec<FullTimeResult> = report.predictions.iter().map(|p| p.actual).collect();
        for class in FullTimeResult::ALL {
            for bin in calibration_bins(&probs, &outcomes, class, CALIBRATION_BINS) {
                if bin.count == 0 {
                    continue;
                }
                calibration_rows.push(vec![
                    class.to_string(),
                    format!("{:.1}-{:.1}", bin.bucket_start, bin.bucket_end),
                    bin.count.to_string(),
                    format!("{:.3}", bin.avg_pred),
                    format!("{:.3}", bin.actual_rate),
                ]);
            }
        }
    }

    for p in &report.predictions {
        prediction_rows.push(vec![
            p.date.to_string(),
            p.home_team.clone(),
            p.away_team.clone(),
            p.actual.to_string(),
            p.predicted.to_string(),
            format!("{:.4}", p.probs.home),
            format!("{:.4}", p.probs.draw),
            format!("{:.4}", p.probs.away),
            if p.actual == p.predicted { "yes" } else { "no" }.to_string(),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Predictions")?;
        write_rows(sheet, &prediction_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Calibration")?;
        write_rows(sheet, &calibration_rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        summary_rows: summary_rows.len() - 1,
        predictions: prediction_rows.len() - 1,
        calibration_rows: calibration_rows.len() - 1,
    })
}

fn push_metrics(rows: &mut Vec<Vec<String>>, label: &str, m: &Metrics) {
    rows.push(vec![format!("{label} accuracy"), format!("{:.4}", m.accuracy)]);
    rows.push(vec![format!("{label} log loss"), format!("{:.4}", m.log_loss)]);
    rows.push(vec![format!("{label} brier"), format!("{:.4}", m.brier)]);
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::backtest::{BacktestPrediction, run_backtest};
    use crate::feature_schema::{FEATURE_COUNT, FeatureRow};
    use crate::gbt::GbtConfig;
    use crate::training::TrainingConfig;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 1).unwrap() + chrono::Duration::days(n)
    }

    #[test]
    fn workbook_without_evaluation_keeps_predictions_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bt.xlsx");
        let report = BacktestReport {
            cutoff: day(30),
            train_rows: 0,
            test_rows: 1,
            evaluation: None,
            predictions: vec![BacktestPrediction {
                date: day(31),
                home_team: "Wolves".into(),
                away_team: "Brighton".into(),
                actual: FullTimeResult::Draw,
                probs: Prob3::uniform(),
                predicted: FullTimeResult::HomeWin,
            }],
        };
        let out = export_backtest(&path, &report).unwrap();
        assert_eq!(out.summary_rows, 3);
        assert_eq!(out.predictions, 1);
        assert_eq!(out.calibration_rows, 0);
        assert!(path.exists());
    }

    #[test]
    fn workbook_counts_follow_backtest_report() {
        let rows: Vec<FeatureRow> = (0..60)
            .map(|d| {
                let result = FullTimeResult::ALL[(d % 3) as usize];
                let mut values = [0.0; FEATURE_COUNT];
                values[0] = (d % 3) as f64;
                FeatureRow {
                    home_team: format!("H{}", d % 4),
                    away_team: format!("A{}", d % 5),
                    date: day(d),
                    result,
                    home_matches_prior: 3,
                    away_matches_prior: 3,
                    values,
                }
            })
            .collect();
        let cfg = TrainingConfig {
            gbt: GbtConfig {
                rounds: 5,
                ..GbtConfig::default()
            },
            ..TrainingConfig::default()
        };
        let report = run_backtest(&rows, day(40), &cfg).unwrap();
        assert_eq!(report.test_rows, 20);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bt.xlsx");
        let out = export_backtest(&path, &report).unwrap();
        // Header facts, metric lines per baseline, then one line per class.
        assert_eq!(out.summary_rows, 3 + 9 + 3);
        assert_eq!(out.predictions, report.predictions.len());
        assert!(out.calibration_rows > 0);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
