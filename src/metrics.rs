use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::match_record::FullTimeResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassReport {
    pub result: FullTimeResult,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Rows are actual results, columns predicted, both in `FullTimeResult::ALL`
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 3]; 3],
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn get(&self, result: FullTimeResult) -> f64 {
        match result {
            FullTimeResult::HomeWin => self.home,
            FullTimeResult::Draw => self.draw,
            FullTimeResult::AwayWin => self.away,
        }
    }

    pub fn set(&mut self, result: FullTimeResult, p: f64) {
        match result {
            FullTimeResult::HomeWin => self.home = p,
            FullTimeResult::Draw => self.draw = p,
            FullTimeResult::AwayWin => self.away = p,
        }
    }

    pub fn zero() -> Self {
        Self {
            home: 0.0,
            draw: 0.0,
            away: 0.0,
        }
    }

    /// Ties go to home, then draw.
    pub fn argmax(&self) -> FullTimeResult {
        if self.home >= self.draw && self.home >= self.away {
            FullTimeResult::HomeWin
        } else if self.draw >= self.away {
            FullTimeResult::Draw
        } else {
            FullTimeResult::AwayWin
        }
    }
}

pub fn empirical_outcome_probs(outcomes: &[FullTimeResult]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::uniform();
    }

    let mut home = 0usize;
    let mut draw = 0usize;
    let mut away = 0usize;
    for outcome in outcomes {
        match outcome {
            FullTimeResult::HomeWin => home += 1,
            FullTimeResult::Draw => draw += 1,
            FullTimeResult::AwayWin => away += 1,
        }
    }
    let n = outcomes.len() as f64;
    Prob3 {
        home: home as f64 / n,
        draw: draw as f64 / n,
        away: away as f64 / n,
    }
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[FullTimeResult]) -> Metrics {
    if predictions.is_empty() || outcomes.is_empty() || predictions.len() != outcomes.len() {
        return Metrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let y = one_hot(*outcome);
        brier_sum +=
            (p.home - y.home).powi(2) + (p.draw - y.draw).powi(2) + (p.away - y.away).powi(2);

        let actual_prob = p.get(*outcome).clamp(1e-12, 1.0);
        log_loss_sum += -actual_prob.ln();

        if p.argmax() == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

pub fn confusion_matrix(predicted: &[FullTimeResult], actual: &[FullTimeResult]) -> ConfusionMatrix {
    let mut m = ConfusionMatrix::default();
    for (p, a) in predicted.iter().zip(actual) {
        m.counts[class_pos(*a)][class_pos(*p)] += 1;
    }
    m
}

pub fn classification_report(
    predicted: &[FullTimeResult],
    actual: &[FullTimeResult],
) -> Vec<ClassReport> {
    let m = confusion_matrix(predicted, actual);
    FullTimeResult::ALL
        .iter()
        .map(|&result| {
            let i = class_pos(result);
            let tp = m.counts[i][i] as f64;
            let predicted_n: usize = (0..3).map(|r| m.counts[r][i]).sum();
            let support: usize = m.counts[i].iter().sum();
            let precision = safe_div(tp, predicted_n as f64);
            let recall = safe_div(tp, support as f64);
            let f1 = safe_div(2.0 * precision * recall, precision + recall);
            ClassReport {
                result,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

/// Plain-text report in the usual precision/recall/f1/support layout.
pub fn format_report(reports: &[ClassReport], confusion: &ConfusionMatrix) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>10} {:>10} {:>10} {:>10} {:>10}",
        "", "precision", "recall", "f1-score", "support"
    );
    for r in reports {
        let _ = writeln!(
            out,
            "{:>10} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            r.result.code(),
            r.precision,
            r.recall,
            r.f1,
            r.support
        );
    }
    let total: usize = reports.iter().map(|r| r.support).sum();
    if !reports.is_empty() {
        let n = reports.len() as f64;
        let _ = writeln!(
            out,
            "{:>10} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "macro avg",
            reports.iter().map(|r| r.precision).sum::<f64>() / n,
            reports.iter().map(|r| r.recall).sum::<f64>() / n,
            reports.iter().map(|r| r.f1).sum::<f64>() / n,
            total
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "confusion (rows actual, cols predicted: H D A)");
    for (i, row) in confusion.counts.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {} [{:>5} {:>5} {:>5}]",
            FullTimeResult::ALL[i].code(),
            row[0],
            row[1],
            row[2]
        );
    }
    out
}

pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[FullTimeResult],
    class: FullTimeResult,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let class_prob = p.get(class).clamp(0.0, 1.0);
        let idx = ((class_prob * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += class_prob;
        if *outcome == class {
            actual_sum[idx] += 1.0;
        }
    }

    let mut out = Vec::with_capacity(bins);
    for i in 0..bins {
        let start = i as f64 / bins as f64;
        let end = (i + 1) as f64 / bins as f64;
        let count = counts[i];
        let (avg_pred, actual_rate) = if count > 0 {
            (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
        } else {
            (0.0, 0.0)
        };
        out.push(CalibrationBin {
            bucket_start: start,
            bucket_end: end,
            count,
            avg_pred,
            actual_rate,
        });
    }
    out
}

fn class_pos(result: FullTimeResult) -> usize {
    match result {
        FullTimeResult::HomeWin => 0,
        FullTimeResult::Draw => 1,
        FullTimeResult::AwayWin => 2,
    }
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

fn one_hot(outcome: FullTimeResult) -> Prob3 {
    let mut p = Prob3::zero();
    p.set(outcome, 1.0);
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_have_zero_brier() {
        let preds = vec![
            Prob3 {
                home: 1.0,
                draw: 0.0,
                away: 0.0,
            },
            Prob3 {
                home: 0.0,
                draw: 1.0,
                away: 0.0,
            },
            Prob3 {
                home: 0.0,
                draw: 0.0,
                away: 1.0,
            },
        ];
        let outcomes = vec![
            FullTimeResult::HomeWin,
            FullTimeResult::Draw,
            FullTimeResult::AwayWin,
        ];
        let m = evaluate_probs(&preds, &outcomes);
        assert_eq!(m.samples, 3);
        assert!(m.brier < 1e-12);
        assert!((m.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn report_counts_precision_and_recall() {
        use FullTimeResult::*;
        let actual = [HomeWin, HomeWin, Draw, AwayWin];
        let predicted = [HomeWin, Draw, Draw, HomeWin];
        let cm = confusion_matrix(&predicted, &actual);
        assert_eq!(cm.counts[0], [1, 1, 0]);
        assert_eq!(cm.counts[2], [1, 0, 0]);

        let rep = classification_report(&predicted, &actual);
        let home = rep[0];
        assert!((home.precision - 0.5).abs() < 1e-12);
        assert!((home.recall - 0.5).abs() < 1e-12);
        assert_eq!(home.support, 2);
        let away = rep[2];
        assert_eq!(away.precision, 0.0);
        assert_eq!(away.f1, 0.0);
        assert!(format_report(&rep, &cm).contains("macro avg"));
    }

    #[test]
    fn empirical_probs_follow_frequencies() {
        use FullTimeResult::*;
        let p = empirical_outcome_probs(&[HomeWin, HomeWin, Draw, AwayWin]);
        assert!((p.home - 0.5).abs() < 1e-12);
        assert!((p.draw - 0.25).abs() < 1e-12);
    }
}
