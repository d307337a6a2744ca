//! Fit-and-evaluate pipeline on aggregated feature rows.

use anyhow::{Result, anyhow};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::feature_schema::{FEATURE_SCHEMA_VERSION, FeatureRow, feature_names};
use crate::gbt::{GbtConfig, GradientBoostedTrees};
use crate::label_encoder::LabelEncoder;
use crate::match_record::FullTimeResult;
use crate::metrics::{
    ClassReport, ConfusionMatrix, Metrics, Prob3, classification_report, confusion_matrix,
    empirical_outcome_probs, evaluate_probs,
};
use crate::model_store::ModelArtifacts;
use crate::outcome_model::OutcomeModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Rows where either side has fewer prior matches are left out.
    pub min_history: u32,
    pub test_fraction: f64,
    pub seed: u64,
    pub gbt: GbtConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_history: 0,
            test_fraction: 0.2,
            seed: 42,
            gbt: GbtConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub uniform: Metrics,
    pub empirical: Metrics,
    pub class_report: Vec<ClassReport>,
    pub confusion: ConfusionMatrix,
    pub predictions: Vec<Prob3>,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub artifacts: ModelArtifacts,
    pub train_rows: usize,
    pub test_rows: usize,
    pub evaluation: Evaluation,
}

pub fn filter_min_history(rows: &[FeatureRow], min_history: u32) -> Vec<FeatureRow> {
    rows.iter()
        .filter(|r| r.min_prior_matches() >= min_history)
        .cloned()
        .collect()
}

pub fn to_design_matrix(rows: &[FeatureRow]) -> (Vec<Vec<f64>>, Vec<FullTimeResult>) {
    let x = rows.iter().map(|r| r.values.to_vec()).collect();
    let y = rows.iter().map(|r| r.result).collect();
    (x, y)
}

/// SHA-256 over the identifying columns, label and feature bits of every row.
pub fn data_fingerprint(rows: &[FeatureRow]) -> String {
    let mut hasher = Sha256::new();
    for r in rows {
        hasher.update(r.date.to_string().as_bytes());
        hasher.update(r.home_team.as_bytes());
        hasher.update([0u8]);
        hasher.update(r.away_team.as_bytes());
        hasher.update([r.result.code() as u8]);
        for v in &r.values {
            hasher.update(v.to_bits().to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Fits on every row given.
pub fn fit_artifacts(rows: &[FeatureRow], gbt: GbtConfig) -> Result<ModelArtifacts> {
    if rows.is_empty() {
        return Err(anyhow!("no feature rows to train on"));
    }
    let (x, labels) = to_design_matrix(rows);
    let encoder = LabelEncoder::fit(&labels)?;
    let y = encoder.transform(&labels)?;

    let mut model = GradientBoostedTrees::new(gbt);
    model.fit(&x, &y, encoder.len())?;

    Ok(ModelArtifacts {
        schema_version: FEATURE_SCHEMA_VERSION,
        feature_names: feature_names(),
        encoder,
        model,
        trained_at: Utc::now().to_rfc3339(),
        training_rows: rows.len(),
        data_fingerprint: data_fingerprint(rows),
    })
}

/// Scores `rows` with the model. The empirical baseline uses the outcome
/// frequencies of `reference` (normally the training rows).
pub fn evaluate(
    artifacts: &ModelArtifacts,
    rows: &[FeatureRow],
    reference: &[FullTimeResult],
) -> Evaluation {
    let outcomes: Vec<FullTimeResult> = rows.iter().map(|r| r.result).collect();
    let predictions: Vec<Prob3> = rows.iter().map(|r| artifacts.predict_probs(r)).collect();
    let predicted: Vec<FullTimeResult> = predictions.iter().map(Prob3::argmax).collect();

    let empirical = empirical_outcome_probs(reference);
    Evaluation {
        metrics: evaluate_probs(&predictions, &outcomes),
        uniform: evaluate_probs(&vec![Prob3::uniform(); rows.len()], &outcomes),
        empirical: evaluate_probs(&vec![empirical; rows.len()], &outcomes),
        class_report: classification_report(&predicted, &outcomes),
        confusion: confusion_matrix(&predicted, &outcomes),
        predictions,
    }
}

/// Seeded shuffle, hold out `test_fraction`, fit on the rest and score the
/// held-out part.
pub fn train_and_evaluate(rows: &[FeatureRow], cfg: &TrainingConfig) -> Result<TrainOutcome> {
    let rows = filter_min_history(rows, cfg.min_history);
    if rows.is_empty() {
        return Err(anyhow!(
            "no feature rows left after requiring {} prior matches",
            cfg.min_history
        ));
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    order.shuffle(&mut rng);

    let test_n = ((rows.len() as f64) * cfg.test_fraction.clamp(0.0, 0.9)).ceil() as usize;
    let test_n = test_n.min(rows.len().saturating_sub(1));
    let (test_idx, train_idx) = order.split_at(test_n);
    let train: Vec<FeatureRow> = train_idx.iter().map(|i| rows[*i].clone()).collect();
    let test: Vec<FeatureRow> = test_idx.iter().map(|i| rows[*i].clone()).collect();

    info!(
        train = train.len(),
        test = test.len(),
        rounds = cfg.gbt.rounds,
        "training outcome model"
    );
    let artifacts = fit_artifacts(&train, cfg.gbt)?;
    let reference: Vec<FullTimeResult> = train.iter().map(|r| r.result).collect();
    let evaluation = evaluate(&artifacts, &test, &reference);
    info!(
        accuracy = evaluation.metrics.accuracy,
        log_loss = evaluation.metrics.log_loss,
        "held-out evaluation"
    );

    Ok(TrainOutcome {
        artifacts,
        train_rows: train.len(),
        test_rows: test.len(),
        evaluation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::build_features;
    use crate::match_record::MatchRecord;
    use chrono::NaiveDate;

    fn season() -> Vec<MatchRecord> {
        let teams = ["Alpha", "Bravo", "Charlie", "Delta"];
        let start = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();
        let mut out = Vec::new();
        let mut day = 0i64;
        for round in 0..6 {
            for i in 0..teams.len() {
                for j in 0..teams.len() {
                    if i == j || (i + j + round) % 2 == 0 {
                        continue;
                    }
                    // Lower index is the stronger side.
                    let (hg, ag) = if i < j { (2, 0) } else if i == j + 1 { (1, 1) } else { (0, 1) };
                    out.push(MatchRecord::new(
                        start + chrono::Duration::days(day),
                        teams[i],
                        teams[j],
                        hg,
                        ag,
                        FullTimeResult::from_goals(hg, ag),
                    ));
                    day += 1;
                }
            }
        }
        out
    }

    fn small_cfg() -> TrainingConfig {
        TrainingConfig {
            gbt: GbtConfig {
                rounds: 10,
                max_depth: 3,
                ..GbtConfig::default()
            },
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn split_sizes_and_report() {
        let rows = build_features(&season());
        let out = train_and_evaluate(&rows, &small_cfg()).unwrap();
        assert_eq!(out.train_rows + out.test_rows, rows.len());
        assert!(out.test_rows > 0);
        assert_eq!(out.evaluation.metrics.samples, out.test_rows);
        assert_eq!(out.artifacts.training_rows, out.train_rows);
        let support: usize = out.evaluation.class_report.iter().map(|r| r.support).sum();
        assert_eq!(support, out.test_rows);
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let rows = build_features(&season());
        let a = data_fingerprint(&rows);
        assert_eq!(a, data_fingerprint(&rows));
        assert_eq!(a.len(), 64);
        assert_ne!(a, data_fingerprint(&rows[1..]));
    }

    #[test]
    fn min_history_filter() {
        let rows = build_features(&season());
        assert_eq!(filter_min_history(&rows, 0).len(), rows.len());
        let kept = filter_min_history(&rows, 2);
        assert!(kept.len() < rows.len());
        assert!(kept.iter().all(|r| r.min_prior_matches() >= 2));
        assert!(train_and_evaluate(&rows, &TrainingConfig {
            min_history: 10_000,
            ..small_cfg()
        })
        .is_err());
    }
}
