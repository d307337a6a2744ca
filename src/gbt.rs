//! Multiclass gradient-boosted regression trees with a softmax objective.
//!
//! Each round grows one tree per class on the second-order statistics of the
//! softmax loss. Split search works on per-feature histograms (feature values
//! quantized to at most `max_bins` buckets before fitting) and runs in
//! parallel across features.

use anyhow::{Result, anyhow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::outcome_model::OutcomeModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbtConfig {
    pub rounds: usize,
    pub eta: f64,
    pub max_depth: usize,
    pub lambda: f64,
    pub min_child_weight: f64,
    pub gamma: f64,
    pub max_bins: usize,
}

impl Default for GbtConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            eta: 0.3,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
            gamma: 0.0,
            max_bins: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    idx = if v < *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    config: GbtConfig,
    n_classes: usize,
    n_features: usize,
    base_scores: Vec<f64>,
    /// `rounds[r][k]` is the tree for class `k` in round `r`.
    rounds: Vec<Vec<Tree>>,
}

impl GradientBoostedTrees {
    pub fn new(config: GbtConfig) -> Self {
        Self {
            config,
            n_classes: 0,
            n_features: 0,
            base_scores: Vec::new(),
            rounds: Vec::new(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn rounds(&self) -> usize {
        self.rounds.len()
    }

    fn raw_scores(&self, x: &[f64]) -> Vec<f64> {
        let mut raw = self.base_scores.clone();
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                raw[k] += tree.predict(x);
            }
        }
        raw
    }
}

impl OutcomeModel for GradientBoostedTrees {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Result<()> {
        if features.is_empty() {
            return Err(anyhow!("cannot fit on an empty training set"));
        }
        if features.len() != labels.len() {
            return Err(anyhow!(
                "feature rows ({}) and labels ({}) differ in length",
                features.len(),
                labels.len()
            ));
        }
        if n_classes == 0 {
            return Err(anyhow!("n_classes must be positive"));
        }
        if let Some(bad) = labels.iter().find(|l| **l >= n_classes) {
            return Err(anyhow!("label index {bad} out of range for {n_classes} classes"));
        }
        let n_features = features[0].len();
        if features.iter().any(|row| row.len() != n_features) {
            return Err(anyhow!("feature rows have inconsistent widths"));
        }

        let cfg = self.config;
        let n = features.len();
        let binned = BinnedMatrix::build(features, cfg.max_bins.clamp(2, 255));

        let mut counts = vec![0usize; n_classes];
        for l in labels {
            counts[*l] += 1;
        }
        let base_scores: Vec<f64> = counts
            .iter()
            .map(|c| ((*c as f64 + 1.0) / (n as f64 + n_classes as f64)).ln())
            .collect();

        let mut raw: Vec<Vec<f64>> = vec![base_scores.clone(); n];
        let mut rounds = Vec::with_capacity(cfg.rounds);
        let mut grad = vec![0.0_f64; n];
        let mut hess = vec![0.0_f64; n];
        let all_rows: Vec<usize> = (0..n).collect();

        for round in 0..cfg.rounds {
            let probs: Vec<Vec<f64>> = raw.iter().map(|r| softmax(r)).collect();
            let mut trees = Vec::with_capacity(n_classes);
            for k in 0..n_classes {
                for i in 0..n {
                    let y = if labels[i] == k { 1.0 } else { 0.0 };
                    let p = probs[i][k];
                    grad[i] = p - y;
                    hess[i] = (p * (1.0 - p)).max(1e-16);
                }
                let tree = TreeBuilder {
                    binned: &binned,
                    grad: &grad,
                    hess: &hess,
                    cfg: &cfg,
                    nodes: Vec::new(),
                }
                .build(all_rows.clone());
                for (i, row) in features.iter().enumerate() {
                    raw[i][k] += tree.predict(row);
                }
                trees.push(tree);
            }
            if round % 25 == 0 {
                debug!(round, leaves = trees.iter().map(Tree::leaves).sum::<usize>(), "boosting round");
            }
            rounds.push(trees);
        }

        self.n_classes = n_classes;
        self.n_features = n_features;
        self.base_scores = base_scores;
        self.rounds = rounds;
        Ok(())
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        if self.n_classes == 0 {
            return Vec::new();
        }
        softmax(&self.raw_scores(features))
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn softmax(raw: &[f64]) -> Vec<f64> {
    let mx = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = raw.iter().map(|v| (v - mx).exp()).collect();
    let den = exps.iter().sum::<f64>().max(1e-300);
    exps.into_iter().map(|e| e / den).collect()
}

/// Row-major bucket codes plus the cut points separating buckets. A value `v`
/// of feature `f` lands in bucket `#{c in cuts[f] : c <= v}`.
struct BinnedMatrix {
    codes: Vec<u8>,
    n_features: usize,
    cuts: Vec<Vec<f64>>,
}

impl BinnedMatrix {
    fn build(features: &[Vec<f64>], max_bins: usize) -> Self {
        let n_features = features[0].len();
        let cuts: Vec<Vec<f64>> = (0..n_features)
            .into_par_iter()
            .map(|f| feature_cuts(features.iter().map(|row| row[f]), max_bins))
            .collect();

        let mut codes = Vec::with_capacity(features.len() * n_features);
        for row in features {
            for (f, v) in row.iter().enumerate() {
                codes.push(cuts[f].partition_point(|c| *c <= *v) as u8);
            }
        }
        Self {
            codes,
            n_features,
            cuts,
        }
    }

    fn code(&self, row: usize, feature: usize) -> usize {
        self.codes[row * self.n_features + feature] as usize
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }
}

fn feature_cuts(values: impl Iterator<Item = f64>, max_bins: usize) -> Vec<f64> {
    let mut distinct: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    if distinct.len() < 2 {
        return Vec::new();
    }

    let mut cuts = Vec::new();
    if distinct.len() <= max_bins {
        for pair in distinct.windows(2) {
            cuts.push((pair[0] + pair[1]) / 2.0);
        }
    } else {
        for q in 1..max_bins {
            let idx = (q * distinct.len() / max_bins).max(1);
            cuts.push((distinct[idx - 1] + distinct[idx]) / 2.0);
        }
        cuts.dedup();
    }
    cuts
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    gain: f64,
    feature: usize,
    /// Last bucket on the left side.
    bin: usize,
}

struct TreeBuilder<'a> {
    binned: &'a BinnedMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    cfg: &'a GbtConfig,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(mut self, rows: Vec<usize>) -> Tree {
        self.grow(rows, 0);
        Tree { nodes: self.nodes }
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let g: f64 = rows.iter().map(|i| self.grad[*i]).sum();
        let h: f64 = rows.iter().map(|i| self.hess[*i]).sum();
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: -g / (h + self.cfg.lambda) * self.cfg.eta,
        });

        if depth >= self.cfg.max_depth || rows.len() < 2 {
            return id;
        }
        let Some(best) = self.best_split(&rows, g, h) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|i| self.binned.code(*i, best.feature) <= best.bin);
        if left_rows.is_empty() || right_rows.is_empty() {
            return id;
        }

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: self.binned.cuts[best.feature][best.bin],
            left,
            right,
        };
        id
    }

    fn best_split(&self, rows: &[usize], g_total: f64, h_total: f64) -> Option<SplitCandidate> {
        let cfg = self.cfg;
        let parent_score = g_total * g_total / (h_total + cfg.lambda);

        (0..self.binned.n_features)
            .into_par_iter()
            .filter_map(|f| {
                let bins = self.binned.n_bins(f);
                if bins < 2 {
                    return None;
                }
                let mut hist_g = vec![0.0_f64; bins];
                let mut hist_h = vec![0.0_f64; bins];
                for i in rows {
                    let b = self.binned.code(*i, f);
                    hist_g[b] += self.grad[*i];
                    hist_h[b] += self.hess[*i];
                }

                let mut best: Option<SplitCandidate> = None;
                let mut gl = 0.0_f64;
                let mut hl = 0.0_f64;
                for b in 0..bins - 1 {
                    gl += hist_g[b];
                    hl += hist_h[b];
                    let gr = g_total - gl;
                    let hr = h_total - hl;
                    if hl < cfg.min_child_weight || hr < cfg.min_child_weight {
                        continue;
                    }
                    let gain = 0.5
                        * (gl * gl / (hl + cfg.lambda) + gr * gr / (hr + cfg.lambda)
                            - parent_score)
                        - cfg.gamma;
                    if gain > 1e-12 && best.is_none_or(|cur| gain > cur.gain) {
                        best = Some(SplitCandidate {
                            gain,
                            feature: f,
                            bin: b,
                        });
                    }
                }
                best
            })
            .reduce_with(|a, b| {
                if b.gain > a.gain || (b.gain == a.gain && b.feature < a.feature) {
                    b
                } else {
                    a
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_dataset() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..90 {
            let v = i as f64 / 10.0;
            x.push(vec![v, (i % 7) as f64]);
            y.push(if v < 3.0 {
                0
            } else if v < 6.0 {
                1
            } else {
                2
            });
        }
        (x, y)
    }

    #[test]
    fn learns_threshold_classes() {
        let (x, y) = toy_dataset();
        let mut model = GradientBoostedTrees::new(GbtConfig {
            rounds: 20,
            max_depth: 3,
            ..GbtConfig::default()
        });
        model.fit(&x, &y, 3).unwrap();
        assert_eq!(model.predict(&[1.0, 0.0]), 0);
        assert_eq!(model.predict(&[4.5, 3.0]), 1);
        assert_eq!(model.predict(&[8.0, 6.0]), 2);
        let p = model.predict_proba(&[4.5, 3.0]);
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let mut model = GradientBoostedTrees::new(GbtConfig::default());
        assert!(model.fit(&[], &[], 3).is_err());
        assert!(model.fit(&[vec![1.0]], &[0, 1], 3).is_err());
        assert!(model.fit(&[vec![1.0]], &[5], 3).is_err());
    }

    #[test]
    fn constant_feature_has_no_cuts() {
        assert!(feature_cuts([2.0, 2.0, 2.0].into_iter(), 64).is_empty());
        let cuts = feature_cuts((0..1000).map(|v| v as f64), 8);
        assert_eq!(cuts.len(), 7);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
    }
}
