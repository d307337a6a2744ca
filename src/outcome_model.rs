use anyhow::Result;

use crate::label_encoder::LabelEncoder;
use crate::metrics::Prob3;

/// Multiclass classifier over dense feature rows. Class indices are the ones
/// produced by a [`LabelEncoder`].
pub trait OutcomeModel {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Result<()>;

    /// One probability per class index, summing to 1.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;

    fn n_classes(&self) -> usize;

    fn predict(&self, features: &[f64]) -> usize {
        let probs = self.predict_proba(features);
        let mut best = 0usize;
        for (idx, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = idx;
            }
        }
        best
    }
}

/// Places class-indexed probabilities on the home/draw/away axes. Results
/// the encoder never saw get probability 0.
pub fn decode_probs(probs: &[f64], encoder: &LabelEncoder) -> Prob3 {
    let mut out = Prob3::zero();
    for (idx, p) in probs.iter().enumerate() {
        if let Some(result) = encoder.decode(idx) {
            out.set(result, *p);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::FullTimeResult::*;

    #[test]
    fn decode_follows_encoder_order() {
        let enc = LabelEncoder::fit(&[HomeWin, Draw, AwayWin]).unwrap();
        let p = decode_probs(&[0.2, 0.3, 0.5], &enc);
        assert!((p.away - 0.2).abs() < 1e-12);
        assert!((p.draw - 0.3).abs() < 1e-12);
        assert!((p.home - 0.5).abs() < 1e-12);
    }

    #[test]
    fn missing_class_gets_zero() {
        let enc = LabelEncoder::fit(&[HomeWin, AwayWin]).unwrap();
        let p = decode_probs(&[0.4, 0.6], &enc);
        assert_eq!(p.draw, 0.0);
        assert!((p.home - 0.6).abs() < 1e-12);
    }
}
