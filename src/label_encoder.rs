use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::match_record::FullTimeResult;

/// Maps result labels to dense class indices. Classes are the distinct labels
/// seen at fit time ordered by result code (`A`, `D`, `H`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<FullTimeResult>,
}

impl LabelEncoder {
    pub fn fit(labels: &[FullTimeResult]) -> Result<Self> {
        let mut classes: Vec<FullTimeResult> = labels.to_vec();
        classes.sort_by_key(|r| r.code());
        classes.dedup();
        if classes.is_empty() {
            return Err(anyhow!("cannot fit label encoder on an empty label set"));
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[FullTimeResult] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: FullTimeResult) -> Option<usize> {
        self.classes.iter().position(|c| *c == label)
    }

    pub fn decode(&self, idx: usize) -> Option<FullTimeResult> {
        self.classes.get(idx).copied()
    }

    pub fn transform(&self, labels: &[FullTimeResult]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|l| {
                self.encode(*l)
                    .ok_or_else(|| anyhow!("label {l} was not seen when the encoder was fit"))
            })
            .collect()
    }
}
