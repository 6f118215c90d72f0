//! Scorecard snapshots. Captured once, compared, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardDimension {
    pub name: String,
    pub score: f64,
    /// Primary dimensions must never regress.
    #[serde(default)]
    pub is_primary: bool,
}

impl ScorecardDimension {
    pub fn new(name: &str, score: f64, is_primary: bool) -> Self {
        Self {
            name: name.to_string(),
            score,
            is_primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardSnapshot {
    pub id: String,
    pub target_id: String,
    pub captured_at: DateTime<Utc>,
    pub dimensions: Vec<ScorecardDimension>,
    pub overall_score: f64,
}

impl ScorecardSnapshot {
    /// Capture a snapshot; the overall score is the mean of the dimension scores.
    pub fn new(target_id: &str, dimensions: Vec<ScorecardDimension>) -> Self {
        let overall_score = if dimensions.is_empty() {
            0.0
        } else {
            dimensions.iter().map(|d| d.score).sum::<f64>() / dimensions.len() as f64
        };
        Self {
            id: format!("sc-{}", uuid::Uuid::new_v4()),
            target_id: target_id.to_string(),
            captured_at: Utc::now(),
            dimensions,
            overall_score,
        }
    }

    pub fn dimension(&self, name: &str) -> Option<&ScorecardDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Names of primary dimensions in `self` that score lower than in `baseline`.
    ///
    /// Dimensions absent from the baseline cannot regress.
    pub fn regressed_primary(&self, baseline: &ScorecardSnapshot) -> Vec<String> {
        self.dimensions
            .iter()
            .filter(|d| d.is_primary)
            .filter(|d| {
                baseline
                    .dimension(&d.name)
                    .is_some_and(|base| d.score < base.score)
            })
            .map(|d| d.name.clone())
            .collect()
    }
}
