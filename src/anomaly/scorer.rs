use crate::config::AnomalyConfig;
use crate::error::DetectionError;
use crate::ingest::types::Transaction;

use super::features::{self, FeatureVector};
use super::forest::{ForestParams, IsolationForest};
use super::types::AnomalyScore;

/// Smallest node the ensemble will still try to split.
pub const MIN_LEAF_SAMPLES: usize = 2;

#[derive(Debug, Clone)]
pub struct ScorerParams {
    pub contamination_ratio: f64,
    pub random_seed: u64,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub min_batch_size: usize,
}

impl Default for ScorerParams {
    fn default() -> Self {
        Self {
            contamination_ratio: 0.01,
            random_seed: 42,
            n_estimators: 100,
            max_samples: 256,
            min_batch_size: 16,
        }
    }
}

/// Unsupervised outlier scorer. A fresh forest is fit on every call; nothing
/// is carried over between batches.
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    params: ScorerParams,
}

impl AnomalyScorer {
    pub fn new(params: ScorerParams) -> Result<Self, DetectionError> {
        if !(params.contamination_ratio > 0.0 && params.contamination_ratio <= 0.5) {
            return Err(DetectionError::InvalidParameter {
                name: "contamination_ratio",
                reason: format!("must be in (0, 0.5], got {}", params.contamination_ratio),
            });
        }
        if params.n_estimators == 0 {
            return Err(DetectionError::InvalidParameter {
                name: "n_estimators",
                reason: "must be at least 1".to_string(),
            });
        }
        if params.max_samples < MIN_LEAF_SAMPLES {
            return Err(DetectionError::InvalidParameter {
                name: "max_samples",
                reason: format!("must be at least {}", MIN_LEAF_SAMPLES),
            });
        }
        if params.min_batch_size <= MIN_LEAF_SAMPLES {
            return Err(DetectionError::InvalidParameter {
                name: "min_batch_size",
                reason: format!("must exceed {}", MIN_LEAF_SAMPLES),
            });
        }
        Ok(Self { params })
    }

    pub fn from_config(config: &AnomalyConfig) -> Result<Self, DetectionError> {
        Self::new(ScorerParams {
            contamination_ratio: config.contamination_ratio,
            random_seed: config.random_seed,
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            min_batch_size: config.min_batch_size,
        })
    }

    /// Score every transaction, in input order.
    ///
    /// An empty batch scores to nothing. A non-empty batch smaller than
    /// `min_batch_size` is rejected rather than scored degenerately.
    pub fn score(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyScore>, DetectionError> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        if transactions.len() < self.params.min_batch_size {
            return Err(DetectionError::InsufficientData {
                required: self.params.min_batch_size,
                actual: transactions.len(),
            });
        }

        let features = features::build_features(transactions);
        let points: Vec<_> = features.iter().map(|f| f.values).collect();
        let forest = IsolationForest::fit(
            &points,
            &ForestParams {
                n_estimators: self.params.n_estimators,
                max_samples: self.params.max_samples,
                seed: self.params.random_seed,
            },
        );

        let mut scores: Vec<AnomalyScore> = features
            .iter()
            .map(|f: &FeatureVector| AnomalyScore {
                transaction_id: f.transaction_id,
                anomaly_score: forest.score(&f.values),
                is_anomaly: false,
            })
            .collect();

        let flagged = self.label_lowest(&mut scores);
        tracing::info!(
            transactions = scores.len(),
            anomalies = flagged,
            seed = self.params.random_seed,
            "Anomaly scoring complete"
        );

        Ok(scores)
    }

    /// Mark the `ceil(contamination_ratio * n)` lowest scores as anomalous.
    /// Ties are broken by transaction id.
    fn label_lowest(&self, scores: &mut [AnomalyScore]) -> usize {
        let n = scores.len();
        // Guard against 0.01 * 100 landing a hair above 1.0.
        let raw = self.params.contamination_ratio * n as f64 - 1e-9;
        let count = (raw.ceil().max(0.0) as usize).min(n);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            scores[a]
                .anomaly_score
                .total_cmp(&scores[b].anomaly_score)
                .then(scores[a].transaction_id.cmp(&scores[b].transaction_id))
        });
        for &i in order.iter().take(count) {
            scores[i].is_anomaly = true;
        }
        count
    }
}
