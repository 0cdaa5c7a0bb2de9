use serde::Serialize;

/// Outlier score for a single transaction.
///
/// `anomaly_score` follows the isolation-forest convention: values lie in
/// `[-1, 0)` and lower means more anomalous.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyScore {
    pub transaction_id: u64,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}
