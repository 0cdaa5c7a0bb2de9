use std::collections::BTreeMap;

use crate::anomaly::types::AnomalyScore;
use crate::patterns::types::{CycleFlag, StructuringFlag};

use super::types::{DetectorKind, FlaggedCase};

/// Merge detector outputs into one case list.
///
/// At most one case is kept per `(transaction_id, detector)`; the first
/// reason seen wins. A transaction hit by several detectors gets one case per
/// detector. Output is sorted by `(detector priority, transaction_id)` and
/// `order_key` is the position in that order.
pub fn merge(
    structuring: &[StructuringFlag],
    cycles: &[CycleFlag],
    anomalies: &[AnomalyScore],
) -> Vec<FlaggedCase> {
    let mut by_key: BTreeMap<(u8, u64), (DetectorKind, String)> = BTreeMap::new();

    let mut insert = |detector: DetectorKind, transaction_id: u64, reason: String| {
        by_key
            .entry((detector.priority(), transaction_id))
            .or_insert((detector, reason));
    };

    for flag in structuring {
        insert(
            DetectorKind::Structuring,
            flag.representative_txn,
            format!(
                "Smurfing detected: account {} sent {} small transactions",
                flag.account, flag.small_txn_count
            ),
        );
    }

    for cycle in cycles {
        insert(
            DetectorKind::RoundTripping,
            cycle.representative_txn,
            format!("Round-tripping in cycle [{}]", cycle.accounts.join(" -> ")),
        );
    }

    for score in anomalies.iter().filter(|s| s.is_anomaly) {
        insert(
            DetectorKind::Anomaly,
            score.transaction_id,
            format!("Anomaly detected (score: {:.4})", score.anomaly_score),
        );
    }

    let cases: Vec<FlaggedCase> = by_key
        .into_iter()
        .enumerate()
        .map(|(order, ((_, transaction_id), (detector, reason)))| FlaggedCase {
            transaction_id,
            detector,
            reason,
            order_key: order as u64,
        })
        .collect();

    tracing::info!(cases = cases.len(), "Flagged cases merged");
    cases
}
