use bigdecimal::ToPrimitive;

use crate::ingest::types::Transaction;

pub const FEATURE_COUNT: usize = 3;

/// `(step, amount, type_code)` for one transaction. The type code is the
/// fixed enumeration index, never fit from the batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub transaction_id: u64,
    pub values: [f64; FEATURE_COUNT],
}

pub fn build_features(transactions: &[Transaction]) -> Vec<FeatureVector> {
    transactions
        .iter()
        .map(|txn| FeatureVector {
            transaction_id: txn.id,
            values: [
                f64::from(txn.step),
                amount_feature(txn),
                f64::from(txn.txn_type.code()),
            ],
        })
        .collect()
}

/// Amounts beyond f64 range saturate to `f64::MAX` so split ranges stay finite.
fn amount_feature(txn: &Transaction) -> f64 {
    txn.amount
        .to_f64()
        .filter(|v| v.is_finite())
        .unwrap_or(f64::MAX)
}
