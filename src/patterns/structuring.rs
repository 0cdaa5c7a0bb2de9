use bigdecimal::{BigDecimal, FromPrimitive};

use crate::error::DetectionError;
use crate::graph::builder::TransactionGraph;

use super::types::StructuringFlag;

#[derive(Debug, Clone)]
pub struct StructuringParams {
    /// Qualifying edges needed to flag an account (inclusive).
    pub min_count: usize,
    /// A transfer is "small" when its amount is strictly below this.
    pub max_amount: BigDecimal,
}

impl StructuringParams {
    pub fn new(min_count: usize, max_amount: f64) -> Result<Self, DetectionError> {
        if min_count == 0 {
            return Err(DetectionError::InvalidParameter {
                name: "min_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if !max_amount.is_finite() || max_amount < 0.0 {
            return Err(DetectionError::InvalidParameter {
                name: "max_amount",
                reason: format!("must be a finite non-negative amount, got {}", max_amount),
            });
        }
        let max_amount =
            BigDecimal::from_f64(max_amount).ok_or_else(|| DetectionError::InvalidParameter {
                name: "max_amount",
                reason: format!("cannot represent {} as a decimal", max_amount),
            })?;
        Ok(Self {
            min_count,
            max_amount,
        })
    }
}

impl Default for StructuringParams {
    fn default() -> Self {
        Self {
            min_count: 5,
            max_amount: BigDecimal::from(5000),
        }
    }
}

/// Flag every account with at least `min_count` outgoing transfers below
/// `max_amount`. Results are ordered by account name. A graph with fewer
/// than two accounts has no counterparties and yields nothing.
pub fn detect_structuring(
    graph: &TransactionGraph,
    params: &StructuringParams,
) -> Vec<StructuringFlag> {
    let mut flags = Vec::new();
    if graph.account_count() < 2 {
        return flags;
    }

    for account in graph.accounts_by_name() {
        if graph.out_degree(account) < params.min_count {
            continue;
        }

        let mut small_txn_count = 0usize;
        let mut representative: Option<u64> = None;
        for edge in graph.out_edges(account) {
            if edge.amount < params.max_amount {
                small_txn_count += 1;
                representative = Some(match representative {
                    Some(id) => id.min(edge.transaction_id),
                    None => edge.transaction_id,
                });
            }
        }

        if let Some(representative_txn) = representative {
            if small_txn_count >= params.min_count {
                flags.push(StructuringFlag {
                    account: graph.account_name(account).to_string(),
                    small_txn_count,
                    representative_txn,
                });
            }
        }
    }

    tracing::info!(flags = flags.len(), "Structuring scan complete");
    flags
}
