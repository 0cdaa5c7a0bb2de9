use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Transaction categories carried by the PaySim-style input.
///
/// The declaration order is the fixed feature encoding used by the anomaly
/// scorer, so it must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Payment,
    Transfer,
    CashOut,
    CashIn,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::Transfer => "TRANSFER",
            Self::CashOut => "CASH_OUT",
            Self::CashIn => "CASH_IN",
            Self::Debit => "DEBIT",
        }
    }

    /// Stable index used as the categorical feature value.
    pub fn code(&self) -> u8 {
        match self {
            Self::Payment => 0,
            Self::Transfer => 1,
            Self::CashOut => 2,
            Self::CashIn => 3,
            Self::Debit => 4,
        }
    }
}

/// A single money movement between two accounts. Immutable once loaded;
/// `id` is unique within the batch it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: u64,
    pub step: u32,
    pub txn_type: TransactionType,
    pub amount: BigDecimal,
    pub source_account: String,
    pub dest_account: String,
    pub is_fraud: Option<bool>,
    pub is_flagged_fraud: Option<bool>,
}

impl Transaction {
    /// Both endpoints are present. Records failing this are skipped by the graph builder.
    pub fn has_endpoints(&self) -> bool {
        !self.source_account.trim().is_empty() && !self.dest_account.trim().is_empty()
    }
}
