use serde::Serialize;

/// An account sending many small transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuringFlag {
    pub account: String,
    pub small_txn_count: usize,
    /// Smallest transaction id among the account's qualifying small transfers.
    pub representative_txn: u64,
}

/// A simple directed cycle of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleFlag {
    /// Rotation-normalized: starts at the lexicographically smallest account
    /// and follows edge direction.
    pub accounts: Vec<String>,
    /// Lowest-id transaction from `accounts[0]` to the next account in the cycle.
    pub representative_txn: u64,
}

/// Outcome of one bounded cycle search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSearch {
    pub cycles: Vec<CycleFlag>,
    /// The exploration cap or deadline was hit; `cycles` is partial.
    pub truncated: bool,
    pub expansions: u64,
}

/// Combined output of the structural detectors for one graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatternReport {
    pub structuring: Vec<StructuringFlag>,
    pub round_trips: CycleSearch,
}
