use std::time::Instant;

use crate::error::DetectionError;
use crate::graph::builder::TransactionGraph;

use super::types::{CycleFlag, CycleSearch};

const DEFAULT_EXPLORATION_CAP: u64 = 1_000_000;

/// How often (in edge expansions) the wall-clock deadline is consulted.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
pub struct RoundTripParams {
    /// Longest cycle reported, counted in accounts (inclusive).
    pub max_cycle_length: usize,
    /// Hard bound on edge expansions across the whole search.
    pub exploration_cap: u64,
}

impl RoundTripParams {
    pub fn new(max_cycle_length: usize, exploration_cap: u64) -> Result<Self, DetectionError> {
        if max_cycle_length == 0 {
            return Err(DetectionError::InvalidParameter {
                name: "max_cycle_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if exploration_cap == 0 {
            return Err(DetectionError::InvalidParameter {
                name: "exploration_cap",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            max_cycle_length,
            exploration_cap,
        })
    }
}

impl Default for RoundTripParams {
    fn default() -> Self {
        Self {
            max_cycle_length: 3,
            exploration_cap: DEFAULT_EXPLORATION_CAP,
        }
    }
}

/// Depth-bounded DFS state shared across all start accounts.
///
/// Each search starting at account `s` only walks through accounts ranked
/// after `s` by name, so every cycle is found exactly once, from its smallest
/// account, already in canonical rotation.
struct BoundedSearch<'a> {
    graph: &'a TransactionGraph,
    params: &'a RoundTripParams,
    deadline: Option<Instant>,
    rank: Vec<usize>,
    successors: Vec<Vec<usize>>,
    on_path: Vec<bool>,
    path: Vec<usize>,
    expansions: u64,
    truncated: bool,
    found: Vec<Vec<usize>>,
}

impl<'a> BoundedSearch<'a> {
    fn new(
        graph: &'a TransactionGraph,
        params: &'a RoundTripParams,
        deadline: Option<Instant>,
        order: &[usize],
    ) -> Self {
        let n = graph.account_count();
        let mut rank = vec![0usize; n];
        for (r, &idx) in order.iter().enumerate() {
            rank[idx] = r;
        }

        // Parallel edges collapse to one successor; cycles are node sequences.
        let successors: Vec<Vec<usize>> = (0..n)
            .map(|v| {
                let mut next: Vec<usize> = graph.out_edges(v).map(|e| e.dest).collect();
                next.sort_by_key(|&w| rank[w]);
                next.dedup();
                next
            })
            .collect();

        Self {
            graph,
            params,
            deadline,
            rank,
            successors,
            on_path: vec![false; n],
            path: Vec::with_capacity(params.max_cycle_length),
            expansions: 0,
            truncated: false,
            found: Vec::new(),
        }
    }

    fn run_from(&mut self, start: usize) {
        self.path.push(start);
        self.on_path[start] = true;
        self.extend(start, start);
        self.on_path[start] = false;
        self.path.pop();
    }

    fn extend(&mut self, start: usize, node: usize) {
        for i in 0..self.successors[node].len() {
            if self.truncated {
                return;
            }
            if self.budget_exhausted() {
                self.truncated = true;
                return;
            }
            self.expansions += 1;

            let next = self.successors[node][i];
            if next == start {
                // A self-transfer is not a round trip.
                if self.path.len() > 1 {
                    self.found.push(self.path.clone());
                }
                continue;
            }
            if self.rank[next] < self.rank[start]
                || self.on_path[next]
                || self.path.len() >= self.params.max_cycle_length
            {
                continue;
            }

            self.path.push(next);
            self.on_path[next] = true;
            self.extend(start, next);
            self.on_path[next] = false;
            self.path.pop();
        }
    }

    fn budget_exhausted(&self) -> bool {
        if self.expansions >= self.params.exploration_cap {
            return true;
        }
        match self.deadline {
            Some(deadline) if self.expansions % DEADLINE_CHECK_INTERVAL == 0 => {
                Instant::now() >= deadline
            }
            _ => false,
        }
    }

    fn representative_txn(&self, cycle: &[usize]) -> Option<u64> {
        let from = cycle[0];
        let to = cycle[1 % cycle.len()];
        self.graph
            .out_edges(from)
            .filter(|e| e.dest == to)
            .map(|e| e.transaction_id)
            .min()
    }
}

/// Enumerate simple directed cycles of two to `max_cycle_length` accounts.
/// Self-transfers never form a cycle.
///
/// Never fails: when the exploration cap or the optional deadline is reached,
/// the cycles found so far are returned with `truncated` set.
pub fn detect_round_trips(
    graph: &TransactionGraph,
    params: &RoundTripParams,
    deadline: Option<Instant>,
) -> CycleSearch {
    if graph.account_count() < 2 {
        return CycleSearch::default();
    }

    let order = graph.accounts_by_name();
    let mut search = BoundedSearch::new(graph, params, deadline, &order);

    for &start in &order {
        if search.truncated {
            break;
        }
        search.run_from(start);
    }

    let mut cycles = Vec::with_capacity(search.found.len());
    for cycle in &search.found {
        if let Some(representative_txn) = search.representative_txn(cycle) {
            cycles.push(CycleFlag {
                accounts: cycle
                    .iter()
                    .map(|&idx| graph.account_name(idx).to_string())
                    .collect(),
                representative_txn,
            });
        }
    }

    if search.truncated {
        tracing::warn!(
            expansions = search.expansions,
            cap = params.exploration_cap,
            cycles = cycles.len(),
            "Cycle search truncated, returning partial results"
        );
    } else {
        tracing::info!(
            expansions = search.expansions,
            cycles = cycles.len(),
            "Round-tripping scan complete"
        );
    }

    CycleSearch {
        cycles,
        truncated: search.truncated,
        expansions: search.expansions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Transaction, TransactionType};
    use bigdecimal::BigDecimal;

    fn txn(id: u64, src: &str, dst: &str, amount: i64) -> Transaction {
        Transaction {
            id,
            step: 1,
            txn_type: TransactionType::Transfer,
            amount: BigDecimal::from(amount),
            source_account: src.to_string(),
            dest_account: dst.to_string(),
            is_fraud: None,
            is_flagged_fraud: None,
        }
    }

    fn names(cycle: &CycleFlag) -> Vec<&str> {
        cycle.accounts.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_triangle_reported_once_with_smallest_account_edge() {
        let txns = vec![txn(1, "A", "B", 100), txn(2, "B", "C", 50), txn(3, "C", "A", 75)];
        let result = detect_round_trips(&TransactionGraph::build(&txns), &RoundTripParams::default(), None);
        assert!(!result.truncated);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(names(&result.cycles[0]), vec!["A", "B", "C"]);
        assert_eq!(result.cycles[0].representative_txn, 1);
    }

    #[test]
    fn test_cycle_is_canonical_regardless_of_batch_order() {
        // Interning order puts C first, so a naive search would start there.
        let txns = vec![txn(7, "C", "A", 75), txn(9, "B", "C", 50), txn(8, "A", "B", 100)];
        let result = detect_round_trips(&TransactionGraph::build(&txns), &RoundTripParams::default(), None);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(names(&result.cycles[0]), vec!["A", "B", "C"]);
        assert_eq!(result.cycles[0].representative_txn, 8);
    }

    #[test]
    fn test_parallel_edges_do_not_duplicate_cycle() {
        let txns = vec![
            txn(5, "A", "B", 1),
            txn(2, "A", "B", 1),
            txn(3, "B", "A", 1),
            txn(4, "B", "A", 1),
        ];
        let result = detect_round_trips(&TransactionGraph::build(&txns), &RoundTripParams::default(), None);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(names(&result.cycles[0]), vec!["A", "B"]);
        assert_eq!(result.cycles[0].representative_txn, 2);
    }

    #[test]
    fn test_cycles_longer_than_limit_are_pruned() {
        let txns = vec![
            txn(1, "A", "B", 1),
            txn(2, "B", "C", 1),
            txn(3, "C", "D", 1),
            txn(4, "D", "A", 1),
        ];
        let graph = TransactionGraph::build(&txns);
        assert!(detect_round_trips(&graph, &RoundTripParams::default(), None)
            .cycles
            .is_empty());

        let params = RoundTripParams::new(4, 1_000).unwrap();
        let result = detect_round_trips(&graph, &params, None);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(names(&result.cycles[0]), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_self_transfer_is_not_a_cycle() {
        let txns = vec![txn(1, "A", "A", 10), txn(2, "A", "B", 10), txn(3, "B", "B", 10)];
        let result = detect_round_trips(&TransactionGraph::build(&txns), &RoundTripParams::default(), None);
        assert!(result.cycles.is_empty());

        // A self-loop on a cycle member does not add a second cycle.
        let txns = vec![txn(1, "A", "A", 10), txn(2, "A", "B", 10), txn(3, "B", "A", 10)];
        let result = detect_round_trips(&TransactionGraph::build(&txns), &RoundTripParams::default(), None);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(names(&result.cycles[0]), vec!["A", "B"]);
        assert_eq!(result.cycles[0].representative_txn, 2);
    }

    #[test]
    fn test_exploration_cap_truncates_without_failing() {
        // Complete digraph on 6 accounts has many short cycles.
        let accounts = ["a", "b", "c", "d", "e", "f"];
        let mut txns = Vec::new();
        let mut id = 0;
        for s in &accounts {
            for d in &accounts {
                if s != d {
                    txns.push(txn(id, s, d, 1));
                    id += 1;
                }
            }
        }
        let graph = TransactionGraph::build(&txns);

        let full = detect_round_trips(&graph, &RoundTripParams::default(), None);
        assert!(!full.truncated);
        // 15 two-cycles + 40 directed triangles
        assert_eq!(full.cycles.len(), 55);

        let capped = RoundTripParams::new(3, 10).unwrap();
        let partial = detect_round_trips(&graph, &capped, None);
        assert!(partial.truncated);
        assert_eq!(partial.expansions, 10);
        assert!(partial.cycles.len() < full.cycles.len());
        for cycle in &partial.cycles {
            assert!(full.cycles.contains(cycle));
        }
    }

    #[test]
    fn test_expired_deadline_truncates() {
        let txns = vec![txn(1, "A", "B", 1), txn(2, "B", "A", 1)];
        let graph = TransactionGraph::build(&txns);
        let result = detect_round_trips(&graph, &RoundTripParams::default(), Some(Instant::now()));
        assert!(result.truncated);
        assert!(result.cycles.is_empty());
    }

    #[test]
    fn test_empty_and_acyclic_graphs() {
        let empty = TransactionGraph::build(&[]);
        assert_eq!(
            detect_round_trips(&empty, &RoundTripParams::default(), None),
            CycleSearch::default()
        );

        let chain = TransactionGraph::build(&[txn(1, "A", "B", 1)]);
        assert!(detect_round_trips(&chain, &RoundTripParams::default(), None)
            .cycles
            .is_empty());
    }

    #[test]
    fn test_single_account_graph_yields_nothing() {
        let txns: Vec<Transaction> = (0..5).map(|i| txn(i, "A", "A", 100)).collect();
        let graph = TransactionGraph::build(&txns);
        assert_eq!(graph.account_count(), 1);
        assert_eq!(
            detect_round_trips(&graph, &RoundTripParams::default(), None),
            CycleSearch::default()
        );
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(RoundTripParams::new(0, 10).is_err());
        assert!(RoundTripParams::new(3, 0).is_err());
    }
}
