use std::collections::HashMap;

use bigdecimal::BigDecimal;

use crate::ingest::types::{Transaction, TransactionType};

/// One directed edge per transaction. Parallel edges between the same pair of
/// accounts are kept separate, never aggregated.
#[derive(Debug, Clone)]
pub struct TransactionEdge {
    pub transaction_id: u64,
    pub source: usize,
    pub dest: usize,
    pub amount: BigDecimal,
    pub txn_type: TransactionType,
}

/// Account-level directed multigraph built from a single batch.
///
/// Accounts are interned to dense indices on first sight; adjacency is a list
/// of edge indices per source account so neighbor enumeration is O(out-degree).
/// A graph is owned by one analysis run and is read-only once built.
#[derive(Debug, Default)]
pub struct TransactionGraph {
    account_to_idx: HashMap<String, usize>,
    idx_to_account: Vec<String>,
    edges: Vec<TransactionEdge>,
    outgoing: Vec<Vec<usize>>,
    skipped_records: u64,
}

impl TransactionGraph {
    /// Build a fresh graph. Transactions missing either account are skipped
    /// and counted; everything else becomes exactly one edge.
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut graph = Self::default();

        for txn in transactions {
            if !txn.has_endpoints() {
                tracing::debug!(
                    transaction_id = txn.id,
                    "Transaction missing source or destination account, skipping"
                );
                graph.skipped_records += 1;
                continue;
            }

            let source = graph.intern(&txn.source_account);
            let dest = graph.intern(&txn.dest_account);

            let edge_idx = graph.edges.len();
            graph.edges.push(TransactionEdge {
                transaction_id: txn.id,
                source,
                dest,
                amount: txn.amount.clone(),
                txn_type: txn.txn_type,
            });
            graph.outgoing[source].push(edge_idx);
        }

        if graph.skipped_records > 0 {
            tracing::warn!(
                skipped = graph.skipped_records,
                "Skipped transactions with missing accounts"
            );
        }

        tracing::info!(
            accounts = graph.account_count(),
            edges = graph.edge_count(),
            "Transaction graph built"
        );

        graph
    }

    fn intern(&mut self, account: &str) -> usize {
        if let Some(&idx) = self.account_to_idx.get(account) {
            return idx;
        }
        let idx = self.idx_to_account.len();
        self.account_to_idx.insert(account.to_string(), idx);
        self.idx_to_account.push(account.to_string());
        self.outgoing.push(Vec::new());
        idx
    }

    pub fn account_count(&self) -> usize {
        self.idx_to_account.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of input records rejected for missing account fields.
    pub fn skipped_records(&self) -> u64 {
        self.skipped_records
    }

    pub fn account_index(&self, account: &str) -> Option<usize> {
        self.account_to_idx.get(account).copied()
    }

    pub fn account_name(&self, idx: usize) -> &str {
        &self.idx_to_account[idx]
    }

    pub fn edges(&self) -> &[TransactionEdge] {
        &self.edges
    }

    /// Outgoing edges of an account, in insertion order.
    pub fn out_edges(&self, idx: usize) -> impl Iterator<Item = &TransactionEdge> + '_ {
        self.outgoing[idx].iter().map(move |&e| &self.edges[e])
    }

    pub fn out_degree(&self, idx: usize) -> usize {
        self.outgoing[idx].len()
    }

    /// Account indices ordered by account name. Detectors iterate in this
    /// order so their output does not depend on batch order.
    pub fn accounts_by_name(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.idx_to_account.len()).collect();
        order.sort_by(|&a, &b| self.idx_to_account[a].cmp(&self.idx_to_account[b]));
        order
    }
}
