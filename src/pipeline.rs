use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::anomaly::scorer::AnomalyScorer;
use crate::anomaly::types::AnomalyScore;
use crate::cases::flagger;
use crate::cases::types::FlaggedCase;
use crate::config::Config;
use crate::error::DetectionError;
use crate::graph::builder::TransactionGraph;
use crate::ingest::loader::LoadStats;
use crate::ingest::types::Transaction;
use crate::patterns::detector::PatternDetector;
use crate::patterns::types::{CycleSearch, StructuringFlag};

/// Size of the graph built for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub accounts: usize,
    pub edges: usize,
    pub skipped_records: u64,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub transactions: usize,
    pub graph: GraphStats,
    pub structuring: Vec<StructuringFlag>,
    pub round_trips: CycleSearch,
    /// Failure here is local to the anomaly detector; structural results stand.
    pub anomaly: Result<Vec<AnomalyScore>, DetectionError>,
    pub cases: Vec<FlaggedCase>,
}

/// Flat counts for logging and CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub transactions: usize,
    /// Input rows the loader could not decode. Zero unless set by the caller.
    pub malformed_rows: u64,
    pub accounts: usize,
    pub edges: usize,
    pub skipped_records: u64,
    pub structuring_flags: usize,
    pub cycles_found: usize,
    pub cycle_search_truncated: bool,
    pub anomalies_flagged: usize,
    pub anomaly_error: Option<String>,
    pub cases: usize,
}

impl AnalysisReport {
    pub fn summary(&self) -> RunSummary {
        let (anomalies_flagged, anomaly_error) = match &self.anomaly {
            Ok(scores) => (scores.iter().filter(|s| s.is_anomaly).count(), None),
            Err(e) => (0, Some(e.to_string())),
        };
        RunSummary {
            transactions: self.transactions,
            malformed_rows: 0,
            accounts: self.graph.accounts,
            edges: self.graph.edges,
            skipped_records: self.graph.skipped_records,
            structuring_flags: self.structuring.len(),
            cycles_found: self.round_trips.cycles.len(),
            cycle_search_truncated: self.round_trips.truncated,
            anomalies_flagged,
            anomaly_error,
            cases: self.cases.len(),
        }
    }
}

impl RunSummary {
    /// Fold in the loader's counts for the batch this run analysed.
    pub fn with_load_stats(mut self, stats: &LoadStats) -> Self {
        self.malformed_rows = stats.malformed;
        self
    }
}

/// Orchestrates one batch analysis:
/// 1. Graph build + structural detection (one worker)
/// 2. Anomaly scoring on the raw batch (another worker)
/// 3. Join, then merge into flagged cases
///
/// Holds only configuration; every run builds its own graph and forest.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    detector: PatternDetector,
    scorer: Option<AnomalyScorer>,
    timeout: Option<Duration>,
}

impl AnalysisPipeline {
    pub fn new(config: &Config) -> eyre::Result<Self> {
        let detector = PatternDetector::from_config(&config.structuring, &config.round_tripping)
            .map_err(|e| eyre::eyre!("Invalid detector configuration: {}", e))?;

        let scorer = if config.anomaly.enabled {
            Some(
                AnomalyScorer::from_config(&config.anomaly)
                    .map_err(|e| eyre::eyre!("Invalid anomaly configuration: {}", e))?,
            )
        } else {
            None
        };

        Ok(Self {
            detector,
            scorer,
            timeout: config.pipeline.timeout_ms.map(Duration::from_millis),
        })
    }

    /// Run every enabled detector over the batch and merge their flags.
    ///
    /// Only a crashed worker fails the run; an anomaly detector that cannot
    /// score the batch is reported inside `AnalysisReport::anomaly`.
    pub async fn run(&self, transactions: Arc<[Transaction]>) -> eyre::Result<AnalysisReport> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let detector = self.detector.clone();
        let graph_batch = Arc::clone(&transactions);
        let structural = tokio::task::spawn_blocking(move || {
            let graph = TransactionGraph::build(&graph_batch);
            let stats = GraphStats {
                accounts: graph.account_count(),
                edges: graph.edge_count(),
                skipped_records: graph.skipped_records(),
            };
            (stats, detector.run(&graph, deadline))
        });

        let scorer = self.scorer.clone();
        let score_batch = Arc::clone(&transactions);
        let scoring = tokio::task::spawn_blocking(move || match scorer {
            Some(scorer) => scorer.score(&score_batch),
            None => Ok(Vec::new()),
        });

        let (structural, scoring) = tokio::join!(structural, scoring);
        let (graph, patterns) =
            structural.map_err(|e| eyre::eyre!("Pattern detection task failed: {}", e))?;
        let anomaly = scoring.map_err(|e| eyre::eyre!("Anomaly scoring task failed: {}", e))?;

        if let Err(e) = &anomaly {
            tracing::warn!(error = %e, "Anomaly detector unavailable for this batch, keeping structural results");
        }

        let anomaly_scores: &[AnomalyScore] = match &anomaly {
            Ok(scores) => scores,
            Err(_) => &[],
        };
        let cases = flagger::merge(
            &patterns.structuring,
            &patterns.round_trips.cycles,
            anomaly_scores,
        );

        let report = AnalysisReport {
            transactions: transactions.len(),
            graph,
            structuring: patterns.structuring,
            round_trips: patterns.round_trips,
            anomaly,
            cases,
        };

        let summary = report.summary();
        tracing::info!(
            transactions = summary.transactions,
            structuring = summary.structuring_flags,
            cycles = summary.cycles_found,
            truncated = summary.cycle_search_truncated,
            anomalies = summary.anomalies_flagged,
            cases = summary.cases,
            "Analysis run complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::types::DetectorKind;
    use crate::config::AnomalyConfig;
    use crate::ingest::loader;
    use std::str::FromStr;
    use crate::ingest::types::TransactionType;
    use bigdecimal::BigDecimal;

    fn txn(id: u64, src: &str, dst: &str, amount: i64) -> Transaction {
        Transaction {
            id,
            step: (id % 20) as u32 + 1,
            txn_type: TransactionType::Payment,
            amount: BigDecimal::from(amount),
            source_account: src.to_string(),
            dest_account: dst.to_string(),
            is_fraud: None,
            is_flagged_fraud: None,
        }
    }

    /// Smurfing from X plus a three-account cycle A -> B -> C -> A.
    fn scenario_batch() -> Vec<Transaction> {
        let mut txns = vec![
            txn(20, "X", "M1", 100),
            txn(21, "X", "M2", 100),
            txn(22, "X", "M3", 100),
            txn(23, "X", "M4", 100),
            txn(24, "X", "M5", 100),
            txn(30, "A", "B", 100),
            txn(31, "B", "C", 50),
            txn(32, "C", "A", 75),
        ];
        // Unrelated background traffic so the scorer has enough data.
        for i in 0..40u64 {
            txns.push(txn(100 + i, &format!("P{}", i), &format!("Q{}", i), 2000 + i as i64));
        }
        txns
    }

    fn pipeline() -> AnalysisPipeline {
        AnalysisPipeline::new(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_flags_both_patterns() {
        let report = pipeline().run(scenario_batch().into()).await.unwrap();

        assert_eq!(report.graph.edges, 48);
        assert_eq!(report.structuring.len(), 1);
        assert_eq!(report.structuring[0].representative_txn, 20);
        assert_eq!(report.round_trips.cycles.len(), 1);
        assert_eq!(report.round_trips.cycles[0].representative_txn, 30);

        let structural: Vec<(DetectorKind, u64)> = report
            .cases
            .iter()
            .filter(|c| c.detector != DetectorKind::Anomaly)
            .map(|c| (c.detector, c.transaction_id))
            .collect();
        assert_eq!(
            structural,
            vec![(DetectorKind::Structuring, 20), (DetectorKind::RoundTripping, 30)]
        );

        let scores = report.anomaly.as_ref().unwrap();
        assert_eq!(scores.len(), 48);
        // ceil(0.01 * 48) == 1
        assert_eq!(
            report
                .cases
                .iter()
                .filter(|c| c.detector == DetectorKind::Anomaly)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_rerun_produces_identical_cases() {
        let pipeline = pipeline();
        let batch: Arc<[Transaction]> = scenario_batch().into();
        let first = pipeline.run(Arc::clone(&batch)).await.unwrap();
        let second = pipeline.run(batch).await.unwrap();
        assert_eq!(first.cases, second.cases);

        let mut pairs: Vec<(DetectorKind, u64)> = first
            .cases
            .iter()
            .map(|c| (c.detector, c.transaction_id))
            .collect();
        let before = pairs.len();
        pairs.dedup();
        assert_eq!(pairs.len(), before);
    }

    #[tokio::test]
    async fn test_small_batch_fails_only_anomaly_detector() {
        let txns = vec![
            txn(1, "X", "Y", 100),
            txn(2, "X", "Y", 100),
            txn(3, "X", "Y", 100),
            txn(4, "X", "Y", 100),
            txn(5, "X", "Y", 100),
            txn(6, "A", "B", 100),
            txn(7, "B", "A", 100),
        ];
        let report = pipeline().run(txns.into()).await.unwrap();

        assert_eq!(
            report.anomaly,
            Err(DetectionError::InsufficientData {
                required: 16,
                actual: 7
            })
        );
        assert_eq!(report.structuring.len(), 1);
        assert_eq!(report.round_trips.cycles.len(), 1);
        assert_eq!(report.cases.len(), 2);
        assert!(report.summary().anomaly_error.is_some());
    }

    #[tokio::test]
    async fn test_empty_batch_is_valid() {
        let report = pipeline().run(Vec::<Transaction>::new().into()).await.unwrap();
        assert!(report.cases.is_empty());
        assert_eq!(report.graph, GraphStats::default());
        assert_eq!(report.anomaly, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_disabled_anomaly_detector() {
        let config = Config {
            anomaly: AnomalyConfig {
                enabled: false,
                ..AnomalyConfig::default()
            },
            ..Config::default()
        };
        let report = AnalysisPipeline::new(&config)
            .unwrap()
            .run(scenario_batch().into())
            .await
            .unwrap();
        assert_eq!(report.anomaly, Ok(Vec::new()));
        assert_eq!(report.cases.len(), 2);
    }

    #[tokio::test]
    async fn test_skipped_records_are_reported() {
        let mut txns = scenario_batch();
        txns.push(txn(999, "", "Z", 10));
        let report = pipeline().run(txns.into()).await.unwrap();
        assert_eq!(report.graph.skipped_records, 1);
        assert_eq!(report.graph.edges, 48);
        assert_eq!(report.transactions, 49);
    }

    #[tokio::test]
    async fn test_oversized_amount_does_not_sink_the_run() {
        let mut txns = scenario_batch();
        let mut huge = txn(500, "H", "J", 0);
        huge.amount = BigDecimal::from_str("1e400").unwrap();
        txns.push(huge);

        let report = pipeline().run(txns.into()).await.unwrap();
        let scores = report.anomaly.as_ref().unwrap();
        assert_eq!(scores.len(), 49);
        assert!(scores.iter().all(|s| s.anomaly_score.is_finite()));
        assert_eq!(report.structuring.len(), 1);
        assert_eq!(report.round_trips.cycles.len(), 1);
    }

    #[tokio::test]
    async fn test_self_transfers_on_one_account_raise_no_cases() {
        let txns: Vec<Transaction> = (0..5).map(|i| txn(i, "A", "A", 100)).collect();
        let report = pipeline().run(txns.into()).await.unwrap();
        assert_eq!(report.graph.accounts, 1);
        assert!(report.structuring.is_empty());
        assert!(report.round_trips.cycles.is_empty());
        assert!(report.cases.is_empty());
    }

    #[tokio::test]
    async fn test_summary_reports_malformed_rows() {
        let csv = "step,type,amount,nameOrig,nameDest\n\
                   1,PAYMENT,10.0,C1,C2\n\
                   1,WIRE,10.0,C1,C2\n\
                   1,PAYMENT,20.0,,C2\n";
        let (txns, stats) = loader::read_transactions(csv.as_bytes()).unwrap();
        let report = pipeline().run(txns.into()).await.unwrap();

        let summary = report.summary().with_load_stats(&stats);
        assert_eq!(summary.malformed_rows, 1);
        assert_eq!(summary.skipped_records, 1);
        assert_eq!(summary.transactions, 2);
        assert_eq!(report.summary().malformed_rows, 0);
    }
}
