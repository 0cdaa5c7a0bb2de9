use std::io::Read;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use serde::Deserialize;

use super::types::{Transaction, TransactionType};

/// One row of a PaySim-format CSV. Balance columns are accepted but unused.
#[derive(Debug, Deserialize)]
struct PaysimRow {
    step: u32,
    #[serde(rename = "type")]
    txn_type: TransactionType,
    amount: String,
    #[serde(rename = "nameOrig", default)]
    name_orig: String,
    #[serde(rename = "nameDest", default)]
    name_dest: String,
    #[serde(rename = "isFraud", default)]
    is_fraud: Option<u8>,
    #[serde(rename = "isFlaggedFraud", default)]
    is_flagged_fraud: Option<u8>,
}

/// Counts from reading one CSV batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: u64,
    pub malformed: u64,
}

/// Read a PaySim CSV file from disk.
pub fn load_csv(path: &str) -> eyre::Result<(Vec<Transaction>, LoadStats)> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("Failed to open transactions CSV '{}': {}", path, e))?;
    let (transactions, stats) = read_transactions(file)?;
    tracing::info!(
        loaded = stats.loaded,
        malformed = stats.malformed,
        "Loaded transactions from {}",
        path
    );
    Ok((transactions, stats))
}

/// Read PaySim rows from any reader. The 0-based data row position becomes
/// the transaction id; rows that cannot be decoded are skipped and counted.
pub fn read_transactions<R: Read>(reader: R) -> eyre::Result<(Vec<Transaction>, LoadStats)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| eyre::eyre!("Failed to read CSV header: {}", e))?
        .clone();

    let mut transactions = Vec::new();
    let mut stats = LoadStats::default();

    for (row_idx, result) in reader.records().enumerate() {
        let id = row_idx as u64;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(row = id, error = %e, "Unreadable CSV row, skipping");
                stats.malformed += 1;
                continue;
            }
        };

        let row: PaysimRow = match record.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(row = id, error = %e, "Malformed transaction row, skipping");
                stats.malformed += 1;
                continue;
            }
        };

        let amount = match BigDecimal::from_str(&row.amount) {
            Ok(a) if a >= BigDecimal::zero() => a,
            _ => {
                tracing::debug!(row = id, amount = %row.amount, "Invalid amount, skipping");
                stats.malformed += 1;
                continue;
            }
        };

        transactions.push(Transaction {
            id,
            step: row.step,
            txn_type: row.txn_type,
            amount,
            source_account: row.name_orig,
            dest_account: row.name_dest,
            is_fraud: row.is_fraud.map(|v| v != 0),
            is_flagged_fraud: row.is_flagged_fraud.map(|v| v != 0),
        });
        stats.loaded += 1;
    }

    if stats.malformed > 0 {
        tracing::warn!(malformed = stats.malformed, "Skipped malformed transaction rows");
    }

    Ok((transactions, stats))
}
