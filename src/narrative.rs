use chrono::{DateTime, Utc};

use crate::cases::types::FlaggedCase;
use crate::ingest::types::Transaction;

/// Renders a human-readable report draft for a flagged case.
///
/// Implementations may call out to a language model; the detection core only
/// ever depends on this trait.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, case: &FlaggedCase, transaction: Option<&Transaction>) -> String;
}

/// Fixed-template SAR draft. Output depends only on the case, the
/// transaction and `generated_at`.
#[derive(Debug, Clone)]
pub struct TemplateNarrative {
    pub generated_at: DateTime<Utc>,
}

impl TemplateNarrative {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }
}

impl NarrativeGenerator for TemplateNarrative {
    fn generate(&self, case: &FlaggedCase, transaction: Option<&Transaction>) -> String {
        let mut report = format!(
            "Suspicious Activity Report (SAR)\n\
             Transaction ID: {}\n\
             Flagged By: {}\n\
             Reason: {}\n",
            case.transaction_id,
            case.detector.as_str(),
            case.reason
        );

        if let Some(txn) = transaction {
            report.push_str(&format!(
                "Type: {}\nAmount: {}\nFrom: {}\nTo: {}\nStep: {}\n",
                txn.txn_type.as_str(),
                txn.amount,
                txn.source_account,
                txn.dest_account,
                txn.step
            ));
        }

        report.push_str(&format!(
            "Generated On: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        report
    }
}
