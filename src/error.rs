/// Typed failures a single detector can report for a whole batch.
///
/// Per-record problems are never surfaced here; they are skipped and counted
/// by the stage that encounters them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectionError {
    /// The batch is too small for the outlier ensemble to fit meaningfully.
    #[error("insufficient data for anomaly scoring: need at least {required} transactions, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// A detector was constructed with a parameter outside its domain.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
