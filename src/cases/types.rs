use serde::Serialize;

/// Which detector raised a case. Declaration order is the merge priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Structuring,
    RoundTripping,
    Anomaly,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structuring => "structuring",
            Self::RoundTripping => "round_tripping",
            Self::Anomaly => "anomaly",
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            Self::Structuring => 0,
            Self::RoundTripping => 1,
            Self::Anomaly => 2,
        }
    }
}

/// A transaction flagged by one detector, ready for persistence or reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedCase {
    pub transaction_id: u64,
    #[serde(rename = "detector_name")]
    pub detector: DetectorKind,
    pub reason: String,
    /// Position in the merged output, stable across runs on the same input.
    pub order_key: u64,
}
