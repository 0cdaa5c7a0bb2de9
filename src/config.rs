use serde::Deserialize;

use crate::anomaly::scorer::AnomalyScorer;
use crate::patterns::detector::PatternDetector;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub structuring: StructuringConfig,
    #[serde(default)]
    pub round_tripping: RoundTripConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InputConfig {
    pub transactions_path: Option<String>,
}

fn default_true() -> bool {
    true
}

// ============================================================
// Structural Detector Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct StructuringConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_smurfing_min_count")]
    pub min_count: usize,
    #[serde(default = "default_smurfing_max_amount")]
    pub max_amount: f64,
}

impl Default for StructuringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_count: 5,
            max_amount: 5000.0,
        }
    }
}

fn default_smurfing_min_count() -> usize {
    5
}

fn default_smurfing_max_amount() -> f64 {
    5000.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoundTripConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_cycle_length")]
    pub max_cycle_length: usize,
    #[serde(default = "default_exploration_cap")]
    pub exploration_cap: u64,
}

impl Default for RoundTripConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cycle_length: 3,
            exploration_cap: 1_000_000,
        }
    }
}

fn default_max_cycle_length() -> usize {
    3
}

fn default_exploration_cap() -> u64 {
    1_000_000
}

// ============================================================
// Anomaly Scoring Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AnomalyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_contamination_ratio")]
    pub contamination_ratio: f64,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contamination_ratio: 0.01,
            random_seed: 42,
            n_estimators: 100,
            max_samples: 256,
            min_batch_size: 16,
        }
    }
}

fn default_contamination_ratio() -> f64 {
    0.01
}

fn default_random_seed() -> u64 {
    42
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_min_batch_size() -> usize {
    16
}

// ============================================================
// Pipeline & Reporting Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PipelineConfig {
    /// Wall-clock budget for cycle exploration. The outlier fit is never interrupted.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NarrativeConfig {
    #[serde(default = "default_max_reports")]
    pub max_reports: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self { max_reports: 3 }
    }
}

fn default_max_reports() -> usize {
    3
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Enabled detectors must be constructible from their sections.
    pub fn validate(&self) -> eyre::Result<()> {
        PatternDetector::from_config(&self.structuring, &self.round_tripping)
            .map_err(|e| eyre::eyre!("Invalid detector configuration: {}", e))?;
        if self.anomaly.enabled {
            AnomalyScorer::from_config(&self.anomaly)
                .map_err(|e| eyre::eyre!("Invalid anomaly configuration: {}", e))?;
        }
        if self.pipeline.timeout_ms == Some(0) {
            return Err(eyre::eyre!("pipeline.timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}
