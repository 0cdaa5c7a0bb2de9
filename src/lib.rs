pub mod anomaly;
pub mod cases;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod narrative;
pub mod patterns;
pub mod pipeline;
