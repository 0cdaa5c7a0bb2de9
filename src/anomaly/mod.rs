pub mod features;
pub mod forest;
pub mod scorer;
pub mod types;
