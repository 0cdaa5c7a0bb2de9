pub mod flagger;
pub mod types;
