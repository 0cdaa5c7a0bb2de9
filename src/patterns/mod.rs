pub mod detector;
pub mod round_trip;
pub mod structuring;
pub mod types;
