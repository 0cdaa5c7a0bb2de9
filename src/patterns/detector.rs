use std::time::Instant;

use crate::config::{RoundTripConfig, StructuringConfig};
use crate::error::DetectionError;
use crate::graph::builder::TransactionGraph;

use super::round_trip::{self, RoundTripParams};
use super::structuring::{self, StructuringParams};
use super::types::PatternReport;

/// Runs the structural heuristics over a built graph. Either detector can be
/// switched off; the graph is only ever read.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    structuring: Option<StructuringParams>,
    round_trip: Option<RoundTripParams>,
}

impl PatternDetector {
    pub fn new(structuring: Option<StructuringParams>, round_trip: Option<RoundTripParams>) -> Self {
        Self {
            structuring,
            round_trip,
        }
    }

    pub fn from_config(
        structuring: &StructuringConfig,
        round_trip: &RoundTripConfig,
    ) -> Result<Self, DetectionError> {
        let structuring = if structuring.enabled {
            Some(StructuringParams::new(
                structuring.min_count,
                structuring.max_amount,
            )?)
        } else {
            None
        };
        let round_trip = if round_trip.enabled {
            Some(RoundTripParams::new(
                round_trip.max_cycle_length,
                round_trip.exploration_cap,
            )?)
        } else {
            None
        };
        Ok(Self::new(structuring, round_trip))
    }

    /// Run every enabled detector. `deadline` only bounds the cycle search.
    pub fn run(&self, graph: &TransactionGraph, deadline: Option<Instant>) -> PatternReport {
        let structuring = self
            .structuring
            .as_ref()
            .map(|params| structuring::detect_structuring(graph, params))
            .unwrap_or_default();

        let round_trips = self
            .round_trip
            .as_ref()
            .map(|params| round_trip::detect_round_trips(graph, params, deadline))
            .unwrap_or_default();

        PatternReport {
            structuring,
            round_trips,
        }
    }
}
