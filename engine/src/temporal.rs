//! Temporal reasoning: a weighted distance graph, a Simple Temporal Network
//! on top of it, and the propagator bridging the STN into the constraint
//! engine.

pub mod graph;
pub mod network;
pub mod propagator;

pub use graph::{
    Time, MAX_DISTANCE, MAX_LENGTH, MIN_DISTANCE, MIN_LENGTH, NEG_INFINITY, POS_INFINITY, TIME_MAX,
    TIME_MIN, TIME_TICK,
};
pub use network::{TemporalNetwork, TnetConfig};
pub use propagator::TemporalPropagator;
