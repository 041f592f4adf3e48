//! Signal generation and scoring
//!
//! Author: AI-Generated
//! Created: 2026-02-21

pub mod generator;
pub mod scorer;

pub use generator::{GeneratorConfig, SignalGenerator};
pub use scorer::{ScorerWeights, SignalScorer};
