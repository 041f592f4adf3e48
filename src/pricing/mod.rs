//! DEX pricing engine
//!
//! Owns the authoritative pool set, derives a RouteFinder snapshot from it,
//! and produces simulation-validated quotes.
//!
//! Author: AI-Generated
//! Created: 2026-02-17

pub mod engine;
pub mod simulator;

pub use engine::{PricingEngine, Quote};
pub use simulator::{ForkRpcSimulator, ForkSimulator, SimulationResult};

use crate::amm::Pair;
use alloy::primitives::Address;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no route from {token_in} to {token_out}")]
    NoRoute { token_in: Address, token_out: Address },
    #[error("simulation failed: {0}")]
    SimulationFailed(String),
}

/// Where pool state comes from. The chain fetcher implements this; tests
/// provide canned pairs.
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pair(&self, address: Address) -> anyhow::Result<Pair>;
}
