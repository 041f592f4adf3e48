//! Two-leg trade execution
//!
//! Author: AI-Generated
//! Created: 2026-02-24

pub mod circuit_breaker;
pub mod executor;
pub mod replay;
pub mod state;

pub use circuit_breaker::CircuitBreaker;
pub use executor::{Executor, ExecutorConfig};
pub use replay::ReplayGuard;
pub use state::{ExecutionContext, ExecutionState, LegFill, Venue};
