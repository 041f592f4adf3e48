//! Cross-venue arbitrage engine library
//!
//! Detects price dislocations between a CEX order book and constant-product
//! AMM pools, scores them, and executes both legs with unwind protection.
//!
//! Author: AI-Generated
//! Created: 2026-02-10

pub mod alert;
pub mod amm;
pub mod chain;
pub mod config;
pub mod exchange;
pub mod execution;
pub mod inventory;
pub mod mempool;
pub mod orchestrator;
pub mod orderbook;
pub mod pnl;
pub mod pricing;
pub mod risk;
pub mod signal;
pub mod types;

// Re-export commonly used types
pub use amm::{Pair, Route, RouteFinder};
pub use config::{load_config, BotConfig};
pub use execution::{ExecutionContext, ExecutionState, Executor};
pub use inventory::InventoryTracker;
pub use orderbook::{BookAnalyzer, NormalizedOrderBook};
pub use pricing::PricingEngine;
pub use types::{Direction, MarketPair, Signal, Token, TokenAmount};
