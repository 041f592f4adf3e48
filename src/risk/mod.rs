//! Layered admission control
//!
//! Three gates run in order for every candidate signal:
//!   1. PreTradeValidator — data sanity (prices, spread, age, size)
//!   2. RiskManager — operator-configured limits and loss tracking
//!   3. SafetyCheck — absolute floors the operator cannot raise; a
//!      violation here is fatal to the loop
//!
//! Author: AI-Generated
//! Created: 2026-02-23

pub mod manager;
pub mod pretrade;
pub mod safety;

pub use manager::{RiskConfig, RiskManager};
pub use pretrade::PreTradeValidator;
pub use safety::{SafetyCheck, SafetyViolation};

use thiserror::Error;

/// A gate's refusal. Vetoes are expected in normal operation and logged,
/// not escalated — except the safety kind, which kills the loop.
#[derive(Debug, Error, PartialEq)]
pub enum GateVeto {
    #[error("bad data: {0}")]
    BadData(String),
    #[error("signal stale: age {age_secs:.1}s exceeds {max_secs}s")]
    Stale { age_secs: f64, max_secs: u64 },
    #[error("risk limit: {0}")]
    RiskLimit(String),
}
