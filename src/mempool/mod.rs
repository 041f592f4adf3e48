//! Pending-swap mempool stream
//!
//! Author: AI-Generated
//! Created: 2026-02-26

pub mod decoder;
pub mod watcher;

pub use decoder::{decode_calldata, selector_hex, ParsedSwap};
pub use watcher::PendingSwapWatcher;
