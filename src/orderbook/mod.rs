//! Level-2 order book model and analytics
//!
//! Author: AI-Generated
//! Created: 2026-02-13

pub mod analyzer;
pub mod book;

pub use analyzer::{BookAnalyzer, WalkResult};
pub use book::{BookError, BookLevel, BookSide, NormalizedOrderBook};
