//! Constant-product AMM pricing core
//!
//! Author: AI-Generated
//! Created: 2026-02-11

pub mod pair;
pub mod route;
pub mod router;

pub use pair::{AmmError, Pair, DEFAULT_FEE_BPS};
pub use route::Route;
pub use router::{RankedRoute, RouteFinder, DEFAULT_MAX_HOPS};
