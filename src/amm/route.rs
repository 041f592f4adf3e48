//! Multi-hop swap routes
//!
//! A Route is an ordered list of pools plus the token path through them,
//! with |path| = |pools| + 1. Output is the left-to-right chain of per-hop
//! amount_out calls against immutably simulated pool states.
//!
//! Author: AI-Generated
//! Created: 2026-02-11

use super::pair::{AmmError, Pair};
use crate::types::Token;
use alloy::primitives::U256;

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pools: Vec<Pair>,
    path: Vec<Token>,
}

impl Route {
    /// Build a route, validating that every consecutive (pool, in→out) hop
    /// is well-formed.
    pub fn new(pools: Vec<Pair>, path: Vec<Token>) -> Result<Self, AmmError> {
        if pools.is_empty() || path.len() != pools.len() + 1 {
            return Err(AmmError::InvalidInput(format!(
                "route shape mismatch: {} pools, {} path tokens",
                pools.len(),
                path.len()
            )));
        }
        for (i, pool) in pools.iter().enumerate() {
            let tin = &path[i];
            let tout = &path[i + 1];
            if !pool.has_token(tin.address) || !pool.has_token(tout.address) {
                return Err(AmmError::InvalidInput(format!(
                    "hop {} through {} does not connect {} -> {}",
                    i, pool.address, tin.symbol, tout.symbol
                )));
            }
            if tin.address == tout.address {
                return Err(AmmError::InvalidInput(format!(
                    "hop {} is a self-loop on {}",
                    i, tin.symbol
                )));
            }
        }
        Ok(Self { pools, path })
    }

    pub fn hops(&self) -> usize {
        self.pools.len()
    }

    pub fn pools(&self) -> &[Pair] {
        &self.pools
    }

    pub fn path(&self) -> &[Token] {
        &self.path
    }

    pub fn token_in(&self) -> &Token {
        &self.path[0]
    }

    pub fn token_out(&self) -> &Token {
        self.path.last().expect("path is never empty")
    }

    /// Chain `amount_in` through every hop and return the final output
    pub fn output(&self, amount_in: U256) -> Result<U256, AmmError> {
        let mut amount = amount_in;
        for (i, pool) in self.pools.iter().enumerate() {
            amount = pool.amount_out(amount, self.path[i].address)?;
        }
        Ok(amount)
    }

    /// Human-readable path, e.g. "SHIB -> WETH -> USDC"
    pub fn describe(&self) -> String {
        self.path
            .iter()
            .map(|t| t.symbol.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// The same route walked backwards (used for unwinding a DEX leg)
    pub fn reversed(&self) -> Route {
        let mut pools = self.pools.clone();
        pools.reverse();
        let mut path = self.path.clone();
        path.reverse();
        Route { pools, path }
    }
}
