//! Pricing engine: pool ownership, route snapshots, validated quotes
//!
//! The pool map is the single authoritative copy of DEX state. Every change
//! (bulk load or single refresh) rebuilds the RouteFinder from a snapshot
//! and swaps the Arc, so concurrent readers always see one consistent graph
//! even while a refresh is in flight.
//!
//! A quote is only trusted when the fork simulator agrees with the
//! calculated route output to within 0.1% — anything wider means our pool
//! state is stale or the route hits pool behavior the math does not model.
//!
//! Author: AI-Generated
//! Created: 2026-02-17
//! Modified: 2026-03-09 - mempool-driven refresh hook

use super::simulator::ForkSimulator;
use super::{PoolSource, PricingError};
use crate::amm::{Pair, Route, RouteFinder};
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A route priced two ways: calculated from reserves and executed against a
/// forked chain.
#[derive(Debug, Clone)]
pub struct Quote {
    pub route: Route,
    pub amount_in: U256,
    /// Chained constant-product output from our reserve snapshot
    pub expected_output: U256,
    /// Output the fork simulator observed
    pub simulated_output: U256,
    pub gas_used: u64,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Expected and simulated agree to within 0.1%
    pub fn valid(&self) -> bool {
        if self.expected_output.is_zero() {
            return false;
        }
        let drift = if self.expected_output > self.simulated_output {
            self.expected_output - self.simulated_output
        } else {
            self.simulated_output - self.expected_output
        };
        drift * U256::from(1000u64) < self.expected_output
    }
}

pub struct PricingEngine {
    pools: DashMap<Address, Pair>,
    finder: RwLock<Arc<RouteFinder>>,
    source: Arc<dyn PoolSource>,
    simulator: Arc<dyn ForkSimulator>,
    weth: Address,
    /// Simulation sender (funded and approved on the fork)
    sender: Address,
    max_hops: usize,
}

impl PricingEngine {
    pub fn new(
        source: Arc<dyn PoolSource>,
        simulator: Arc<dyn ForkSimulator>,
        weth: Address,
        sender: Address,
        max_hops: usize,
    ) -> Self {
        Self {
            pools: DashMap::new(),
            finder: RwLock::new(Arc::new(RouteFinder::new(Vec::new(), weth))),
            source,
            simulator,
            weth,
            sender,
            max_hops,
        }
    }

    /// Fetch all pools concurrently and replace the owned set. Pools that
    /// fail to load are reported and skipped; the swap of the RouteFinder
    /// at the end is what queries observe.
    pub async fn load_pools(&self, addresses: &[Address]) -> anyhow::Result<usize> {
        let fetches = addresses.iter().map(|a| self.source.fetch_pair(*a));
        let results = join_all(fetches).await;

        self.pools.clear();
        let mut loaded = 0usize;
        for (address, result) in addresses.iter().zip(results) {
            match result {
                Ok(pair) => {
                    self.pools.insert(*address, pair);
                    loaded += 1;
                }
                Err(e) => warn!("pool {} failed to load: {}", address, e),
            }
        }
        self.rebuild_finder();
        info!("loaded {}/{} pools", loaded, addresses.len());
        Ok(loaded)
    }

    /// Refetch one pool. Errors are logged and swallowed: a stale pool is
    /// better than a dead pipeline, and quotes are simulation-checked anyway.
    pub async fn refresh_pool(&self, address: Address) {
        match self.source.fetch_pair(address).await {
            Ok(pair) => {
                debug!(
                    "refreshed pool {} ({}, {})",
                    address, pair.reserve0, pair.reserve1
                );
                self.pools.insert(address, pair);
                self.rebuild_finder();
            }
            Err(e) => warn!("refresh of pool {} failed: {}", address, e),
        }
    }

    fn rebuild_finder(&self) {
        let snapshot: Vec<Pair> = self.pools.iter().map(|e| e.value().clone()).collect();
        let next = Arc::new(RouteFinder::new(snapshot, self.weth));
        *self.finder.write().expect("finder lock poisoned") = next;
    }

    /// Current RouteFinder snapshot
    pub fn finder(&self) -> Arc<RouteFinder> {
        self.finder.read().expect("finder lock poisoned").clone()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Token metadata from the tracked pool set, if any pool carries it
    pub fn token(&self, address: Address) -> Option<crate::types::Token> {
        self.pools.iter().find_map(|e| {
            let pair = e.value();
            if pair.token0.address == address {
                Some(pair.token0.clone())
            } else if pair.token1.address == address {
                Some(pair.token1.clone())
            } else {
                None
            }
        })
    }

    /// The tracked pool holding exactly this token pair, if any
    pub fn tracked_pool_for(&self, a: Address, b: Address) -> Option<Address> {
        self.pools
            .iter()
            .find(|e| e.value().has_token(a) && e.value().has_token(b))
            .map(|e| *e.key())
    }

    /// Mempool hook: a pending swap touching a tracked pool's tokens
    /// schedules that pool for refresh before the next quote.
    pub async fn note_pending_swap(&self, token_in: Address, token_out: Address) {
        if let Some(pool) = self.tracked_pool_for(token_in, token_out) {
            debug!("pending swap touches pool {}, refreshing", pool);
            self.refresh_pool(pool).await;
        }
    }

    /// Pick the best route by gas-aware net output, execute it on the fork,
    /// and package both numbers into a Quote.
    pub async fn get_quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        gas_price_gwei: u64,
    ) -> Result<Quote, PricingError> {
        let finder = self.finder();
        let (route, _net) =
            finder.find_best_route(token_in, token_out, amount_in, gas_price_gwei, self.max_hops);
        let route = route.ok_or(PricingError::NoRoute {
            token_in,
            token_out,
        })?;

        let expected_output = route
            .output(amount_in)
            .map_err(|e| PricingError::SimulationFailed(e.to_string()))?;

        self.simulator
            .ensure_sender_ready(&route, amount_in, self.sender)
            .await
            .map_err(|e| PricingError::SimulationFailed(e.to_string()))?;
        let sim = self
            .simulator
            .simulate_route(&route, amount_in, self.sender)
            .await
            .map_err(|e| PricingError::SimulationFailed(e.to_string()))?;
        if !sim.success {
            return Err(PricingError::SimulationFailed(
                sim.error.unwrap_or_else(|| "simulator reported failure".into()),
            ));
        }

        Ok(Quote {
            route,
            amount_in,
            expected_output,
            simulated_output: sim.amount_out,
            gas_used: sim.gas_used,
            timestamp: Utc::now(),
        })
    }
}
