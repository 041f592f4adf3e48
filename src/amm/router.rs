//! Route discovery and gas-aware ranking
//!
//! Builds an undirected multigraph over the pool set keyed by token address
//! (nodes are tokens, edges are pools) and enumerates simple paths with a
//! bounded DFS. Candidate routes are ranked by net output: gross chained
//! output minus the gas cost of executing the route, converted into the
//! output token through the deepest WETH pool adjacent to it.
//!
//! The WETH-neighbor conversion is a deliberate approximation: with
//! fragmented WETH liquidity it can mis-charge, and a stable-USD pivot is
//! the eventual replacement. When no WETH pool neighbors the output token
//! the gas cost is taken as zero rather than dropping the route.
//!
//! Author: AI-Generated
//! Created: 2026-02-12
//! Modified: 2026-02-27 - ceil division on the gas conversion

use super::pair::Pair;
use super::route::Route;
use crate::types::Token;
use alloy::primitives::{Address, U256};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Base gas for a single-hop swap transaction
const GAS_BASE: u64 = 150_000;
/// Additional gas per hop
const GAS_PER_HOP: u64 = 100_000;

/// Default hop bound for enumeration
pub const DEFAULT_MAX_HOPS: usize = 3;

/// A route together with its gas-adjusted score
#[derive(Debug, Clone)]
pub struct RankedRoute {
    pub route: Route,
    pub gross_output: U256,
    pub gas_cost_in_out: U256,
    pub net_output: U256,
}

/// Route finder over an immutable snapshot of pools.
///
/// The pricing engine rebuilds this from a fresh snapshot whenever the pool
/// set changes; queries therefore always observe one consistent graph.
pub struct RouteFinder {
    pairs: Vec<Pair>,
    /// token address -> indices into `pairs`, in insertion order
    adjacency: HashMap<Address, Vec<usize>>,
    weth: Address,
}

impl RouteFinder {
    pub fn new(pairs: Vec<Pair>, weth: Address) -> Self {
        let mut adjacency: HashMap<Address, Vec<usize>> = HashMap::new();
        for (idx, pair) in pairs.iter().enumerate() {
            adjacency.entry(pair.token0.address).or_default().push(idx);
            adjacency.entry(pair.token1.address).or_default().push(idx);
        }
        Self {
            pairs,
            adjacency,
            weth,
        }
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Enumerate all simple paths from `token_in` to `token_out` with at most
    /// `max_hops` pools. Each token is visited at most once; output order is
    /// DFS order and stable for a given pool set.
    pub fn find_all_routes(
        &self,
        token_in: Address,
        token_out: Address,
        max_hops: usize,
    ) -> Vec<Route> {
        let mut routes = Vec::new();
        if token_in == token_out || max_hops == 0 {
            return routes;
        }
        let Some(start) = self.token_meta(token_in) else {
            return routes;
        };

        let mut visited: HashSet<Address> = HashSet::from([token_in]);
        let mut pools_acc: Vec<Pair> = Vec::new();
        let mut path_acc: Vec<Token> = vec![start.clone()];
        self.dfs(
            token_in,
            token_out,
            max_hops,
            &mut visited,
            &mut pools_acc,
            &mut path_acc,
            &mut routes,
        );
        debug!(
            "route enumeration: {} routes {} -> {} (max {} hops)",
            routes.len(),
            token_in,
            token_out,
            max_hops
        );
        routes
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs(
        &self,
        current: Address,
        target: Address,
        max_hops: usize,
        visited: &mut HashSet<Address>,
        pools_acc: &mut Vec<Pair>,
        path_acc: &mut Vec<Token>,
        routes: &mut Vec<Route>,
    ) {
        let Some(edges) = self.adjacency.get(&current) else {
            return;
        };
        for &idx in edges {
            let pool = &self.pairs[idx];
            let Some(next) = pool.other_token(current) else {
                continue;
            };
            if next.address == target {
                pools_acc.push(pool.clone());
                path_acc.push(next.clone());
                if let Ok(route) = Route::new(pools_acc.clone(), path_acc.clone()) {
                    routes.push(route);
                }
                pools_acc.pop();
                path_acc.pop();
                continue;
            }
            if visited.contains(&next.address) || pools_acc.len() + 1 >= max_hops {
                continue;
            }
            visited.insert(next.address);
            pools_acc.push(pool.clone());
            path_acc.push(next.clone());
            self.dfs(
                next.address,
                target,
                max_hops,
                visited,
                pools_acc,
                path_acc,
                routes,
            );
            path_acc.pop();
            pools_acc.pop();
            visited.remove(&next.address);
        }
    }

    /// Score every route by gas-adjusted net output, best first. Ties keep
    /// DFS discovery order (the sort is stable).
    pub fn compare_routes(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        gas_price_gwei: u64,
        max_hops: usize,
    ) -> Vec<RankedRoute> {
        let mut ranked: Vec<RankedRoute> = Vec::new();
        for route in self.find_all_routes(token_in, token_out, max_hops) {
            let gross = match route.output(amount_in) {
                Ok(v) => v,
                Err(e) => {
                    debug!("route {} unpriceable: {}", route.describe(), e);
                    continue;
                }
            };
            let gas_estimate = GAS_BASE + GAS_PER_HOP * route.hops() as u64;
            let gas_cost_wei =
                U256::from(gas_estimate) * U256::from(gas_price_gwei) * U256::from(1_000_000_000u64);
            let gas_cost_in_out = self.gas_cost_in_output(route.token_out(), gas_cost_wei);
            let net_output = gross.saturating_sub(gas_cost_in_out);
            ranked.push(RankedRoute {
                route,
                gross_output: gross,
                gas_cost_in_out,
                net_output,
            });
        }
        ranked.sort_by(|a, b| b.net_output.cmp(&a.net_output));
        ranked
    }

    /// Best route and its net output; `(None, 0)` when no route exists.
    pub fn find_best_route(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        gas_price_gwei: u64,
        max_hops: usize,
    ) -> (Option<Route>, U256) {
        match self
            .compare_routes(token_in, token_out, amount_in, gas_price_gwei, max_hops)
            .into_iter()
            .next()
        {
            Some(best) => (Some(best.route), best.net_output),
            None => (None, U256::ZERO),
        }
    }

    /// Convert a wei gas cost into raw units of `token_out`.
    ///
    /// WETH output pays gas natively. Otherwise the conversion rate comes
    /// from the WETH pool with the deepest WETH reserve among the pools
    /// adjacent to `token_out`, with ceil division so the cost is never
    /// understated. No adjacent WETH pool means zero cost.
    fn gas_cost_in_output(&self, token_out: &Token, gas_cost_wei: U256) -> U256 {
        if token_out.address == self.weth {
            return gas_cost_wei;
        }
        let Some(edges) = self.adjacency.get(&token_out.address) else {
            return U256::ZERO;
        };
        let best = edges
            .iter()
            .map(|&i| &self.pairs[i])
            .filter(|p| p.has_token(self.weth))
            .max_by_key(|p| {
                if p.token0.address == self.weth {
                    p.reserve0
                } else {
                    p.reserve1
                }
            });
        let Some(pool) = best else {
            return U256::ZERO;
        };
        let Ok(spot) = pool.spot_price(self.weth) else {
            return U256::ZERO;
        };
        // cost_raw = ceil(wei * spot * 10^dec_out / 10^36)
        let numerator =
            gas_cost_wei * spot * U256::from(10u8).pow(U256::from(token_out.decimals));
        let denominator = U256::from(10u8).pow(U256::from(36u8));
        let mut cost = numerator / denominator;
        if numerator % denominator != U256::ZERO {
            cost += U256::from(1);
        }
        cost
    }

    fn token_meta(&self, address: Address) -> Option<&Token> {
        self.adjacency.get(&address).and_then(|edges| {
            edges.first().map(|&i| {
                let p = &self.pairs[i];
                if p.token0.address == address {
                    &p.token0
                } else {
                    &p.token1
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    const WETH: u8 = 0xee;

    fn tok(sym: &str, n: u8, decimals: u8) -> Token {
        Token::new(sym, addr(n), decimals)
    }

    fn pool(n: u8, t0: &Token, t1: &Token, r0: u128, r1: u128) -> Pair {
        Pair::new(
            addr(n),
            t0.clone(),
            t1.clone(),
            U256::from(r0),
            U256::from(r1),
            30,
        )
        .unwrap()
    }

    /// SHIB/WETH/USDC fixture: one thin direct pool, one deep two-hop path
    fn create_test_graph() -> (RouteFinder, Token, Token) {
        let shib = tok("SHIB", 0x01, 18);
        let weth = tok("WETH", WETH, 18);
        let usdc = tok("USDC", 0x02, 6);

        let direct = pool(
            0x10,
            &shib,
            &usdc,
            4_000_000_000_000_000_000_000_000,    // 4M SHIB
            4_000_000_000_000,                    // 4M USDC
        );
        let shib_weth = pool(
            0x11,
            &shib,
            &weth,
            20_000_000_000_000_000_000_000_000,   // 20M SHIB
            10_000_000_000_000_000_000_000,       // 10k WETH
        );
        let weth_usdc = pool(
            0x12,
            &weth,
            &usdc,
            5_000_000_000_000_000_000_000,        // 5k WETH
            10_000_000_000_000,                   // 10M USDC
        );

        let finder = RouteFinder::new(vec![direct, shib_weth, weth_usdc], addr(WETH));
        (finder, shib, usdc)
    }

    #[test]
    fn test_find_all_routes_enumerates_both_paths() {
        let (finder, shib, usdc) = create_test_graph();
        let routes = finder.find_all_routes(shib.address, usdc.address, 3);
        assert_eq!(routes.len(), 2);
        // DFS order: direct pool was inserted first
        assert_eq!(routes[0].hops(), 1);
        assert_eq!(routes[1].hops(), 2);
        assert_eq!(routes[1].describe(), "SHIB -> WETH -> USDC");
    }

    #[test]
    fn test_max_hops_bound() {
        let (finder, shib, usdc) = create_test_graph();
        let routes = finder.find_all_routes(shib.address, usdc.address, 1);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].hops(), 1);
    }

    #[test]
    fn test_no_route_yields_none_and_zero() {
        let (finder, shib, _) = create_test_graph();
        let stranger = addr(0x99);
        let (route, net) =
            finder.find_best_route(shib.address, stranger, U256::from(1000u64), 1, 3);
        assert!(route.is_none());
        assert_eq!(net, U256::ZERO);
    }

    #[test]
    fn test_gas_flips_route_preference() {
        // 1M SHIB in. At 1 gwei gas is noise and the deep two-hop path wins
        // on gross output; at 500k gwei the extra hop's 100k gas costs more
        // than the two-hop gross advantage and the direct pool wins.
        let (finder, shib, usdc) = create_test_graph();
        let amount_in = U256::from(1_000_000u128 * 10u128.pow(18));

        let (cheap, _) = finder.find_best_route(shib.address, usdc.address, amount_in, 1, 3);
        assert_eq!(cheap.unwrap().hops(), 2);

        let (dear, net) =
            finder.find_best_route(shib.address, usdc.address, amount_in, 500_000, 3);
        assert_eq!(dear.unwrap().hops(), 1);
        assert!(net > U256::ZERO);
    }

    #[test]
    fn test_gas_cost_conversion_ceils() {
        let (finder, _, usdc) = create_test_graph();
        // 1 wei of gas must cost at least 1 raw USDC unit (never understate)
        let cost = finder.gas_cost_in_output(&usdc, U256::from(1u8));
        assert_eq!(cost, U256::from(1u8));
    }

    #[test]
    fn test_gas_cost_zero_without_weth_neighbor() {
        let a = tok("AAA", 0x21, 18);
        let b = tok("BBB", 0x22, 18);
        let finder = RouteFinder::new(vec![pool(0x30, &a, &b, 1000, 1000)], addr(WETH));
        assert_eq!(finder.gas_cost_in_output(&b, U256::from(10u8)), U256::ZERO);
    }

    #[test]
    fn test_compare_routes_reports_gross_and_net() {
        let (finder, shib, usdc) = create_test_graph();
        let amount_in = U256::from(1_000_000u128 * 10u128.pow(18));
        let ranked = finder.compare_routes(shib.address, usdc.address, amount_in, 1, 3);
        assert_eq!(ranked.len(), 2);
        for r in &ranked {
            assert_eq!(r.net_output, r.gross_output.saturating_sub(r.gas_cost_in_out));
        }
        assert!(ranked[0].net_output >= ranked[1].net_output);
    }
}
