//! Constant-product pair math
//!
//! Pure integer x*y=k pricing with the fee applied multiplicatively on the
//! input side, matching the canonical V2 router formulas so our numbers are
//! bit-for-bit what the chain would produce. Fee is parameterized in basis
//! points instead of the hardcoded 997/1000.
//!
//! Pairs are immutable value objects: simulating a swap yields a new Pair
//! with updated reserves, which is what makes hypothetical multi-hop routing
//! possible without mutating engine state.
//!
//! Author: AI-Generated
//! Created: 2026-02-11
//! Modified: 2026-02-19 - spot_price made decimals-aware (Q18)

use crate::types::Token;
use alloy::primitives::{Address, U256};
use thiserror::Error;

/// Standard V2 swap fee: 30 bps = 0.3%
pub const DEFAULT_FEE_BPS: u32 = 30;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error, PartialEq)]
pub enum AmmError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient liquidity in pool {0}")]
    InsufficientLiquidity(Address),
    #[error("token {token} is not in pool {pool}")]
    UnknownToken { pool: Address, token: Address },
}

/// One constant-product pool. Immutable; `simulate_swap` returns a new Pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub reserve0: U256,
    pub reserve1: U256,
    pub fee_bps: u32,
}

impl Pair {
    pub fn new(
        address: Address,
        token0: Token,
        token1: Token,
        reserve0: U256,
        reserve1: U256,
        fee_bps: u32,
    ) -> Result<Self, AmmError> {
        if fee_bps >= BPS_DENOMINATOR as u32 {
            return Err(AmmError::InvalidInput(format!(
                "fee_bps {} out of range [0, 10000)",
                fee_bps
            )));
        }
        if token0.address == token1.address {
            return Err(AmmError::InvalidInput(format!(
                "pool {} has identical tokens",
                address
            )));
        }
        Ok(Self {
            address,
            token0,
            token1,
            reserve0,
            reserve1,
            fee_bps,
        })
    }

    pub fn has_token(&self, token: Address) -> bool {
        self.token0.address == token || self.token1.address == token
    }

    /// The opposite token of `token`, if `token` is in the pool
    pub fn other_token(&self, token: Address) -> Option<&Token> {
        if self.token0.address == token {
            Some(&self.token1)
        } else if self.token1.address == token {
            Some(&self.token0)
        } else {
            None
        }
    }

    /// Reserves and token metadata oriented for a swap entering with `token_in`
    fn oriented(&self, token_in: Address) -> Result<(U256, U256, &Token, &Token), AmmError> {
        if self.token0.address == token_in {
            Ok((self.reserve0, self.reserve1, &self.token0, &self.token1))
        } else if self.token1.address == token_in {
            Ok((self.reserve1, self.reserve0, &self.token1, &self.token0))
        } else {
            Err(AmmError::UnknownToken {
                pool: self.address,
                token: token_in,
            })
        }
    }

    /// Output amount for `amount_in` of `token_in`.
    ///
    /// amountOut = aif * reserveOut / (reserveIn * 10000 + aif)
    /// with aif = amountIn * (10000 - feeBps), floor division.
    pub fn amount_out(&self, amount_in: U256, token_in: Address) -> Result<U256, AmmError> {
        if amount_in.is_zero() {
            return Err(AmmError::InvalidInput("amount_in must be positive".into()));
        }
        let (reserve_in, reserve_out, _, _) = self.oriented(token_in)?;
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(AmmError::InsufficientLiquidity(self.address));
        }

        let aif = amount_in * U256::from(BPS_DENOMINATOR - self.fee_bps as u64);
        let numerator = aif * reserve_out;
        let denominator = reserve_in * U256::from(BPS_DENOMINATOR) + aif;
        Ok(numerator / denominator)
    }

    /// Input amount needed to withdraw `amount_out` of `token_out`.
    ///
    /// amountIn = reserveIn * amountOut * 10000
    ///          / ((reserveOut - amountOut) * (10000 - feeBps)) + 1  (ceil)
    pub fn amount_in(&self, amount_out: U256, token_out: Address) -> Result<U256, AmmError> {
        if amount_out.is_zero() {
            return Err(AmmError::InvalidInput("amount_out must be positive".into()));
        }
        let token_in = self
            .other_token(token_out)
            .ok_or(AmmError::UnknownToken {
                pool: self.address,
                token: token_out,
            })?
            .address;
        let (reserve_in, reserve_out, _, _) = self.oriented(token_in)?;
        if reserve_in.is_zero() || amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity(self.address));
        }

        let numerator = reserve_in * amount_out * U256::from(BPS_DENOMINATOR);
        let denominator =
            (reserve_out - amount_out) * U256::from(BPS_DENOMINATOR - self.fee_bps as u64);
        Ok(numerator / denominator + U256::from(1))
    }

    /// Marginal price of `token_in` in `token_out`, decimals-adjusted and
    /// scaled by 10^18 (Q18 fixed point):
    ///
    ///   spot = reserveOut * 10^18 * 10^decIn / (reserveIn * 10^decOut)
    ///
    /// i.e. human-unit tokenOut-per-tokenIn times 1e18.
    pub fn spot_price(&self, token_in: Address) -> Result<U256, AmmError> {
        let (reserve_in, reserve_out, tin, tout) = self.oriented(token_in)?;
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(AmmError::InsufficientLiquidity(self.address));
        }
        let numerator = reserve_out
            * U256::from(10u8).pow(U256::from(18u8))
            * U256::from(10u8).pow(U256::from(tin.decimals));
        let denominator = reserve_in * U256::from(10u8).pow(U256::from(tout.decimals));
        Ok(numerator / denominator)
    }

    /// Apply a swap hypothetically: returns a new Pair with post-trade
    /// reserves. Fails rather than underflow the output reserve.
    pub fn simulate_swap(&self, amount_in: U256, token_in: Address) -> Result<Pair, AmmError> {
        let out = self.amount_out(amount_in, token_in)?;
        let mut next = self.clone();
        if self.token0.address == token_in {
            next.reserve0 = self.reserve0 + amount_in;
            next.reserve1 = self
                .reserve1
                .checked_sub(out)
                .ok_or(AmmError::InsufficientLiquidity(self.address))?;
        } else {
            next.reserve1 = self.reserve1 + amount_in;
            next.reserve0 = self
                .reserve0
                .checked_sub(out)
                .ok_or(AmmError::InsufficientLiquidity(self.address))?;
        }
        Ok(next)
    }
}
