//! Core data structures shared across the engine
//!
//! Tokens, amounts, trade direction, and the Signal type that flows from the
//! generator through the gates into the executor.
//!
//! Decimal/integer boundary: raw on-chain amounts are U256, CEX-side money is
//! rust_decimal. Every crossing goes through TokenAmount with an explicit
//! decimals field — nothing else converts.
//!
//! Author: AI-Generated
//! Created: 2026-02-10
//! Modified: 2026-03-04 - Signal validity consolidated into is_valid()

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors crossing the integer/decimal boundary
#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("amount does not fit in a decimal: {0}")]
    Overflow(String),
    #[error("negative amount cannot become a raw token amount")]
    Negative,
    #[error("unsupported token decimals: {0}")]
    BadDecimals(u8),
}

/// An ERC-20 style token. Identity is the address; symbol and decimals are
/// display/conversion metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        // Address is identity; Address equality is byte-wise, and the
        // EIP-55 mixed-case form only exists at the display layer.
        self.address == other.address
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A raw on-chain token amount tied to its decimals.
///
/// This is the only sanctioned bridge between integer AMM math and the
/// decimal CEX/P&L world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub raw: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Convert to a human-unit Decimal.
    ///
    /// Fails for amounts beyond 2^127 raw units or decimals beyond
    /// rust_decimal's 28-digit scale. Real tokens sit far inside both bounds.
    pub fn to_decimal(&self) -> Result<Decimal, AmountError> {
        if self.decimals > 28 {
            return Err(AmountError::BadDecimals(self.decimals));
        }
        let v: u128 = self
            .raw
            .try_into()
            .map_err(|_| AmountError::Overflow(self.raw.to_string()))?;
        if v > i128::MAX as u128 {
            return Err(AmountError::Overflow(self.raw.to_string()));
        }
        Decimal::try_from_i128_with_scale(v as i128, self.decimals as u32)
            .map_err(|_| AmountError::Overflow(self.raw.to_string()))
    }

    /// Convert a human-unit Decimal into raw units, truncating sub-unit dust.
    pub fn from_decimal(value: Decimal, decimals: u8) -> Result<Self, AmountError> {
        if value.is_sign_negative() {
            return Err(AmountError::Negative);
        }
        if decimals > 28 {
            return Err(AmountError::BadDecimals(decimals));
        }
        let mut scaled = value.trunc_with_scale(decimals as u32);
        scaled.rescale(decimals as u32);
        let units = scaled
            .mantissa()
            .to_u128()
            .ok_or_else(|| AmountError::Overflow(value.to_string()))?;
        Ok(Self {
            raw: U256::from(units),
            decimals,
        })
    }
}

/// Per-asset balance at one venue. Total is always free + locked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn new(free: Decimal, locked: Decimal) -> Self {
        Self { free, locked }
    }

    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// A market traded on both venues: base/quote on the DEX side,
/// `cex_symbol` on the order-book side.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketPair {
    pub base: Token,
    pub quote: Token,
    pub cex_symbol: String,
}

impl MarketPair {
    pub fn new(base: Token, quote: Token, cex_symbol: impl Into<String>) -> Self {
        Self {
            base,
            quote,
            cex_symbol: cex_symbol.into(),
        }
    }

    /// Display name, e.g. "WETH/USDC"
    pub fn name(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }
}

/// Which venue we buy on and which we sell on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    BuyCexSellDex,
    BuyDexSellCex,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::BuyCexSellDex => write!(f, "BUY_CEX_SELL_DEX"),
            Direction::BuyDexSellCex => write!(f, "BUY_DEX_SELL_CEX"),
        }
    }
}

/// A scored, directional arbitrage opportunity.
///
/// Created by the signal generator, read by the gates and the executor,
/// discarded after the execution context reaches a terminal state. Immutable
/// except for `score`, which the scorer fills in after generation.
#[derive(Debug, Clone)]
pub struct Signal {
    pub id: Uuid,
    pub pair: MarketPair,
    pub direction: Direction,
    /// CEX touch price for the taking side (ask when buying, bid when selling)
    pub cex_price: Decimal,
    /// Effective DEX price implied by the simulated quote
    pub dex_price: Decimal,
    pub spread_bps: Decimal,
    /// Trade size in base token units
    pub size: Decimal,
    pub expected_gross: Decimal,
    pub expected_fees: Decimal,
    pub expected_net: Decimal,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub inventory_ok: bool,
    pub within_limits: bool,
}

impl Signal {
    /// Trade value in quote units at the CEX touch
    pub fn trade_value(&self) -> Decimal {
        self.size * self.cex_price
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Executable iff unexpired, inventory-backed, inside limits, with a
    /// positive projected net and a positive score.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
            && self.inventory_ok
            && self.within_limits
            && self.expected_net > Decimal::ZERO
            && self.score > 0.0
    }
}
