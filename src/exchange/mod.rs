//! CEX order-book exchange interface
//!
//! The engine consumes the exchange through the `ExchangeClient` trait; the
//! REST adapter in `rest` implements it against a binance-style API. Tests
//! use the in-memory mock.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

pub mod rest;

#[cfg(test)]
pub mod mock;

use crate::orderbook::NormalizedOrderBook;
use crate::types::AssetBalance;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(String),
    #[error("exchange rejected request ({code}): {message}")]
    Api { code: i64, message: String },
    #[error("unexpected payload: {0}")]
    Parse(String),
    #[error("order rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Terminal-ish order states the engine distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Filled,
    PartiallyFilled,
    Expired,
}

/// Venue-agnostic order snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOrder {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    /// Limit price; None for market orders
    pub price: Option<Decimal>,
    pub amount: Decimal,
    pub filled: Decimal,
    /// Size-weighted average fill price, zero when unfilled
    pub avg_fill_price: Decimal,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedOrder {
    pub fn fill_ratio(&self) -> Decimal {
        if self.amount.is_zero() {
            Decimal::ZERO
        } else {
            self.filled / self.amount
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradingFees {
    pub maker: Decimal,
    pub taker: Decimal,
}

/// The contract the core consumes. All methods suspend on I/O.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Connectivity / clock check; call once before trading
    async fn init(&self) -> Result<(), ExchangeError>;

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<NormalizedOrderBook, ExchangeError>;

    async fn fetch_balance(&self) -> Result<HashMap<String, AssetBalance>, ExchangeError>;

    async fn create_limit_ioc_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<NormalizedOrder, ExchangeError>;

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
    ) -> Result<NormalizedOrder, ExchangeError>;

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<(), ExchangeError>;

    async fn fetch_order_status(
        &self,
        id: &str,
        symbol: &str,
    ) -> Result<NormalizedOrder, ExchangeError>;

    async fn get_trading_fees(&self, symbol: &str) -> Result<TradingFees, ExchangeError>;
}
