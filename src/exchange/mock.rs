//! In-memory exchange used by unit tests
//!
//! Scriptable fill behavior: full fills, partial fills, rejections, and
//! artificial latency for timeout tests. Records every order it sees so
//! tests can assert on the order flow (e.g. unwind direction).
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use super::{
    ExchangeClient, ExchangeError, NormalizedOrder, OrderSide, OrderStatus, TradingFees,
};
use crate::orderbook::NormalizedOrderBook;
use crate::types::AssetBalance;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct MockExchange {
    pub book: Mutex<Option<NormalizedOrderBook>>,
    pub balances: Mutex<HashMap<String, AssetBalance>>,
    /// Fraction of a limit order that fills (1 = full, 0 = nothing)
    pub limit_fill_ratio: Mutex<Decimal>,
    /// When set, limit orders fail with this message
    pub reject_limit_orders: Mutex<Option<String>>,
    /// Artificial latency applied to order placement
    pub order_delay: Mutex<Option<Duration>>,
    /// Price at which market orders fill
    pub market_price: Mutex<Decimal>,
    /// Every order created, in placement order
    pub orders: Mutex<Vec<NormalizedOrder>>,
    next_id: AtomicU64,
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(None),
            balances: Mutex::new(HashMap::new()),
            limit_fill_ratio: Mutex::new(Decimal::ONE),
            reject_limit_orders: Mutex::new(None),
            order_delay: Mutex::new(None),
            market_price: Mutex::new(dec!(2000)),
            orders: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn set_book(&self, book: NormalizedOrderBook) {
        *self.book.lock().unwrap() = Some(book);
    }

    pub fn set_fill_ratio(&self, ratio: Decimal) {
        *self.limit_fill_ratio.lock().unwrap() = ratio;
    }

    pub fn set_balance(&self, asset: &str, free: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(asset.to_string(), AssetBalance::new(free, Decimal::ZERO));
    }

    pub fn placed_orders(&self) -> Vec<NormalizedOrder> {
        self.orders.lock().unwrap().clone()
    }

    fn record(&self, order: NormalizedOrder) -> NormalizedOrder {
        self.orders.lock().unwrap().push(order.clone());
        order
    }

    async fn maybe_delay(&self) {
        let delay = *self.order_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn init(&self) -> Result<(), ExchangeError> {
        Ok(())
    }

    async fn fetch_order_book(
        &self,
        _symbol: &str,
        _depth: usize,
    ) -> Result<NormalizedOrderBook, ExchangeError> {
        self.book
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExchangeError::Http("no book configured".into()))
    }

    async fn fetch_balance(&self) -> Result<HashMap<String, AssetBalance>, ExchangeError> {
        Ok(self.balances.lock().unwrap().clone())
    }

    async fn create_limit_ioc_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<NormalizedOrder, ExchangeError> {
        self.maybe_delay().await;
        if let Some(msg) = self.reject_limit_orders.lock().unwrap().clone() {
            return Err(ExchangeError::Rejected(msg));
        }
        let ratio = *self.limit_fill_ratio.lock().unwrap();
        let filled = amount * ratio;
        let status = if ratio >= Decimal::ONE {
            OrderStatus::Filled
        } else if ratio > Decimal::ZERO {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Expired
        };
        let order = NormalizedOrder {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            symbol: symbol.to_string(),
            side,
            price: Some(price),
            amount,
            filled,
            avg_fill_price: if filled.is_zero() { Decimal::ZERO } else { price },
            status,
            timestamp: Utc::now(),
        };
        Ok(self.record(order))
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
    ) -> Result<NormalizedOrder, ExchangeError> {
        self.maybe_delay().await;
        let px = *self.market_price.lock().unwrap();
        let order = NormalizedOrder {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            symbol: symbol.to_string(),
            side,
            price: None,
            amount,
            filled: amount,
            avg_fill_price: px,
            status: OrderStatus::Filled,
            timestamp: Utc::now(),
        };
        Ok(self.record(order))
    }

    async fn cancel_order(&self, _id: &str, _symbol: &str) -> Result<(), ExchangeError> {
        Ok(())
    }

    async fn fetch_order_status(
        &self,
        id: &str,
        _symbol: &str,
    ) -> Result<NormalizedOrder, ExchangeError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| ExchangeError::Http(format!("unknown order {}", id)))
    }

    async fn get_trading_fees(&self, _symbol: &str) -> Result<TradingFees, ExchangeError> {
        Ok(TradingFees {
            maker: dec!(0.001),
            taker: dec!(0.001),
        })
    }
}
