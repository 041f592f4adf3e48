//! REST exchange adapter (binance-style API)
//!
//! Implements ExchangeClient over the standard spot REST surface: public
//! depth endpoint, HMAC-SHA256 signed account/order endpoints. The
//! production flag selects the live base URL; otherwise the spot testnet is
//! used with testnet fee defaults.
//!
//! Author: AI-Generated
//! Created: 2026-02-14
//! Modified: 2026-03-11 - IOC status mapping hardened (NEW/CANCELED -> Expired)

use super::{
    ExchangeClient, ExchangeError, NormalizedOrder, OrderSide, OrderStatus, TradingFees,
};
use crate::orderbook::{BookLevel, NormalizedOrderBook};
use crate::types::AssetBalance;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};

const LIVE_BASE: &str = "https://api.binance.com";
const TESTNET_BASE: &str = "https://testnet.binance.vision";
const RECV_WINDOW_MS: u64 = 5_000;

type HmacSha256 = Hmac<Sha256>;

pub struct RestExchange {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    production: bool,
}

// ── wire structs ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DepthResponse {
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    balances: Vec<WireBalance>,
}

#[derive(Deserialize)]
struct WireBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    symbol: String,
    side: String,
    status: String,
    #[serde(default)]
    price: Option<String>,
    orig_qty: String,
    executed_qty: String,
    #[serde(default)]
    cummulative_quote_qty: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeFeeEntry {
    #[allow(dead_code)]
    symbol: String,
    maker_commission: String,
    taker_commission: String,
}

impl RestExchange {
    pub fn new(api_key: String, api_secret: String, production: bool) -> Self {
        let base_url = if production { LIVE_BASE } else { TESTNET_BASE };
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            api_key,
            api_secret,
            production,
        }
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(query.as_bytes());
        alloy::hex::encode(mac.finalize().into_bytes())
    }

    fn signed_query(&self, params: &str) -> String {
        let stamped = format!(
            "{}{}timestamp={}&recvWindow={}",
            params,
            if params.is_empty() { "" } else { "&" },
            Utc::now().timestamp_millis(),
            RECV_WINDOW_MS
        );
        let signature = self.sign(&stamped);
        format!("{}&signature={}", stamped, signature)
    }

    async fn get_public(&self, path: &str, query: &str) -> Result<String, ExchangeError> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?;
        Self::read_body(resp).await
    }

    async fn request_signed(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &str,
    ) -> Result<String, ExchangeError> {
        let query = self.signed_query(params);
        let url = format!("{}{}?{}", self.base_url, path, query);
        let resp = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?;
        Self::read_body(resp).await
    }

    async fn read_body(resp: reqwest::Response) -> Result<String, ExchangeError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Http(e.to_string()))?;
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiError>(&body) {
                return Err(ExchangeError::Api {
                    code: err.code,
                    message: err.msg,
                });
            }
            return Err(ExchangeError::Http(format!("{}: {}", status, body)));
        }
        Ok(body)
    }

    fn parse_decimal(s: &str) -> Result<Decimal, ExchangeError> {
        Decimal::from_str(s).map_err(|e| ExchangeError::Parse(format!("{}: {}", s, e)))
    }

    fn parse_order(body: &str) -> Result<NormalizedOrder, ExchangeError> {
        let wire: OrderResponse =
            serde_json::from_str(body).map_err(|e| ExchangeError::Parse(e.to_string()))?;

        let side = match wire.side.as_str() {
            "BUY" => OrderSide::Buy,
            "SELL" => OrderSide::Sell,
            other => return Err(ExchangeError::Parse(format!("unknown side {}", other))),
        };
        // IOC orders come back terminal. NEW/CANCELED map to Expired: either
        // way the remainder will never fill.
        let status = match wire.status.as_str() {
            "FILLED" => OrderStatus::Filled,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "EXPIRED" | "CANCELED" | "NEW" => OrderStatus::Expired,
            "REJECTED" => return Err(ExchangeError::Rejected(wire.status)),
            other => {
                warn!("unexpected order status {}, treating as expired", other);
                OrderStatus::Expired
            }
        };

        let filled = Self::parse_decimal(&wire.executed_qty)?;
        let quote_qty = wire
            .cummulative_quote_qty
            .as_deref()
            .map(Self::parse_decimal)
            .transpose()?
            .unwrap_or(Decimal::ZERO);
        let avg_fill_price = if filled.is_zero() {
            Decimal::ZERO
        } else {
            quote_qty / filled
        };

        Ok(NormalizedOrder {
            id: wire.order_id.to_string(),
            symbol: wire.symbol,
            side,
            price: wire.price.as_deref().map(Self::parse_decimal).transpose()?,
            amount: Self::parse_decimal(&wire.orig_qty)?,
            filled,
            avg_fill_price,
            status,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl ExchangeClient for RestExchange {
    async fn init(&self) -> Result<(), ExchangeError> {
        self.get_public("/api/v3/ping", "").await?;
        debug!(
            "exchange reachable at {} ({})",
            self.base_url,
            if self.production { "live" } else { "testnet" }
        );
        Ok(())
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> Result<NormalizedOrderBook, ExchangeError> {
        let body = self
            .get_public(
                "/api/v3/depth",
                &format!("symbol={}&limit={}", symbol, depth),
            )
            .await?;
        let wire: DepthResponse =
            serde_json::from_str(&body).map_err(|e| ExchangeError::Parse(e.to_string()))?;

        let parse_side = |levels: &[(String, String)]| -> Result<Vec<BookLevel>, ExchangeError> {
            levels
                .iter()
                .map(|(p, q)| {
                    Ok(BookLevel::new(
                        Self::parse_decimal(p)?,
                        Self::parse_decimal(q)?,
                    ))
                })
                .collect()
        };

        NormalizedOrderBook::new(symbol, Utc::now(), parse_side(&wire.bids)?, parse_side(&wire.asks)?)
            .map_err(|e| ExchangeError::Parse(e.to_string()))
    }

    async fn fetch_balance(&self) -> Result<HashMap<String, AssetBalance>, ExchangeError> {
        let body = self
            .request_signed(reqwest::Method::GET, "/api/v3/account", "")
            .await?;
        let wire: AccountResponse =
            serde_json::from_str(&body).map_err(|e| ExchangeError::Parse(e.to_string()))?;

        let mut out = HashMap::new();
        for bal in wire.balances {
            let free = Self::parse_decimal(&bal.free)?;
            let locked = Self::parse_decimal(&bal.locked)?;
            if free.is_zero() && locked.is_zero() {
                continue;
            }
            out.insert(bal.asset, AssetBalance::new(free, locked));
        }
        Ok(out)
    }

    async fn create_limit_ioc_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<NormalizedOrder, ExchangeError> {
        let params = format!(
            "symbol={}&side={}&type=LIMIT&timeInForce=IOC&quantity={}&price={}",
            symbol, side, amount, price
        );
        let body = self
            .request_signed(reqwest::Method::POST, "/api/v3/order", &params)
            .await?;
        Self::parse_order(&body)
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
    ) -> Result<NormalizedOrder, ExchangeError> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}",
            symbol, side, amount
        );
        let body = self
            .request_signed(reqwest::Method::POST, "/api/v3/order", &params)
            .await?;
        Self::parse_order(&body)
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<(), ExchangeError> {
        self.request_signed(
            reqwest::Method::DELETE,
            "/api/v3/order",
            &format!("symbol={}&orderId={}", symbol, id),
        )
        .await?;
        Ok(())
    }

    async fn fetch_order_status(
        &self,
        id: &str,
        symbol: &str,
    ) -> Result<NormalizedOrder, ExchangeError> {
        let body = self
            .request_signed(
                reqwest::Method::GET,
                "/api/v3/order",
                &format!("symbol={}&orderId={}", symbol, id),
            )
            .await?;
        Self::parse_order(&body)
    }

    async fn get_trading_fees(&self, symbol: &str) -> Result<TradingFees, ExchangeError> {
        if !self.production {
            // Testnet has no fee endpoint; use the standard taker tier
            return Ok(TradingFees {
                maker: Decimal::new(10, 4),
                taker: Decimal::new(10, 4),
            });
        }
        let body = self
            .request_signed(
                reqwest::Method::GET,
                "/sapi/v1/asset/tradeFee",
                &format!("symbol={}", symbol),
            )
            .await?;
        let entries: Vec<TradeFeeEntry> =
            serde_json::from_str(&body).map_err(|e| ExchangeError::Parse(e.to_string()))?;
        let entry = entries
            .first()
            .ok_or_else(|| ExchangeError::Parse(format!("no fee entry for {}", symbol)))?;
        Ok(TradingFees {
            maker: Self::parse_decimal(&entry.maker_commission)?,
            taker: Self::parse_decimal(&entry.taker_commission)?,
        })
    }
}
