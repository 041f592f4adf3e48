//! Signal generator
//!
//! Joins the CEX order book with two simulated DEX quotes into a directional
//! signal with projected economics. The DEX is priced from both sides
//! because a constant-product pool has no single price: selling `size` base
//! gives the exit price, buying base with `size * ask` quote gives the entry
//! price, each with its own slippage baked in.
//!
//! Per-pair cooldown keeps the generator from re-emitting on every tick
//! while an opportunity persists.
//!
//! Author: AI-Generated
//! Created: 2026-02-21
//! Modified: 2026-03-20 - inventory gate with 1.01 quote buffer

use crate::exchange::ExchangeClient;
use crate::inventory::InventoryTracker;
use crate::pricing::PricingEngine;
use crate::types::{Direction, MarketPair, Signal, TokenAmount};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Safety buffer on the quote balance needed to buy (covers fee + drift)
const QUOTE_BUFFER: Decimal = dec!(1.01);

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub min_spread_bps: Decimal,
    pub min_profit_usd: Decimal,
    pub cooldown_secs: i64,
    pub signal_ttl_secs: i64,
    /// CEX taker fee in bps
    pub cex_taker_bps: Decimal,
    /// DEX swap fee in bps
    pub dex_swap_bps: Decimal,
    /// Flat gas estimate per DEX leg in USD
    pub gas_usd: Decimal,
    pub cex_venue: String,
    pub wallet_venue: String,
    pub orderbook_depth: usize,
}

pub struct SignalGenerator {
    exchange: Arc<dyn ExchangeClient>,
    pricing: Arc<PricingEngine>,
    config: GeneratorConfig,
    last_signal: HashMap<String, DateTime<Utc>>,
}

impl SignalGenerator {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        pricing: Arc<PricingEngine>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            exchange,
            pricing,
            config,
            last_signal: HashMap::new(),
        }
    }

    fn in_cooldown(&self, pair: &MarketPair, now: DateTime<Utc>) -> bool {
        self.last_signal
            .get(&pair.cex_symbol)
            .map(|last| now - *last < Duration::seconds(self.config.cooldown_secs))
            .unwrap_or(false)
    }

    /// Effective DEX price for selling `size` base, from a simulated quote
    async fn dex_sell_price(
        &self,
        pair: &MarketPair,
        size: Decimal,
        gas_gwei: u64,
    ) -> anyhow::Result<Option<Decimal>> {
        let amount_in = TokenAmount::from_decimal(size, pair.base.decimals)?;
        let quote = match self
            .pricing
            .get_quote(pair.base.address, pair.quote.address, amount_in.raw, gas_gwei)
            .await
        {
            Ok(q) => q,
            Err(e) => {
                debug!("{}: sell quote unavailable: {}", pair.name(), e);
                return Ok(None);
            }
        };
        if quote.simulated_output.is_zero() {
            return Ok(None);
        }
        let out = TokenAmount::new(quote.simulated_output, pair.quote.decimals).to_decimal()?;
        Ok(Some(out / size))
    }

    /// Effective DEX price for buying base by spending `spend` quote
    async fn dex_buy_price(
        &self,
        pair: &MarketPair,
        spend: Decimal,
        gas_gwei: u64,
    ) -> anyhow::Result<Option<Decimal>> {
        let amount_in = TokenAmount::from_decimal(spend, pair.quote.decimals)?;
        let quote = match self
            .pricing
            .get_quote(pair.quote.address, pair.base.address, amount_in.raw, gas_gwei)
            .await
        {
            Ok(q) => q,
            Err(e) => {
                debug!("{}: buy quote unavailable: {}", pair.name(), e);
                return Ok(None);
            }
        };
        if quote.simulated_output.is_zero() {
            return Ok(None);
        }
        let base_out = TokenAmount::new(quote.simulated_output, pair.base.decimals).to_decimal()?;
        if base_out.is_zero() {
            return Ok(None);
        }
        Ok(Some(spend / base_out))
    }

    /// Total fee load in bps for a given trade value
    fn total_fee_bps(&self, trade_value: Decimal) -> Decimal {
        let gas_bps = if trade_value.is_zero() {
            Decimal::ZERO
        } else {
            self.config.gas_usd / trade_value * dec!(10000)
        };
        self.config.cex_taker_bps + self.config.dex_swap_bps + gas_bps
    }

    fn inventory_ok(
        &self,
        pair: &MarketPair,
        direction: Direction,
        size: Decimal,
        cex_ask: Decimal,
        dex_buy: Decimal,
        inventory: &InventoryTracker,
    ) -> bool {
        let (verdict, what) = match direction {
            Direction::BuyCexSellDex => (
                inventory.can_execute(
                    &self.config.cex_venue,
                    &pair.quote.symbol,
                    size * cex_ask * QUOTE_BUFFER,
                    &self.config.wallet_venue,
                    &pair.base.symbol,
                    size,
                ),
                "cex quote / wallet base",
            ),
            Direction::BuyDexSellCex => (
                inventory.can_execute(
                    &self.config.wallet_venue,
                    &pair.quote.symbol,
                    size * dex_buy * QUOTE_BUFFER,
                    &self.config.cex_venue,
                    &pair.base.symbol,
                    size,
                ),
                "wallet quote / cex base",
            ),
        };
        if !verdict.ok {
            info!(
                "{}: inventory blocks {} ({}): {}",
                pair.name(),
                direction,
                what,
                verdict.detail.unwrap_or_default()
            );
        }
        verdict.ok
    }

    /// Run the full generation pipeline for one pair. Ok(None) means "no
    /// opportunity right now" and is the common case.
    pub async fn generate(
        &mut self,
        pair: &MarketPair,
        size: Decimal,
        gas_gwei: u64,
        inventory: &InventoryTracker,
    ) -> anyhow::Result<Option<Signal>> {
        let now = Utc::now();
        if size <= Decimal::ZERO {
            anyhow::bail!("signal size must be positive, got {}", size);
        }
        if self.in_cooldown(pair, now) {
            return Ok(None);
        }

        let book = self
            .exchange
            .fetch_order_book(&pair.cex_symbol, self.config.orderbook_depth)
            .await?;
        let cex_bid = book.best_bid();
        let cex_ask = book.best_ask();

        let Some(dex_sell) = self.dex_sell_price(pair, size, gas_gwei).await? else {
            return Ok(None);
        };
        let Some(dex_buy) = self.dex_buy_price(pair, size * cex_ask, gas_gwei).await? else {
            return Ok(None);
        };

        // Candidate spreads, both directions
        let spread_buy_cex = (dex_sell - cex_ask) / cex_ask * dec!(10000);
        let spread_buy_dex = (cex_bid - dex_buy) / dex_buy * dec!(10000);

        let (direction, spread_bps, cex_price, dex_price) = if spread_buy_cex >= spread_buy_dex {
            (Direction::BuyCexSellDex, spread_buy_cex, cex_ask, dex_sell)
        } else {
            (Direction::BuyDexSellCex, spread_buy_dex, cex_bid, dex_buy)
        };

        if spread_bps < self.config.min_spread_bps {
            debug!(
                "{}: best spread {:.2} bps below minimum {}",
                pair.name(),
                spread_bps,
                self.config.min_spread_bps
            );
            return Ok(None);
        }

        let trade_value = size * cex_price;
        let expected_gross = spread_bps / dec!(10000) * trade_value;
        let expected_fees = self.total_fee_bps(trade_value) / dec!(10000) * trade_value;
        let expected_net = expected_gross - expected_fees;

        if expected_net < self.config.min_profit_usd {
            debug!(
                "{}: net {} below minimum profit {}",
                pair.name(),
                expected_net.round_dp(4),
                self.config.min_profit_usd
            );
            return Ok(None);
        }

        if !self.inventory_ok(pair, direction, size, cex_ask, dex_buy, inventory) {
            return Ok(None);
        }

        self.last_signal.insert(pair.cex_symbol.clone(), now);

        let signal = Signal {
            id: Uuid::new_v4(),
            pair: pair.clone(),
            direction,
            cex_price,
            dex_price,
            spread_bps,
            size,
            expected_gross,
            expected_fees,
            expected_net,
            score: 0.0,
            timestamp: now,
            expiry: now + Duration::seconds(self.config.signal_ttl_secs),
            inventory_ok: true,
            within_limits: true,
        };
        info!(
            "🎯 {} {} | spread {:.1} bps | cex {} dex {} | net ~{} USD",
            pair.name(),
            direction,
            spread_bps,
            cex_price.round_dp(4),
            dex_price.round_dp(4),
            expected_net.round_dp(2)
        );
        Ok(Some(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::Pair;
    use crate::exchange::mock::MockExchange;
    use crate::orderbook::{BookLevel, NormalizedOrderBook};
    use crate::pricing::engine::tests::{EchoSimulator, StubSource};
    use crate::types::Token;
    use alloy::primitives::{Address, U256};

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn create_test_pair() -> MarketPair {
        MarketPair::new(
            Token::new("WETH", addr(0xee), 18),
            Token::new("USDC", addr(0x02), 6),
            "ETHUSDC",
        )
    }

    /// Pool priced near `usdc_per_eth` with deep reserves (low slippage)
    async fn create_test_pricing(usdc_per_eth: u128) -> Arc<PricingEngine> {
        let weth = Token::new("WETH", addr(0xee), 18);
        let usdc = Token::new("USDC", addr(0x02), 6);
        let pool = Pair::new(
            addr(0x10),
            weth,
            usdc,
            U256::from(10_000u128 * 10u128.pow(18)),
            U256::from(10_000u128 * usdc_per_eth * 10u128.pow(6)),
            30,
        )
        .unwrap();
        let engine = PricingEngine::new(
            Arc::new(StubSource::new(vec![pool])),
            Arc::new(EchoSimulator::exact()),
            addr(0xee),
            addr(0x99),
            3,
        );
        engine.load_pools(&[addr(0x10)]).await.unwrap();
        Arc::new(engine)
    }

    fn create_test_book(bid: Decimal, ask: Decimal) -> NormalizedOrderBook {
        NormalizedOrderBook::new(
            "ETHUSDC",
            Utc::now(),
            vec![BookLevel::new(bid, dec!(10))],
            vec![BookLevel::new(ask, dec!(10))],
        )
        .unwrap()
    }

    fn create_test_config() -> GeneratorConfig {
        GeneratorConfig {
            min_spread_bps: dec!(20),
            min_profit_usd: dec!(0.5),
            cooldown_secs: 30,
            signal_ttl_secs: 10,
            cex_taker_bps: dec!(10),
            dex_swap_bps: dec!(30),
            gas_usd: dec!(0.5),
            cex_venue: "binance".into(),
            wallet_venue: "wallet".into(),
            orderbook_depth: 20,
        }
    }

    fn funded_inventory() -> InventoryTracker {
        let mut inv = InventoryTracker::new();
        inv.update_from_cex(
            "binance",
            HashMap::from([
                (
                    "USDC".to_string(),
                    crate::types::AssetBalance::new(dec!(100000), Decimal::ZERO),
                ),
                (
                    "WETH".to_string(),
                    crate::types::AssetBalance::new(dec!(50), Decimal::ZERO),
                ),
            ]),
        );
        inv.update_from_wallet(
            "wallet",
            HashMap::from([
                ("WETH".to_string(), dec!(50)),
                ("USDC".to_string(), dec!(100000)),
            ]),
        );
        inv
    }

    #[tokio::test]
    async fn test_generates_buy_cex_sell_dex() {
        // DEX at ~2100, CEX ask 2000: buy CEX, sell DEX
        let exchange = Arc::new(MockExchange::new());
        exchange.set_book(create_test_book(dec!(1999), dec!(2000)));
        let pricing = create_test_pricing(2100).await;
        let mut generator =
            SignalGenerator::new(exchange, pricing, create_test_config());

        let signal = generator
            .generate(&create_test_pair(), dec!(1), 30, &funded_inventory())
            .await
            .unwrap()
            .expect("signal expected");

        assert_eq!(signal.direction, Direction::BuyCexSellDex);
        assert_eq!(signal.cex_price, dec!(2000));
        assert!(signal.spread_bps > dec!(400));
        assert_eq!(
            signal.expected_net,
            signal.expected_gross - signal.expected_fees
        );
        assert!(signal.expiry > signal.timestamp);
        assert!(signal.inventory_ok);
    }

    #[tokio::test]
    async fn test_generates_buy_dex_sell_cex() {
        // DEX at ~1900, CEX bid 1999: buy DEX, sell CEX
        let exchange = Arc::new(MockExchange::new());
        exchange.set_book(create_test_book(dec!(1999), dec!(2000)));
        let pricing = create_test_pricing(1900).await;
        let mut generator =
            SignalGenerator::new(exchange, pricing, create_test_config());

        let signal = generator
            .generate(&create_test_pair(), dec!(1), 30, &funded_inventory())
            .await
            .unwrap()
            .expect("signal expected");

        assert_eq!(signal.direction, Direction::BuyDexSellCex);
        assert_eq!(signal.cex_price, dec!(1999));
    }

    #[tokio::test]
    async fn test_no_signal_when_spread_too_small() {
        // DEX and CEX in line
        let exchange = Arc::new(MockExchange::new());
        exchange.set_book(create_test_book(dec!(1999), dec!(2000)));
        let pricing = create_test_pricing(2000).await;
        let mut generator =
            SignalGenerator::new(exchange, pricing, create_test_config());

        let signal = generator
            .generate(&create_test_pair(), dec!(1), 30, &funded_inventory())
            .await
            .unwrap();
        assert!(signal.is_none());
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_second_signal() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_book(create_test_book(dec!(1999), dec!(2000)));
        let pricing = create_test_pricing(2100).await;
        let mut generator =
            SignalGenerator::new(exchange, pricing, create_test_config());
        let inventory = funded_inventory();

        let first = generator
            .generate(&create_test_pair(), dec!(1), 30, &inventory)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = generator
            .generate(&create_test_pair(), dec!(1), 30, &inventory)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_inventory_shortfall_blocks_signal() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_book(create_test_book(dec!(1999), dec!(2000)));
        let pricing = create_test_pricing(2100).await;
        let mut generator =
            SignalGenerator::new(exchange, pricing, create_test_config());

        // buying on the CEX needs ~2020 USDC there; give it only 100
        let mut inventory = InventoryTracker::new();
        inventory.update_from_cex(
            "binance",
            HashMap::from([(
                "USDC".to_string(),
                crate::types::AssetBalance::new(dec!(100), Decimal::ZERO),
            )]),
        );
        inventory.update_from_wallet(
            "wallet",
            HashMap::from([("WETH".to_string(), dec!(50))]),
        );

        let signal = generator
            .generate(&create_test_pair(), dec!(1), 30, &inventory)
            .await
            .unwrap();
        assert!(signal.is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_size() {
        let exchange = Arc::new(MockExchange::new());
        let pricing = create_test_pricing(2000).await;
        let mut generator =
            SignalGenerator::new(exchange, pricing, create_test_config());
        assert!(generator
            .generate(&create_test_pair(), Decimal::ZERO, 30, &funded_inventory())
            .await
            .is_err());
    }
}
