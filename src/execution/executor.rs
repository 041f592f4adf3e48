//! Two-leg atomic-ish executor
//!
//! Sequences the CEX and DEX legs of a signal through the state machine:
//! validation (breaker, replay, signal freshness), leg1, leg2, and unwind
//! when leg2 dies with leg1 already filled. Each leg races a timeout;
//! whichever resolves first wins. Leg2 never starts before leg1 reports
//! success, and unwind runs only after leg2 has terminated.
//!
//! Ordering is configurable: DEX-first suits private-mempool submission,
//! CEX-first keeps the faster venue as the exit. The responsibilities are
//! symmetric apart from which leg runs first.
//!
//! Author: AI-Generated
//! Created: 2026-02-25
//! Modified: 2026-03-27 - unwind exceptions terminate in FAILED, not panic
//! Modified: 2026-04-14 - inventory deltas applied on every fill

use super::circuit_breaker::CircuitBreaker;
use super::replay::ReplayGuard;
use super::state::{ExecutionContext, ExecutionState, LegFill, Venue};
use crate::exchange::{ExchangeClient, OrderSide, OrderStatus};
use crate::inventory::{InventoryTracker, TradeSide};
use crate::pricing::PricingEngine;
use crate::types::{Direction, Signal, TokenAmount};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Marketable-limit offset: 0.1% through the touch on either side
const IOC_PRICE_OFFSET: Decimal = dec!(0.001);
/// Flat two-side taker + swap fee approximation used for realized P&L
const FEE_APPROX_RATE: Decimal = dec!(0.004);
/// CEX taker rate applied to inventory deltas
const CEX_TAKER_RATE: Decimal = dec!(0.001);

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Run the DEX leg first (private-mempool style) instead of the CEX leg
    pub dex_first: bool,
    pub leg1_timeout_secs: u64,
    pub leg2_timeout_secs: u64,
    /// Minimum acceptable fill on the CEX leg (0.8 = 80%)
    pub min_fill_ratio: Decimal,
    pub cex_venue: String,
    pub wallet_venue: String,
    pub breaker_failure_threshold: usize,
    pub breaker_window_secs: i64,
    pub breaker_cooldown_secs: i64,
    pub replay_ttl_secs: i64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            dex_first: false,
            leg1_timeout_secs: 10,
            leg2_timeout_secs: 20,
            min_fill_ratio: dec!(0.8),
            cex_venue: "binance".into(),
            wallet_venue: "wallet".into(),
            breaker_failure_threshold: 5,
            breaker_window_secs: 300,
            breaker_cooldown_secs: 120,
            replay_ttl_secs: 60,
        }
    }
}

pub struct Executor {
    exchange: Arc<dyn ExchangeClient>,
    pricing: Arc<PricingEngine>,
    inventory: Arc<RwLock<InventoryTracker>>,
    breaker: CircuitBreaker,
    replay: ReplayGuard,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        pricing: Arc<PricingEngine>,
        inventory: Arc<RwLock<InventoryTracker>>,
        config: ExecutorConfig,
    ) -> Self {
        assert!(
            config.replay_ttl_secs > config.leg2_timeout_secs as i64,
            "replay TTL must outlive the leg2 timeout"
        );
        Self {
            exchange,
            pricing,
            inventory,
            breaker: CircuitBreaker::new(
                config.breaker_failure_threshold,
                config.breaker_window_secs,
                config.breaker_cooldown_secs,
            ),
            replay: ReplayGuard::new(config.replay_ttl_secs),
            config,
        }
    }

    /// Leg order for this signal: (leg1, leg2)
    fn leg_order(&self) -> (Venue, Venue) {
        if self.config.dex_first {
            (Venue::Dex, Venue::Cex)
        } else {
            (Venue::Cex, Venue::Dex)
        }
    }

    /// CEX side for this direction
    fn cex_side(direction: Direction) -> OrderSide {
        match direction {
            Direction::BuyCexSellDex => OrderSide::Buy,
            Direction::BuyDexSellCex => OrderSide::Sell,
        }
    }

    /// Drive one signal to a terminal state. Never returns a non-terminal
    /// context; every error path ends in FAILED with a readable reason.
    pub async fn execute(&mut self, signal: &Signal, gas_gwei: u64) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(
            signal.id,
            signal.pair.cex_symbol.clone(),
            signal.direction,
        );
        ctx.transition(ExecutionState::Validating);
        let now = Utc::now();

        if self.breaker.is_open(now) {
            ctx.transition(ExecutionState::Failed {
                error: "Circuit breaker open".into(),
            });
            return ctx;
        }
        if !self.replay.check_and_record(signal.id, now) {
            ctx.transition(ExecutionState::Failed {
                error: "Duplicate signal".into(),
            });
            return ctx;
        }
        if !signal.is_valid(now) {
            ctx.transition(ExecutionState::Failed {
                error: format!(
                    "Signal invalid (expired={}, inventory_ok={}, within_limits={}, net={}, score={})",
                    signal.is_expired(now),
                    signal.inventory_ok,
                    signal.within_limits,
                    signal.expected_net,
                    signal.score
                ),
            });
            return ctx;
        }

        let (leg1_venue, leg2_venue) = self.leg_order();

        // ── leg 1 ───────────────────────────────────────────────────
        ctx.transition(ExecutionState::Leg1Pending {
            venue: leg1_venue,
            started: Utc::now(),
        });
        let leg1_deadline = Duration::from_secs(self.config.leg1_timeout_secs);
        let leg1 = match timeout(
            leg1_deadline,
            self.run_leg(leg1_venue, signal, gas_gwei, signal.size),
        )
        .await
        {
            Err(_) => {
                // No unwind: nothing is open yet
                self.fail(&mut ctx, format!("Leg1 timeout on {}", leg1_venue));
                return ctx;
            }
            Ok(Err(reason)) => {
                self.fail(&mut ctx, reason);
                return ctx;
            }
            Ok(Ok(fill)) => fill,
        };
        self.apply_fill(signal, &leg1).await;
        ctx.leg1 = Some(leg1.clone());
        ctx.transition(ExecutionState::Leg1Filled { fill: leg1.clone() });

        // ── leg 2 ───────────────────────────────────────────────────
        ctx.transition(ExecutionState::Leg2Pending {
            venue: leg2_venue,
            started: Utc::now(),
        });
        let leg2_deadline = Duration::from_secs(self.config.leg2_timeout_secs);
        let leg2 = match timeout(
            leg2_deadline,
            self.run_leg(leg2_venue, signal, gas_gwei, leg1.size),
        )
        .await
        {
            Err(_) => {
                self.unwind_then_fail(
                    &mut ctx,
                    signal,
                    &leg1,
                    gas_gwei,
                    format!("Leg2 timeout on {}", leg2_venue),
                )
                .await;
                return ctx;
            }
            Ok(Err(reason)) => {
                self.unwind_then_fail(&mut ctx, signal, &leg1, gas_gwei, reason)
                    .await;
                return ctx;
            }
            Ok(Ok(fill)) => fill,
        };
        self.apply_fill(signal, &leg2).await;
        ctx.leg2 = Some(leg2.clone());

        // ── realize ─────────────────────────────────────────────────
        let net_pnl = Self::realized_pnl(signal.direction, &leg1, &leg2);
        self.breaker.record_success();
        info!(
            "✅ SUCCESS: PnL={} | {} {} | leg1 {}@{} leg2 {}@{}",
            net_pnl.round_dp(4),
            ctx.pair,
            signal.direction,
            leg1.venue,
            leg1.price.round_dp(4),
            leg2.venue,
            leg2.price.round_dp(4),
        );
        ctx.transition(ExecutionState::Done { net_pnl });
        ctx
    }

    /// Realized P&L with the flat fee approximation:
    /// (sell price - buy price) * size - size * leg1_price * 0.004
    fn realized_pnl(direction: Direction, leg1: &LegFill, leg2: &LegFill) -> Decimal {
        let (cex, dex) = match leg1.venue {
            Venue::Cex => (leg1, leg2),
            Venue::Dex => (leg2, leg1),
        };
        let size = leg1.size;
        let gross = match direction {
            Direction::BuyCexSellDex => (dex.price - cex.price) * size,
            Direction::BuyDexSellCex => (cex.price - dex.price) * size,
        };
        gross - size * leg1.price * FEE_APPROX_RATE
    }

    fn fail(&mut self, ctx: &mut ExecutionContext, reason: String) {
        error!("❌ FAILED: {} | {}", reason, ctx.pair);
        self.breaker.record_failure(Utc::now());
        ctx.transition(ExecutionState::Failed { error: reason });
    }

    async fn unwind_then_fail(
        &mut self,
        ctx: &mut ExecutionContext,
        signal: &Signal,
        leg1: &LegFill,
        gas_gwei: u64,
        reason: String,
    ) {
        warn!(
            "unwinding {} leg1 ({} {} @ {}) after: {}",
            ctx.pair, leg1.venue, leg1.size, leg1.price, reason
        );
        ctx.transition(ExecutionState::Unwinding {
            reason: reason.clone(),
        });
        match self.unwind(signal, leg1, gas_gwei).await {
            Ok(fill) => {
                self.apply_fill_reversed(signal, &fill).await;
                info!(
                    "unwind complete: {} {} @ {}",
                    fill.venue, fill.size, fill.price
                );
            }
            Err(e) => {
                // The position may need manual reconciliation; terminal
                // state is FAILED either way.
                error!("unwind of {} leg failed: {} - MANUAL RECONCILIATION MAY BE REQUIRED", leg1.venue, e);
            }
        }
        self.fail(ctx, reason);
    }

    async fn run_leg(
        &self,
        venue: Venue,
        signal: &Signal,
        gas_gwei: u64,
        size: Decimal,
    ) -> Result<LegFill, String> {
        match venue {
            Venue::Cex => self.run_cex_leg(signal, size).await,
            Venue::Dex => self.run_dex_leg(signal, gas_gwei, size).await,
        }
    }

    /// CEX leg: marketable limit IOC, 0.1% through the touch. Success needs
    /// a filled order, or a partial at or above min_fill_ratio.
    async fn run_cex_leg(&self, signal: &Signal, size: Decimal) -> Result<LegFill, String> {
        let side = Self::cex_side(signal.direction);
        let price = match side {
            OrderSide::Buy => signal.cex_price * (Decimal::ONE + IOC_PRICE_OFFSET),
            OrderSide::Sell => signal.cex_price * (Decimal::ONE - IOC_PRICE_OFFSET),
        };
        let order = self
            .exchange
            .create_limit_ioc_order(&signal.pair.cex_symbol, side, size, price)
            .await
            .map_err(|e| format!("CEX order failed: {}", e))?;

        match order.status {
            OrderStatus::Filled => {}
            OrderStatus::PartiallyFilled | OrderStatus::Expired => {
                if order.fill_ratio() < self.config.min_fill_ratio {
                    return Err(format!(
                        "Partial fill below threshold ({} of {})",
                        order.filled, order.amount
                    ));
                }
            }
        }
        Ok(LegFill {
            venue: Venue::Cex,
            price: if order.avg_fill_price.is_zero() {
                price
            } else {
                order.avg_fill_price
            },
            size: order.filled,
            order_id: Some(order.id),
            route: None,
        })
    }

    /// DEX leg: a simulation-validated quote through the pricing engine.
    /// Success needs a valid quote with non-zero simulated output.
    async fn run_dex_leg(
        &self,
        signal: &Signal,
        gas_gwei: u64,
        size: Decimal,
    ) -> Result<LegFill, String> {
        let pair = &signal.pair;
        let (token_in, token_out, amount_in_dec, in_decimals) = match signal.direction {
            // selling base for quote
            Direction::BuyCexSellDex => (
                pair.base.address,
                pair.quote.address,
                size,
                pair.base.decimals,
            ),
            // buying base with quote
            Direction::BuyDexSellCex => (
                pair.quote.address,
                pair.base.address,
                size * signal.dex_price,
                pair.quote.decimals,
            ),
        };
        let amount_in = TokenAmount::from_decimal(amount_in_dec, in_decimals)
            .map_err(|e| format!("DEX leg sizing failed: {}", e))?;

        let quote = self
            .pricing
            .get_quote(token_in, token_out, amount_in.raw, gas_gwei)
            .await
            .map_err(|e| format!("DEX quote failed: {}", e))?;
        if quote.simulated_output.is_zero() {
            return Err("DEX simulation returned zero output".into());
        }
        if !quote.valid() {
            return Err(format!(
                "DEX quote drift beyond tolerance (expected {}, simulated {})",
                quote.expected_output, quote.simulated_output
            ));
        }

        let (fill_size, fill_price) = match signal.direction {
            Direction::BuyCexSellDex => {
                let out = TokenAmount::new(quote.simulated_output, pair.quote.decimals)
                    .to_decimal()
                    .map_err(|e| e.to_string())?;
                (size, out / size)
            }
            Direction::BuyDexSellCex => {
                let base_out = TokenAmount::new(quote.simulated_output, pair.base.decimals)
                    .to_decimal()
                    .map_err(|e| e.to_string())?;
                (base_out, amount_in_dec / base_out)
            }
        };

        Ok(LegFill {
            venue: Venue::Dex,
            price: fill_price,
            size: fill_size,
            order_id: None,
            route: Some(quote.route.describe()),
        })
    }

    /// Close the open leg1 position: reverse market order on the CEX, or a
    /// reversed quote on the DEX.
    async fn unwind(
        &self,
        signal: &Signal,
        leg1: &LegFill,
        gas_gwei: u64,
    ) -> Result<LegFill, String> {
        match leg1.venue {
            Venue::Cex => {
                let side = Self::cex_side(signal.direction).opposite();
                let order = self
                    .exchange
                    .create_market_order(&signal.pair.cex_symbol, side, leg1.size)
                    .await
                    .map_err(|e| format!("unwind market order failed: {}", e))?;
                Ok(LegFill {
                    venue: Venue::Cex,
                    price: order.avg_fill_price,
                    size: order.filled,
                    order_id: Some(order.id),
                    route: None,
                })
            }
            Venue::Dex => {
                // Reverse the swap: what leg1 bought gets sold and vice versa
                let pair = &signal.pair;
                let (token_in, token_out, amount_dec, in_dec, out_dec) = match signal.direction {
                    // leg1 sold base for quote; buy the base back
                    Direction::BuyCexSellDex => (
                        pair.quote.address,
                        pair.base.address,
                        leg1.size * leg1.price,
                        pair.quote.decimals,
                        pair.base.decimals,
                    ),
                    // leg1 bought base with quote; sell it again
                    Direction::BuyDexSellCex => (
                        pair.base.address,
                        pair.quote.address,
                        leg1.size,
                        pair.base.decimals,
                        pair.quote.decimals,
                    ),
                };
                let amount_in = TokenAmount::from_decimal(amount_dec, in_dec)
                    .map_err(|e| format!("unwind sizing failed: {}", e))?;
                let quote = self
                    .pricing
                    .get_quote(token_in, token_out, amount_in.raw, gas_gwei)
                    .await
                    .map_err(|e| format!("unwind quote failed: {}", e))?;
                let out = TokenAmount::new(quote.simulated_output, out_dec)
                    .to_decimal()
                    .map_err(|e| e.to_string())?;
                Ok(LegFill {
                    venue: Venue::Dex,
                    price: if out.is_zero() {
                        Decimal::ZERO
                    } else {
                        amount_dec / out
                    },
                    size: out,
                    order_id: None,
                    route: Some(quote.route.describe()),
                })
            }
        }
    }

    /// Apply a fill's balance deltas to the inventory ledger
    async fn apply_fill(&self, signal: &Signal, fill: &LegFill) {
        let pair = &signal.pair;
        let quote_amount = fill.size * fill.price;
        let mut inventory = self.inventory.write().await;
        match fill.venue {
            Venue::Cex => {
                let side = match Self::cex_side(signal.direction) {
                    OrderSide::Buy => TradeSide::Buy,
                    OrderSide::Sell => TradeSide::Sell,
                };
                inventory.record_trade(
                    &self.config.cex_venue,
                    side,
                    &pair.base.symbol,
                    &pair.quote.symbol,
                    fill.size,
                    quote_amount,
                    quote_amount * CEX_TAKER_RATE,
                    &pair.quote.symbol,
                );
            }
            Venue::Dex => {
                let side = match signal.direction {
                    Direction::BuyCexSellDex => TradeSide::Sell,
                    Direction::BuyDexSellCex => TradeSide::Buy,
                };
                inventory.record_trade(
                    &self.config.wallet_venue,
                    side,
                    &pair.base.symbol,
                    &pair.quote.symbol,
                    fill.size,
                    quote_amount,
                    Decimal::ZERO,
                    &pair.quote.symbol,
                );
            }
        }
    }

    /// Inventory deltas for an unwind fill (the reverse of leg1)
    async fn apply_fill_reversed(&self, signal: &Signal, fill: &LegFill) {
        let pair = &signal.pair;
        let quote_amount = fill.size * fill.price;
        let mut inventory = self.inventory.write().await;
        match fill.venue {
            Venue::Cex => {
                let side = match Self::cex_side(signal.direction) {
                    OrderSide::Buy => TradeSide::Sell,
                    OrderSide::Sell => TradeSide::Buy,
                };
                inventory.record_trade(
                    &self.config.cex_venue,
                    side,
                    &pair.base.symbol,
                    &pair.quote.symbol,
                    fill.size,
                    quote_amount,
                    quote_amount * CEX_TAKER_RATE,
                    &pair.quote.symbol,
                );
            }
            Venue::Dex => {
                let side = match signal.direction {
                    Direction::BuyCexSellDex => TradeSide::Buy,
                    Direction::BuyDexSellCex => TradeSide::Sell,
                };
                inventory.record_trade(
                    &self.config.wallet_venue,
                    side,
                    &pair.base.symbol,
                    &pair.quote.symbol,
                    fill.size,
                    quote_amount,
                    Decimal::ZERO,
                    &pair.quote.symbol,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::Pair;
    use crate::exchange::mock::MockExchange;
    use crate::pricing::engine::tests::{EchoSimulator, StubSource};
    use crate::types::{MarketPair, Token};
    use alloy::primitives::{Address, U256};
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn create_test_market() -> MarketPair {
        MarketPair::new(
            Token::new("WETH", addr(0xee), 18),
            Token::new("USDC", addr(0x02), 6),
            "ETHUSDC",
        )
    }

    fn create_test_signal(direction: Direction) -> Signal {
        let now = Utc::now();
        Signal {
            id: Uuid::new_v4(),
            pair: create_test_market(),
            direction,
            cex_price: dec!(2000),
            dex_price: dec!(2090),
            spread_bps: dec!(450),
            size: dec!(1),
            expected_gross: dec!(90),
            expected_fees: dec!(10),
            expected_net: dec!(80),
            score: 70.0,
            timestamp: now,
            expiry: now + ChronoDuration::seconds(30),
            inventory_ok: true,
            within_limits: true,
        }
    }

    async fn create_test_pricing(fail_simulation: Option<&str>) -> Arc<PricingEngine> {
        let weth = Token::new("WETH", addr(0xee), 18);
        let usdc = Token::new("USDC", addr(0x02), 6);
        let pool = Pair::new(
            addr(0x10),
            weth,
            usdc,
            U256::from(10_000u128 * 10u128.pow(18)),
            U256::from(21_000_000u128 * 10u128.pow(6)),
            30,
        )
        .unwrap();
        let engine = PricingEngine::new(
            Arc::new(StubSource::new(vec![pool])),
            Arc::new(EchoSimulator {
                skew_ppt: 1000,
                fail_with: fail_simulation.map(str::to_string),
            }),
            addr(0xee),
            addr(0x99),
            3,
        );
        engine.load_pools(&[addr(0x10)]).await.unwrap();
        Arc::new(engine)
    }

    fn create_test_executor(
        exchange: Arc<MockExchange>,
        pricing: Arc<PricingEngine>,
        config: ExecutorConfig,
    ) -> Executor {
        Executor::new(
            exchange,
            pricing,
            Arc::new(RwLock::new(InventoryTracker::new())),
            config,
        )
    }

    #[tokio::test]
    async fn test_happy_path_cex_first() {
        let exchange = Arc::new(MockExchange::new());
        let pricing = create_test_pricing(None).await;
        let mut executor =
            create_test_executor(exchange.clone(), pricing, ExecutorConfig::default());

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let ctx = executor.execute(&signal, 30).await;

        assert!(ctx.succeeded(), "error: {:?}", ctx.error);
        assert_eq!(
            ctx.transitions,
            vec![
                "IDLE",
                "VALIDATING",
                "LEG1_PENDING",
                "LEG1_FILLED",
                "LEG2_PENDING",
                "DONE"
            ]
        );
        // one CEX IOC order placed, no unwind orders
        assert_eq!(exchange.placed_orders().len(), 1);
        let pnl = ctx.actual_net_pnl.unwrap();
        assert!(pnl > Decimal::ZERO, "pnl {}", pnl);
    }

    #[tokio::test]
    async fn test_duplicate_signal_rejected() {
        let exchange = Arc::new(MockExchange::new());
        let pricing = create_test_pricing(None).await;
        let mut executor =
            create_test_executor(exchange, pricing, ExecutorConfig::default());

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let first = executor.execute(&signal, 30).await;
        assert!(first.succeeded());

        let second = executor.execute(&signal, 30).await;
        assert!(!second.succeeded());
        assert_eq!(second.error.as_deref(), Some("Duplicate signal"));
    }

    #[tokio::test]
    async fn test_partial_fill_below_threshold_fails_without_unwind() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_fill_ratio(dec!(0.5));
        let pricing = create_test_pricing(None).await;
        let mut executor =
            create_test_executor(exchange.clone(), pricing, ExecutorConfig::default());

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let ctx = executor.execute(&signal, 30).await;

        assert!(!ctx.succeeded());
        assert!(ctx.error.as_deref().unwrap().contains("Partial fill below threshold"));
        // leg1 failed; nothing to unwind, no market order
        assert_eq!(exchange.placed_orders().len(), 1);
        assert!(!ctx.transitions.contains(&"UNWINDING"));
    }

    #[tokio::test]
    async fn test_partial_fill_above_threshold_proceeds() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_fill_ratio(dec!(0.9));
        let pricing = create_test_pricing(None).await;
        let mut executor =
            create_test_executor(exchange, pricing, ExecutorConfig::default());

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let ctx = executor.execute(&signal, 30).await;
        assert!(ctx.succeeded());
        assert_eq!(ctx.leg1.as_ref().unwrap().size, dec!(0.9));
        // leg2 runs at the reduced leg1 size
        assert_eq!(ctx.leg2.as_ref().unwrap().size, dec!(0.9));
    }

    #[tokio::test]
    async fn test_leg2_failure_unwinds_with_reverse_market_order() {
        // CEX-first, leg1 fills 1.0, DEX simulation fails -> unwind sells
        // the 1.0 back via a reverse market order
        let exchange = Arc::new(MockExchange::new());
        let pricing = create_test_pricing(Some("pool reverted")).await;
        let mut executor =
            create_test_executor(exchange.clone(), pricing, ExecutorConfig::default());

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let ctx = executor.execute(&signal, 30).await;

        assert!(!ctx.succeeded());
        assert_eq!(
            ctx.transitions,
            vec![
                "IDLE",
                "VALIDATING",
                "LEG1_PENDING",
                "LEG1_FILLED",
                "LEG2_PENDING",
                "UNWINDING",
                "FAILED"
            ]
        );
        let orders = exchange.placed_orders();
        assert_eq!(orders.len(), 2);
        // the unwind order reverses the buy
        assert_eq!(orders[1].side, OrderSide::Sell);
        assert!(orders[1].price.is_none(), "unwind must be a market order");
        assert_eq!(orders[1].amount, dec!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leg1_timeout_fails_without_unwind() {
        let exchange = Arc::new(MockExchange::new());
        *exchange.order_delay.lock().unwrap() = Some(Duration::from_secs(60));
        let pricing = create_test_pricing(None).await;
        let config = ExecutorConfig {
            leg1_timeout_secs: 1,
            ..ExecutorConfig::default()
        };
        let mut executor = create_test_executor(exchange.clone(), pricing, config);

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let ctx = executor.execute(&signal, 30).await;

        assert!(!ctx.succeeded());
        assert!(ctx.error.as_deref().unwrap().contains("Leg1 timeout"));
        assert!(!ctx.transitions.contains(&"UNWINDING"));
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_repeated_failures() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_fill_ratio(Decimal::ZERO); // every CEX leg dies
        let pricing = create_test_pricing(None).await;
        let config = ExecutorConfig {
            breaker_failure_threshold: 3,
            ..ExecutorConfig::default()
        };
        let mut executor = create_test_executor(exchange, pricing, config);

        for _ in 0..3 {
            let ctx = executor
                .execute(&create_test_signal(Direction::BuyCexSellDex), 30)
                .await;
            assert!(!ctx.succeeded());
        }
        // breaker now rejects before any order is placed
        let ctx = executor
            .execute(&create_test_signal(Direction::BuyCexSellDex), 30)
            .await;
        assert_eq!(ctx.error.as_deref(), Some("Circuit breaker open"));
        assert_eq!(ctx.transitions, vec!["IDLE", "VALIDATING", "FAILED"]);
    }

    #[tokio::test]
    async fn test_invalid_signal_rejected_in_validating() {
        let exchange = Arc::new(MockExchange::new());
        let pricing = create_test_pricing(None).await;
        let mut executor =
            create_test_executor(exchange, pricing, ExecutorConfig::default());

        let mut signal = create_test_signal(Direction::BuyCexSellDex);
        signal.expected_net = dec!(-1);
        let ctx = executor.execute(&signal, 30).await;
        assert!(!ctx.succeeded());
        assert!(ctx.error.as_deref().unwrap().starts_with("Signal invalid"));
    }

    #[tokio::test]
    async fn test_dex_first_ordering() {
        let exchange = Arc::new(MockExchange::new());
        let pricing = create_test_pricing(None).await;
        let config = ExecutorConfig {
            dex_first: true,
            ..ExecutorConfig::default()
        };
        let mut executor = create_test_executor(exchange.clone(), pricing, config);

        let signal = create_test_signal(Direction::BuyCexSellDex);
        let ctx = executor.execute(&signal, 30).await;
        assert!(ctx.succeeded(), "error: {:?}", ctx.error);
        assert_eq!(ctx.leg1.as_ref().unwrap().venue, Venue::Dex);
        assert_eq!(ctx.leg2.as_ref().unwrap().venue, Venue::Cex);
    }

    #[tokio::test]
    async fn test_realized_pnl_formula() {
        // BUY_CEX_SELL_DEX: (dex - cex) * size - size * leg1 * 0.004
        let leg1 = LegFill {
            venue: Venue::Cex,
            price: dec!(2000),
            size: dec!(1),
            order_id: None,
            route: None,
        };
        let leg2 = LegFill {
            venue: Venue::Dex,
            price: dec!(2090),
            size: dec!(1),
            order_id: None,
            route: None,
        };
        let pnl = Executor::realized_pnl(Direction::BuyCexSellDex, &leg1, &leg2);
        assert_eq!(pnl, dec!(90) - dec!(8));
    }
}
