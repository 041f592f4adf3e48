//! Orchestrator tick loop
//!
//! Drives the whole pipeline: refresh inventory, fetch gas, then for each
//! configured pair run generator -> pre-trade -> risk -> safety -> scorer
//! -> executor, and account the outcome. One pair completes fully before
//! the next starts; a tick error logs, backs off, and the loop continues.
//!
//! Two things stop the loop: the kill-switch file appearing on disk, and a
//! safety-floor violation. Both raise URGENT alerts.
//!
//! Author: AI-Generated
//! Created: 2026-03-05
//! Modified: 2026-04-22 - failed executions charged the gas estimate
//! Modified: 2026-05-11 - per-tick stats every 100 iterations

use crate::alert::{AlertLevel, AlertSender};
use crate::chain::ChainClient;
use crate::config::BotConfig;
use crate::exchange::ExchangeClient;
use crate::execution::{ExecutionContext, Executor, Venue};
use crate::inventory::InventoryTracker;
use crate::pnl::{ArbRecord, PnlCsvWriter, TradeLeg};
use crate::pricing::PricingEngine;
use crate::risk::{PreTradeValidator, RiskManager, SafetyCheck};
use crate::signal::{SignalGenerator, SignalScorer};
use crate::types::{Direction, MarketPair, TokenAmount};
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// balanceOf(address) selector for wallet token balances
const SEL_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

pub struct Orchestrator {
    config: BotConfig,
    exchange: Arc<dyn ExchangeClient>,
    chain: Arc<dyn ChainClient>,
    pricing: Arc<PricingEngine>,
    generator: SignalGenerator,
    scorer: SignalScorer,
    pretrade: PreTradeValidator,
    risk: RiskManager,
    safety: SafetyCheck,
    executor: Executor,
    inventory: Arc<RwLock<InventoryTracker>>,
    pairs: Vec<MarketPair>,
    pnl: Option<PnlCsvWriter>,
    alerts: AlertSender,
    stop: Arc<AtomicBool>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: BotConfig,
        exchange: Arc<dyn ExchangeClient>,
        chain: Arc<dyn ChainClient>,
        pricing: Arc<PricingEngine>,
        generator: SignalGenerator,
        scorer: SignalScorer,
        risk: RiskManager,
        executor: Executor,
        inventory: Arc<RwLock<InventoryTracker>>,
        pairs: Vec<MarketPair>,
        pnl: Option<PnlCsvWriter>,
        alerts: AlertSender,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            exchange,
            chain,
            pricing,
            generator,
            scorer,
            pretrade: PreTradeValidator::new(),
            risk,
            safety: SafetyCheck::new(),
            executor,
            inventory,
            pairs,
            pnl,
            alerts,
            stop,
        }
    }

    /// Main loop. Returns when stopped (kill switch, stop flag, or safety
    /// violation); tick errors never escape, they back off and continue.
    pub async fn run(&mut self) -> Result<()> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let backoff = Duration::from_secs(self.config.error_backoff_secs);
        let mut iteration = 0u64;
        let mut executed = 0u64;

        info!(
            "orchestrator started: {} pairs, poll {:?}, {} pools tracked",
            self.pairs.len(),
            poll,
            self.pricing.pool_count()
        );

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("stop flag set, shutting down");
                break;
            }
            if Path::new(&self.config.kill_switch_path).exists() {
                self.alerts
                    .send(
                        AlertLevel::Urgent,
                        &format!("kill switch present at {}, stopping", self.config.kill_switch_path),
                    )
                    .await;
                break;
            }

            iteration += 1;
            match self.tick().await {
                Ok(ticked) => {
                    executed += ticked as u64;
                }
                Err(e) => {
                    if e.downcast_ref::<crate::risk::SafetyViolation>().is_some() {
                        self.alerts
                            .send(AlertLevel::Urgent, &format!("safety veto, halting: {}", e))
                            .await;
                        return Err(e);
                    }
                    error!("tick failed: {:#}", e);
                    tokio::time::sleep(backoff).await;
                }
            }

            if iteration % 100 == 0 {
                info!(
                    "📈 iteration {} | capital {} | daily loss {} | {} executions",
                    iteration,
                    self.risk.capital().round_dp(2),
                    self.risk.daily_loss().round_dp(2),
                    executed
                );
            }
            tokio::time::sleep(poll).await;
        }

        info!(
            "orchestrator stopped after {} iterations, {} executions, capital {}",
            iteration,
            executed,
            self.risk.capital().round_dp(2)
        );
        Ok(())
    }

    /// One full pass over the configured pairs. Returns how many signals
    /// were executed.
    async fn tick(&mut self) -> Result<usize> {
        self.refresh_inventory().await?;
        let gas_gwei = self
            .chain
            .get_gas_price()
            .await
            .context("gas price fetch")?
            .effective_gwei();

        let mut executed = 0usize;
        let pairs = self.pairs.clone();
        for pair in &pairs {
            if let Some(ctx) = self.process_pair(pair, gas_gwei).await? {
                executed += 1;
                self.settle(pair, &ctx).await?;
            }
        }
        Ok(executed)
    }

    /// Generator -> gates -> scorer -> executor for one pair
    async fn process_pair(
        &mut self,
        pair: &MarketPair,
        gas_gwei: u64,
    ) -> Result<Option<ExecutionContext>> {
        let signal = {
            let inventory = self.inventory.read().await;
            self.generator
                .generate(pair, self.config.trade_size, gas_gwei, &inventory)
                .await
                .with_context(|| format!("signal generation for {}", pair.name()))?
        };
        let Some(mut signal) = signal else {
            return Ok(None);
        };
        let now = Utc::now();

        if let Err(veto) = self.pretrade.validate(&signal, now) {
            info!("pre-trade veto for {}: {}", pair.name(), veto);
            return Ok(None);
        }
        if let Err(veto) = self.risk.check(&signal, now) {
            info!("risk veto for {}: {}", pair.name(), veto);
            return Ok(None);
        }
        // Hard floors are checked with the live account state; an Err here
        // is fatal and propagates out of the tick.
        self.safety.check(
            signal.trade_value(),
            self.risk.daily_loss(),
            self.risk.capital(),
            self.risk.trades_last_hour(now),
            now,
        )?;

        let skew = {
            let inventory = self.inventory.read().await;
            inventory.skew(&pair.base.symbol)
        };
        signal.score = self.scorer.score_signal(&signal, Some(&skew));
        let decayed = SignalScorer::apply_decay(&signal, Utc::now());
        if decayed < self.config.min_score {
            info!(
                "{}: score {:.1} (decayed {:.1}) below minimum {:.1}",
                pair.name(),
                signal.score,
                decayed,
                self.config.min_score
            );
            return Ok(None);
        }

        Ok(Some(self.executor.execute(&signal, gas_gwei).await))
    }

    /// Account a terminal execution: history, risk, P&L CSV, alerts
    async fn settle(&mut self, pair: &MarketPair, ctx: &ExecutionContext) -> Result<()> {
        self.scorer.record_result(&ctx.pair, ctx.succeeded());
        let now = Utc::now();

        if ctx.succeeded() {
            let net = ctx.actual_net_pnl.unwrap_or(Decimal::ZERO);
            self.risk.record_outcome(net, now);
            self.alerts
                .send(
                    AlertLevel::Info,
                    &format!("SUCCESS: PnL={} on {} ({})", net.round_dp(4), ctx.pair, ctx.direction),
                )
                .await;
            if let Some(writer) = &mut self.pnl {
                if let Some(record) = Self::make_arb_record(&self.config, pair, ctx) {
                    if let Err(e) = writer.log(&record) {
                        warn!("pnl csv write failed: {}", e);
                    }
                }
            }
        } else {
            // A failed execution still burned gas and possibly unwind fees
            self.risk
                .record_outcome(-self.config.gas_usd_estimate, now);
            self.alerts
                .send(
                    AlertLevel::Warn,
                    &format!(
                        "FAILED: {} on {} ({})",
                        ctx.error.as_deref().unwrap_or("unknown"),
                        ctx.pair,
                        ctx.direction
                    ),
                )
                .await;
        }
        Ok(())
    }

    /// Build the CSV record from a DONE context's two legs
    fn make_arb_record(
        config: &BotConfig,
        pair: &MarketPair,
        ctx: &ExecutionContext,
    ) -> Option<ArbRecord> {
        let leg1 = ctx.leg1.as_ref()?;
        let leg2 = ctx.leg2.as_ref()?;
        let venue_name = |venue: Venue| match venue {
            Venue::Cex => config.cex_venue.clone(),
            Venue::Dex => config.wallet_venue.clone(),
        };
        // Which leg bought base and which sold it follows the direction
        let (buy, sell) = match ctx.direction {
            Direction::BuyCexSellDex => match leg1.venue {
                Venue::Cex => (leg1, leg2),
                Venue::Dex => (leg2, leg1),
            },
            Direction::BuyDexSellCex => match leg1.venue {
                Venue::Dex => (leg1, leg2),
                Venue::Cex => (leg2, leg1),
            },
        };
        let leg = |fill: &crate::execution::LegFill| TradeLeg {
            venue: venue_name(fill.venue),
            symbol: pair.cex_symbol.clone(),
            price: fill.price,
            amount: fill.size,
            fee: fill.price * fill.size * rust_decimal_macros::dec!(0.001),
        };
        Some(ArbRecord {
            id: ctx.signal_id.to_string(),
            timestamp: ctx.finished_at.unwrap_or_else(Utc::now),
            buy_leg: leg(buy),
            sell_leg: leg(sell),
            gas_cost: config.gas_usd_estimate,
        })
    }

    /// Pull fresh balances from both venues into the ledger
    async fn refresh_inventory(&mut self) -> Result<()> {
        let cex_balances = self
            .exchange
            .fetch_balance()
            .await
            .context("CEX balance fetch")?;

        let mut wallet: HashMap<String, Decimal> = HashMap::new();
        let native = self
            .chain
            .get_balance(self.config.wallet_address)
            .await
            .context("wallet native balance")?;
        wallet.insert("ETH".to_string(), native.to_decimal()?);
        for pair in &self.pairs {
            for token in [&pair.base, &pair.quote] {
                if wallet.contains_key(&token.symbol) {
                    continue;
                }
                match self.erc20_balance(token.address, token.decimals).await {
                    Ok(balance) => {
                        wallet.insert(token.symbol.clone(), balance);
                    }
                    Err(e) => warn!("wallet balance of {} failed: {}", token.symbol, e),
                }
            }
        }

        let mut inventory = self.inventory.write().await;
        inventory.update_from_cex(&self.config.cex_venue, cex_balances);
        inventory.update_from_wallet(&self.config.wallet_venue, wallet);
        Ok(())
    }

    async fn erc20_balance(&self, token: Address, decimals: u8) -> Result<Decimal> {
        let mut data = SEL_BALANCE_OF.to_vec();
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(self.config.wallet_address.as_slice());
        data.extend_from_slice(&word);

        let raw = self
            .chain
            .call(
                &crate::chain::TxRequest {
                    from: None,
                    to: Some(token),
                    data,
                    value: U256::ZERO,
                },
                "latest",
            )
            .await?;
        if raw.len() < 32 {
            anyhow::bail!("balanceOf returned {} bytes", raw.len());
        }
        Ok(TokenAmount::new(U256::from_be_slice(&raw[..32]), decimals).to_decimal()?)
    }

    /// Resolve the configured pairs against loaded pool metadata
    pub fn resolve_pairs(config: &BotConfig, pricing: &PricingEngine) -> Result<Vec<MarketPair>> {
        config
            .pairs
            .iter()
            .map(|pc| {
                let base = pricing
                    .token(pc.base)
                    .with_context(|| format!("{}: base token {} not in any pool", pc.cex_symbol, pc.base))?;
                let quote = pricing
                    .token(pc.quote)
                    .with_context(|| format!("{}: quote token {} not in any pool", pc.cex_symbol, pc.quote))?;
                Ok(MarketPair::new(base, quote, pc.cex_symbol.clone()))
            })
            .collect()
    }

}
