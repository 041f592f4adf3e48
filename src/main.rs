//! Cross-venue arbitrage bot
//!
//! Main entry point: wires the exchange adapter, chain client, fork
//! simulator, pricing engine, and gates into the orchestrator loop, then
//! runs until ctrl-c, kill switch, or a safety veto.
//!
//! Author: AI-Generated
//! Created: 2026-03-06
//! Modified: 2026-05-12 - mempool watcher spawned only when WS_RPC_URL set

use anyhow::{Context, Result};
use crossarb_bot::alert::AlertSender;
use crossarb_bot::chain::{PoolFetcher, RpcChainClient};
use crossarb_bot::config::load_config;
use crossarb_bot::exchange::rest::RestExchange;
use crossarb_bot::exchange::ExchangeClient;
use crossarb_bot::execution::{Executor, ExecutorConfig};
use crossarb_bot::inventory::InventoryTracker;
use crossarb_bot::mempool::PendingSwapWatcher;
use crossarb_bot::orchestrator::Orchestrator;
use crossarb_bot::pricing::{ForkRpcSimulator, PricingEngine};
use crossarb_bot::risk::{RiskConfig, RiskManager};
use crossarb_bot::signal::{GeneratorConfig, ScorerWeights, SignalGenerator, SignalScorer};
use rust_decimal::prelude::ToPrimitive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Cross-venue arbitrage bot starting...");
    let config = load_config().context("configuration")?;
    info!(
        "configuration loaded: {} pairs, {} pools, {}",
        config.pairs.len(),
        config.pool_addresses.len(),
        if config.production { "PRODUCTION" } else { "testnet" }
    );

    // CEX adapter
    let exchange: Arc<dyn ExchangeClient> = Arc::new(RestExchange::new(
        config.cex_api_key.clone(),
        config.cex_api_secret.clone(),
        config.production,
    ));
    exchange.init().await.context("exchange connectivity")?;
    info!("exchange reachable");

    // Chain + fork simulator
    let chain = Arc::new(RpcChainClient::new(&config.rpc_url));
    let fetcher = Arc::new(PoolFetcher::new(chain.clone(), config.pool_fee_bps));
    let simulator = Arc::new(ForkRpcSimulator::new(
        &config.fork_rpc_url,
        config.router_address,
        config.funder_addresses.clone(),
    ));

    // Pricing engine owns the pool set
    let pricing = Arc::new(PricingEngine::new(
        fetcher,
        simulator,
        config.weth_address,
        config.wallet_address,
        config.max_hops,
    ));
    let loaded = pricing
        .load_pools(&config.pool_addresses)
        .await
        .context("initial pool load")?;
    if loaded == 0 {
        anyhow::bail!("no pools loaded - nothing to trade");
    }
    let pairs = Orchestrator::resolve_pairs(&config, &pricing).context("pair resolution")?;
    for pair in &pairs {
        info!("trading {} ({} on the CEX)", pair.name(), pair.cex_symbol);
    }

    // Mempool-driven refresh, when a WS endpoint is configured
    if let Some(ws_url) = config.ws_rpc_url.clone() {
        let mut routers = vec![config.router_address];
        routers.extend(config.watch_routers.iter().copied());
        let watcher = PendingSwapWatcher::new(ws_url, routers, pricing.clone());
        tokio::spawn(async move {
            if let Err(e) = watcher.run().await {
                warn!("mempool watcher exited: {:#}", e);
            }
        });
        info!("mempool watcher spawned");
    } else {
        warn!("WS_RPC_URL not set - pool refresh is poll-only");
    }

    // Shared inventory ledger
    let inventory = Arc::new(RwLock::new(InventoryTracker::new()));

    let generator = SignalGenerator::new(
        exchange.clone(),
        pricing.clone(),
        GeneratorConfig {
            min_spread_bps: config.min_spread_bps,
            min_profit_usd: config.min_profit_usd,
            cooldown_secs: config.signal_cooldown_secs,
            signal_ttl_secs: config.signal_ttl_secs,
            cex_taker_bps: config.cex_taker_bps,
            dex_swap_bps: config.dex_swap_bps,
            gas_usd: config.gas_usd_estimate,
            cex_venue: config.cex_venue.clone(),
            wallet_venue: config.wallet_venue.clone(),
            orderbook_depth: config.orderbook_depth,
        },
    );
    let scorer = SignalScorer::new(
        ScorerWeights {
            spread: config.weight_spread,
            liquidity: config.weight_liquidity,
            inventory: config.weight_inventory,
            history: config.weight_history,
        },
        config.min_spread_bps.to_f64().unwrap_or(20.0),
        config.excellent_spread_bps.to_f64().unwrap_or(100.0),
    );
    let risk = RiskManager::new(RiskConfig {
        max_trade_usd: config.max_trade_usd,
        max_trade_pct_capital: config.max_trade_pct_capital,
        daily_loss_cap_usd: config.daily_loss_cap_usd,
        max_drawdown_pct: config.max_drawdown_pct,
        max_consecutive_losses: config.max_consecutive_losses,
        max_trades_per_hour: config.max_trades_per_hour,
        starting_capital_usd: config.starting_capital_usd,
    });
    let executor = Executor::new(
        exchange.clone(),
        pricing.clone(),
        inventory.clone(),
        ExecutorConfig {
            dex_first: config.dex_first,
            leg1_timeout_secs: config.leg1_timeout_secs,
            leg2_timeout_secs: config.leg2_timeout_secs,
            min_fill_ratio: config.min_fill_ratio,
            cex_venue: config.cex_venue.clone(),
            wallet_venue: config.wallet_venue.clone(),
            breaker_failure_threshold: config.breaker_failure_threshold,
            breaker_window_secs: config.breaker_window_secs,
            breaker_cooldown_secs: config.breaker_cooldown_secs,
            replay_ttl_secs: config.replay_ttl_secs,
        },
    );

    let pnl = match &config.pnl_csv_path {
        Some(path) => Some(crossarb_bot::pnl::PnlCsvWriter::new(path)?),
        None => None,
    };
    let alerts = AlertSender::new(config.alert_webhook.clone());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("ctrl-c received, stopping after this tick");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    if config.production {
        warn!("⚠️ PRODUCTION MODE - REAL MONEY AT RISK");
    }

    let mut orchestrator = Orchestrator::new(
        config, exchange, chain, pricing, generator, scorer, risk, executor, inventory, pairs,
        pnl, alerts, stop,
    );
    orchestrator.run().await
}
