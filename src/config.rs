//! Configuration management
//!
//! Everything comes from the environment (.env via dotenv), parsed once at
//! startup into one BotConfig. Unset optional values get conservative
//! defaults; required values fail fast with the variable name in the error.
//!
//! Author: AI-Generated
//! Created: 2026-03-02
//! Modified: 2026-04-20 - replay TTL validated against leg2 timeout

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::str::FromStr;

/// One market traded on both venues, by token address. Symbols and
/// decimals are resolved from pool metadata at startup.
#[derive(Debug, Clone)]
pub struct PairConfig {
    /// CEX symbol, e.g. ETHUSDC
    pub cex_symbol: String,
    pub base: Address,
    pub quote: Address,
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    // Mode
    /// Live endpoints and fees when true, testnet otherwise
    pub production: bool,
    /// Presence of this file stops the loop at the next tick
    pub kill_switch_path: String,

    // CEX
    pub cex_api_key: String,
    pub cex_api_secret: String,
    /// Venue name used in the inventory ledger
    pub cex_venue: String,
    pub orderbook_depth: usize,

    // Chain
    pub rpc_url: String,
    /// WebSocket endpoint for the pending-tx stream (mempool watcher off when unset)
    pub ws_rpc_url: Option<String>,
    /// Anvil-style fork endpoint for quote simulation
    pub fork_rpc_url: String,
    /// V2 router used by the fork simulator and watcher filter
    pub router_address: Address,
    /// Extra routers the mempool watcher filters on
    pub watch_routers: Vec<Address>,
    pub weth_address: Address,
    /// Wallet identity (inventory venue "wallet" tracks it)
    pub wallet_address: Address,
    pub wallet_venue: String,
    /// token address -> fork whale used by ensure_sender_ready
    pub funder_addresses: HashMap<Address, Address>,

    // Universe
    pub pool_addresses: Vec<Address>,
    pub pairs: Vec<PairConfig>,
    pub max_hops: usize,
    pub pool_fee_bps: u32,

    // Signal generation
    /// Trade size in base token units
    pub trade_size: Decimal,
    pub min_spread_bps: Decimal,
    pub excellent_spread_bps: Decimal,
    pub min_profit_usd: Decimal,
    pub signal_ttl_secs: i64,
    pub signal_cooldown_secs: i64,
    pub cex_taker_bps: Decimal,
    pub dex_swap_bps: Decimal,
    pub gas_usd_estimate: Decimal,
    /// Signals scoring below this never reach the executor
    pub min_score: f64,

    // Scoring weights
    pub weight_spread: f64,
    pub weight_liquidity: f64,
    pub weight_inventory: f64,
    pub weight_history: f64,

    // Execution
    pub dex_first: bool,
    pub leg1_timeout_secs: u64,
    pub leg2_timeout_secs: u64,
    pub min_fill_ratio: Decimal,
    pub breaker_failure_threshold: usize,
    pub breaker_window_secs: i64,
    pub breaker_cooldown_secs: i64,
    /// Must exceed leg2_timeout_secs; validated in load_config
    pub replay_ttl_secs: i64,

    // Risk
    pub max_trade_usd: Decimal,
    pub max_trade_pct_capital: Decimal,
    pub daily_loss_cap_usd: Decimal,
    pub max_drawdown_pct: Decimal,
    pub max_consecutive_losses: u32,
    pub max_trades_per_hour: usize,
    pub starting_capital_usd: Decimal,

    // Loop
    pub poll_interval_ms: u64,
    /// Sleep after a tick error before the next attempt
    pub error_backoff_secs: u64,

    // Artifacts
    /// P&L CSV path (export off when unset)
    pub pnl_csv_path: Option<String>,
    pub alert_webhook: Option<String>,
}

fn env_required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} not set", name))
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} invalid: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn env_address(name: &str) -> Result<Address> {
    Address::from_str(&env_required(name)?).with_context(|| format!("{} is not an address", name))
}

fn parse_address_list(raw: &str) -> Result<Vec<Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Address::from_str(s).with_context(|| format!("bad address {}", s)))
        .collect()
}

/// TRADE_PAIRS format: SYMBOL:base_address:quote_address, comma separated
fn parse_pairs(raw: &str) -> Result<Vec<PairConfig>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').collect();
            if parts.len() != 3 {
                bail!("bad pair entry {} (want SYMBOL:base:quote)", entry);
            }
            Ok(PairConfig {
                cex_symbol: parts[0].to_string(),
                base: Address::from_str(parts[1])
                    .with_context(|| format!("bad base address in {}", entry))?,
                quote: Address::from_str(parts[2])
                    .with_context(|| format!("bad quote address in {}", entry))?,
            })
        })
        .collect()
}

/// FUNDER_ADDRESSES: JSON object, token address -> funder address
fn parse_funders(raw: &str) -> Result<HashMap<Address, Address>> {
    let map: HashMap<String, String> =
        serde_json::from_str(raw).context("FUNDER_ADDRESSES is not a JSON object")?;
    map.into_iter()
        .map(|(token, funder)| {
            Ok((
                Address::from_str(&token).with_context(|| format!("bad token key {}", token))?,
                Address::from_str(&funder)
                    .with_context(|| format!("bad funder for {}", token))?,
            ))
        })
        .collect()
}

pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();

    let config = BotConfig {
        production: env_or("PRODUCTION", false)?,
        kill_switch_path: env_or("KILL_SWITCH_PATH", "/tmp/crossarb.kill".to_string())?,

        cex_api_key: env_required("CEX_API_KEY")?,
        cex_api_secret: env_required("CEX_API_SECRET")?,
        cex_venue: env_or("CEX_VENUE", "binance".to_string())?,
        orderbook_depth: env_or("ORDERBOOK_DEPTH", 20)?,

        rpc_url: env_required("RPC_URL")?,
        ws_rpc_url: std::env::var("WS_RPC_URL").ok(),
        fork_rpc_url: env_required("FORK_RPC_URL")?,
        router_address: env_address("ROUTER_ADDRESS")?,
        watch_routers: match std::env::var("WATCH_ROUTERS") {
            Ok(raw) => parse_address_list(&raw)?,
            Err(_) => Vec::new(),
        },
        weth_address: env_address("WETH_ADDRESS")?,
        wallet_address: env_address("WALLET_ADDRESS")?,
        wallet_venue: env_or("WALLET_VENUE", "wallet".to_string())?,
        funder_addresses: match std::env::var("FUNDER_ADDRESSES") {
            Ok(raw) => parse_funders(&raw)?,
            Err(_) => HashMap::new(),
        },

        pool_addresses: parse_address_list(&env_required("POOL_ADDRESSES")?)?,
        pairs: parse_pairs(&env_required("TRADE_PAIRS")?)?,
        max_hops: env_or("MAX_HOPS", 3)?,
        pool_fee_bps: env_or("POOL_FEE_BPS", 30)?,

        trade_size: env_or("TRADE_SIZE", dec!(0.01))?,
        min_spread_bps: env_or("MIN_SPREAD_BPS", dec!(20))?,
        excellent_spread_bps: env_or("EXCELLENT_SPREAD_BPS", dec!(100))?,
        min_profit_usd: env_or("MIN_PROFIT_USD", dec!(0.5))?,
        signal_ttl_secs: env_or("SIGNAL_TTL_SECS", 10)?,
        signal_cooldown_secs: env_or("SIGNAL_COOLDOWN_SECS", 30)?,
        cex_taker_bps: env_or("CEX_TAKER_BPS", dec!(10))?,
        dex_swap_bps: env_or("DEX_SWAP_BPS", dec!(30))?,
        gas_usd_estimate: env_or("GAS_USD_ESTIMATE", dec!(0.5))?,
        min_score: env_or("MIN_SCORE", 40.0)?,

        weight_spread: env_or("WEIGHT_SPREAD", 0.4)?,
        weight_liquidity: env_or("WEIGHT_LIQUIDITY", 0.2)?,
        weight_inventory: env_or("WEIGHT_INVENTORY", 0.2)?,
        weight_history: env_or("WEIGHT_HISTORY", 0.2)?,

        dex_first: env_or("DEX_FIRST", false)?,
        leg1_timeout_secs: env_or("LEG1_TIMEOUT_SECS", 10)?,
        leg2_timeout_secs: env_or("LEG2_TIMEOUT_SECS", 20)?,
        min_fill_ratio: env_or("MIN_FILL_RATIO", dec!(0.8))?,
        breaker_failure_threshold: env_or("BREAKER_FAILURE_THRESHOLD", 5)?,
        breaker_window_secs: env_or("BREAKER_WINDOW_SECS", 300)?,
        breaker_cooldown_secs: env_or("BREAKER_COOLDOWN_SECS", 120)?,
        replay_ttl_secs: env_or("REPLAY_TTL_SECS", 60)?,

        max_trade_usd: env_or("MAX_TRADE_USD", dec!(20))?,
        max_trade_pct_capital: env_or("MAX_TRADE_PCT_CAPITAL", dec!(0.1))?,
        daily_loss_cap_usd: env_or("DAILY_LOSS_CAP_USD", dec!(10))?,
        max_drawdown_pct: env_or("MAX_DRAWDOWN_PCT", dec!(0.2))?,
        max_consecutive_losses: env_or("MAX_CONSECUTIVE_LOSSES", 4)?,
        max_trades_per_hour: env_or("MAX_TRADES_PER_HOUR", 10)?,
        starting_capital_usd: env_or("STARTING_CAPITAL_USD", dec!(200))?,

        poll_interval_ms: env_or("POLL_INTERVAL_MS", 2000)?,
        error_backoff_secs: env_or("ERROR_BACKOFF_SECS", 5)?,

        pnl_csv_path: std::env::var("PNL_CSV_PATH").ok(),
        alert_webhook: std::env::var("ALERT_WEBHOOK").ok(),
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &BotConfig) -> Result<()> {
    if config.replay_ttl_secs <= config.leg2_timeout_secs as i64 {
        bail!(
            "REPLAY_TTL_SECS ({}) must exceed LEG2_TIMEOUT_SECS ({}) to prevent replay races",
            config.replay_ttl_secs,
            config.leg2_timeout_secs
        );
    }
    if config.pool_fee_bps >= 10_000 {
        bail!("POOL_FEE_BPS {} out of range", config.pool_fee_bps);
    }
    if config.pairs.is_empty() {
        bail!("TRADE_PAIRS is empty");
    }
    if config.trade_size <= Decimal::ZERO {
        bail!("TRADE_SIZE must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(
            "ETHUSDC:0x1111111111111111111111111111111111111111:0x2222222222222222222222222222222222222222",
        )
        .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].cex_symbol, "ETHUSDC");
    }

    #[test]
    fn test_parse_pairs_rejects_malformed() {
        assert!(parse_pairs("ETHUSDC:0x1111").is_err());
    }

    #[test]
    fn test_parse_address_list() {
        let list = parse_address_list(
            "0x1111111111111111111111111111111111111111, 0x2222222222222222222222222222222222222222",
        )
        .unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_parse_funders_json() {
        let funders = parse_funders(
            r#"{"0x1111111111111111111111111111111111111111": "0x3333333333333333333333333333333333333333"}"#,
        )
        .unwrap();
        assert_eq!(funders.len(), 1);
    }

    #[test]
    fn test_replay_ttl_validation() {
        let mut config = create_test_config();
        config.replay_ttl_secs = 15;
        config.leg2_timeout_secs = 20;
        assert!(validate(&config).is_err());
        config.replay_ttl_secs = 60;
        assert!(validate(&config).is_ok());
    }

    fn create_test_config() -> BotConfig {
        BotConfig {
            production: false,
            kill_switch_path: "/tmp/kill".into(),
            cex_api_key: String::new(),
            cex_api_secret: String::new(),
            cex_venue: "binance".into(),
            orderbook_depth: 20,
            rpc_url: String::new(),
            ws_rpc_url: None,
            fork_rpc_url: String::new(),
            router_address: Address::ZERO,
            watch_routers: vec![],
            weth_address: Address::ZERO,
            wallet_address: Address::ZERO,
            wallet_venue: "wallet".into(),
            funder_addresses: HashMap::new(),
            pool_addresses: vec![],
            pairs: vec![PairConfig {
                cex_symbol: "ETHUSDC".into(),
                base: Address::ZERO,
                quote: Address::ZERO,
            }],
            max_hops: 3,
            pool_fee_bps: 30,
            trade_size: dec!(0.01),
            min_spread_bps: dec!(20),
            excellent_spread_bps: dec!(100),
            min_profit_usd: dec!(0.5),
            signal_ttl_secs: 10,
            signal_cooldown_secs: 30,
            cex_taker_bps: dec!(10),
            dex_swap_bps: dec!(30),
            gas_usd_estimate: dec!(0.5),
            min_score: 40.0,
            weight_spread: 0.4,
            weight_liquidity: 0.2,
            weight_inventory: 0.2,
            weight_history: 0.2,
            dex_first: false,
            leg1_timeout_secs: 10,
            leg2_timeout_secs: 20,
            min_fill_ratio: dec!(0.8),
            breaker_failure_threshold: 5,
            breaker_window_secs: 300,
            breaker_cooldown_secs: 120,
            replay_ttl_secs: 60,
            max_trade_usd: dec!(20),
            max_trade_pct_capital: dec!(0.1),
            daily_loss_cap_usd: dec!(10),
            max_drawdown_pct: dec!(0.2),
            max_consecutive_losses: 4,
            max_trades_per_hour: 10,
            starting_capital_usd: dec!(200),
            poll_interval_ms: 2000,
            error_backoff_secs: 5,
            pnl_csv_path: None,
            alert_webhook: None,
        }
    }
}
