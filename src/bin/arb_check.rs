//! One-shot arbitrage check
//!
//! Fetches the CEX book and the on-chain pool set, then prints both
//! candidate spreads for one pair at a given size. Pure reserve math, no
//! fork simulation: this is a reconnaissance tool, not an execution path.
//!
//! Usage: arb_check --symbol ETHUSDC --size 0.5
//! Environment: RPC_URL, POOL_ADDRESSES, WETH_ADDRESS, TRADE_PAIRS (as the bot)
//!
//! Author: AI-Generated
//! Created: 2026-03-09

use anyhow::{Context, Result};
use clap::Parser;
use crossarb_bot::amm::DEFAULT_MAX_HOPS;
use crossarb_bot::chain::{PoolFetcher, RpcChainClient};
use crossarb_bot::exchange::rest::RestExchange;
use crossarb_bot::exchange::ExchangeClient;
use crossarb_bot::pricing::PoolSource;
use crossarb_bot::types::{Token, TokenAmount};
use alloy::primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use tracing::Level;

#[derive(Parser)]
#[command(about = "Check both arbitrage directions for one pair, once")]
struct Args {
    /// CEX symbol, e.g. ETHUSDC
    #[arg(long)]
    symbol: String,
    /// Trade size in base units
    #[arg(long, default_value = "0.1")]
    size: Decimal,
    /// Gas price assumption in gwei for route ranking
    #[arg(long, default_value_t = 30)]
    gas_gwei: u64,
    #[arg(long, default_value_t = false)]
    production: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_target(false)
        .init();
    dotenv::dotenv().ok();
    let args = Args::parse();

    // Resolve the pair from the bot's TRADE_PAIRS entry
    let pairs_raw = std::env::var("TRADE_PAIRS").context("TRADE_PAIRS not set")?;
    let entry = pairs_raw
        .split(',')
        .map(str::trim)
        .find(|e| e.starts_with(&args.symbol))
        .with_context(|| format!("{} not in TRADE_PAIRS", args.symbol))?;
    let parts: Vec<&str> = entry.split(':').collect();
    anyhow::ensure!(parts.len() == 3, "bad TRADE_PAIRS entry {}", entry);
    let base_addr = Address::from_str(parts[1])?;
    let quote_addr = Address::from_str(parts[2])?;

    // Load pools straight off the chain
    let rpc_url = std::env::var("RPC_URL").context("RPC_URL not set")?;
    let weth = Address::from_str(&std::env::var("WETH_ADDRESS").context("WETH_ADDRESS not set")?)?;
    let chain = std::sync::Arc::new(RpcChainClient::new(rpc_url));
    let fetcher = PoolFetcher::new(chain, 30);

    let mut pools = Vec::new();
    for addr in std::env::var("POOL_ADDRESSES")
        .context("POOL_ADDRESSES not set")?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let address = Address::from_str(addr)?;
        pools.push(
            fetcher
                .fetch_pair(address)
                .await
                .with_context(|| format!("pool {}", addr))?,
        );
    }
    let (base, quote) = resolve_tokens(&pools, base_addr, quote_addr)
        .context("pair tokens not found in any configured pool")?;
    let finder = crossarb_bot::amm::RouteFinder::new(pools, weth);

    // CEX touch
    let exchange = RestExchange::new(String::new(), String::new(), args.production);
    let book = exchange.fetch_order_book(&args.symbol, 20).await?;
    let (cex_bid, cex_ask) = (book.best_bid(), book.best_ask());
    println!("CEX {}: bid {} / ask {}", args.symbol, cex_bid, cex_ask);

    // DEX sell side: size base -> quote (gross route output; gas only ranks)
    let sell_in = TokenAmount::from_decimal(args.size, base.decimals)?;
    let (sell_route, _) =
        finder.find_best_route(base.address, quote.address, sell_in.raw, args.gas_gwei, DEFAULT_MAX_HOPS);
    let sell_route = sell_route.context("no route base -> quote")?;
    let sell_out = TokenAmount::new(sell_route.output(sell_in.raw)?, quote.decimals).to_decimal()?;
    let dex_sell = sell_out / args.size;
    println!(
        "DEX sell via {}: {} per {}",
        sell_route.describe(),
        dex_sell.round_dp(4),
        base.symbol
    );

    // DEX buy side: size * ask quote -> base
    let spend = args.size * cex_ask;
    let buy_in = TokenAmount::from_decimal(spend, quote.decimals)?;
    let (buy_route, _) =
        finder.find_best_route(quote.address, base.address, buy_in.raw, args.gas_gwei, DEFAULT_MAX_HOPS);
    let buy_route = buy_route.context("no route quote -> base")?;
    let buy_out = TokenAmount::new(buy_route.output(buy_in.raw)?, base.decimals).to_decimal()?;
    anyhow::ensure!(buy_out > Decimal::ZERO, "buy route returned zero output");
    let dex_buy = spend / buy_out;
    println!(
        "DEX buy via {}: {} per {}",
        buy_route.describe(),
        dex_buy.round_dp(4),
        base.symbol
    );

    let spread_a = (dex_sell - cex_ask) / cex_ask * dec!(10000);
    let spread_b = (cex_bid - dex_buy) / dex_buy * dec!(10000);
    println!("BUY_CEX_SELL_DEX spread: {} bps", spread_a.round_dp(1));
    println!("BUY_DEX_SELL_CEX spread: {} bps", spread_b.round_dp(1));
    let best = spread_a.max(spread_b);
    if best > Decimal::ZERO {
        println!("best direction is {} bps gross (before fees and gas)", best.round_dp(1));
    } else {
        println!("no positive spread at this size");
    }
    Ok(())
}

fn resolve_tokens(
    pools: &[crossarb_bot::amm::Pair],
    base: Address,
    quote: Address,
) -> Option<(Token, Token)> {
    let find = |address: Address| {
        pools.iter().find_map(|p| {
            if p.token0.address == address {
                Some(p.token0.clone())
            } else if p.token1.address == address {
                Some(p.token1.clone())
            } else {
                None
            }
        })
    };
    Some((find(base)?, find(quote)?))
}
