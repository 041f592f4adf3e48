//! Order-book analytics dump
//!
//! Fetches one depth snapshot from the exchange's public endpoint and
//! prints the analyzer's view: touch, depth bands, imbalance, and a
//! walk-the-book for the requested quantity.
//!
//! Usage: book_dump --symbol ETHUSDC --qty 2.5 [--depth 50] [--production]
//!
//! Author: AI-Generated
//! Created: 2026-03-08

use anyhow::Result;
use clap::Parser;
use crossarb_bot::exchange::rest::RestExchange;
use crossarb_bot::exchange::ExchangeClient;
use crossarb_bot::orderbook::{BookAnalyzer, BookSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::Level;

#[derive(Parser)]
#[command(about = "Dump order-book analytics for one symbol")]
struct Args {
    /// CEX symbol, e.g. ETHUSDC
    #[arg(long)]
    symbol: String,
    /// Quantity for walk-the-book and effective spread
    #[arg(long, default_value = "1")]
    qty: Decimal,
    /// Book depth to request
    #[arg(long, default_value_t = 50)]
    depth: usize,
    /// Query the live endpoint instead of the testnet
    #[arg(long, default_value_t = false)]
    production: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_target(false)
        .init();
    let args = Args::parse();

    // public endpoint; no credentials needed
    let exchange = RestExchange::new(String::new(), String::new(), args.production);
    let book = exchange.fetch_order_book(&args.symbol, args.depth).await?;
    let analyzer = BookAnalyzer::new(&book);

    println!("── {} @ {} ──", book.symbol, book.timestamp.to_rfc3339());
    println!(
        "best bid {} | best ask {} | mid {} | spread {} bps",
        book.best_bid(),
        book.best_ask(),
        book.mid(),
        book.spread_bps().round_dp(2)
    );
    for bps in [dec!(10), dec!(25), dec!(50)] {
        println!(
            "depth within {} bps: bids {} | asks {}",
            bps,
            analyzer.depth_at_bps(BookSide::Sell, bps),
            analyzer.depth_at_bps(BookSide::Buy, bps),
        );
    }
    println!(
        "imbalance (top 10): {}",
        analyzer.imbalance(10).round_dp(4)
    );

    for (label, side) in [("buy", BookSide::Buy), ("sell", BookSide::Sell)] {
        let walk = analyzer.walk_the_book(side, args.qty);
        println!(
            "walk {} {}: avg {} | cost {} | slippage {} bps | {} levels | filled: {}",
            label,
            args.qty,
            walk.avg_price.round_dp(4),
            walk.total_cost.round_dp(2),
            walk.slippage_bps.round_dp(2),
            walk.levels_consumed,
            walk.fully_filled
        );
    }
    println!(
        "effective spread for {}: {} bps",
        args.qty,
        analyzer.effective_spread(args.qty).round_dp(2)
    );
    Ok(())
}
