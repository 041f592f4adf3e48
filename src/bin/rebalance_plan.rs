//! Rebalance planner
//!
//! Offline what-if: given the holdings of one asset on the exchange and in
//! the wallet, print the transfer that restores an even split, net of the
//! withdrawal fee. Exit code 0 either way; 1 on bad arguments.
//!
//! Usage: rebalance_plan --asset ETH --cex-amount 2 --wallet-amount 8 --withdrawal-fee 0.01
//!
//! Author: AI-Generated
//! Created: 2026-03-08

use anyhow::Result;
use clap::Parser;
use crossarb_bot::inventory::InventoryTracker;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Parser)]
#[command(about = "Plan an inventory rebalance between the CEX and the wallet")]
struct Args {
    #[arg(long)]
    asset: String,
    #[arg(long)]
    cex_amount: Decimal,
    #[arg(long)]
    wallet_amount: Decimal,
    #[arg(long, default_value = "0")]
    withdrawal_fee: Decimal,
    #[arg(long, default_value = "binance")]
    cex_venue: String,
    #[arg(long, default_value = "wallet")]
    wallet_venue: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut tracker = InventoryTracker::new();
    tracker.update_from_wallet(
        &args.cex_venue,
        HashMap::from([(args.asset.clone(), args.cex_amount)]),
    );
    tracker.update_from_wallet(
        &args.wallet_venue,
        HashMap::from([(args.asset.clone(), args.wallet_amount)]),
    );

    let skew = tracker.skew(&args.asset);
    println!("── {} skew ──", args.asset);
    for (venue, pct) in &skew.venue_pct {
        println!("  {}: {}%", venue, pct.round_dp(2));
    }
    println!("max deviation: {} points", skew.max_deviation.round_dp(2));

    match tracker.plan_rebalance(&args.asset, args.withdrawal_fee) {
        Some(plan) => {
            println!(
                "plan: move {} {} from {} to {} (net {} after fee)",
                plan.amount.round_dp(8),
                plan.asset,
                plan.from_venue,
                plan.to_venue,
                plan.net_amount.round_dp(8)
            );
        }
        None => println!("balanced: no transfer needed"),
    }
    Ok(())
}
