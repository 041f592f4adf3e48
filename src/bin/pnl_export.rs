//! P&L summary
//!
//! Reads the bot's P&L CSV and prints an aggregate report: trade count,
//! gross/net totals, fees, and win rate. The file format is the one
//! PnlCsvWriter produces.
//!
//! Usage: pnl_export --file data/pnl.csv
//!
//! Author: AI-Generated
//! Created: 2026-03-10

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use std::fs;
use std::str::FromStr;

#[derive(Parser)]
#[command(about = "Summarize the P&L CSV")]
struct Args {
    /// Path to the CSV written by the bot
    #[arg(long)]
    file: String,
}

#[derive(Debug)]
struct Row {
    symbol: String,
    gross_pnl: Decimal,
    net_pnl: Decimal,
    fees: Decimal,
}

fn parse_rows(content: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if i == 0 {
            anyhow::ensure!(
                line.starts_with("id,timestamp,buy_venue"),
                "not a pnl csv (unexpected header)"
            );
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        // Quoted fields never occur in the numeric columns we read
        anyhow::ensure!(fields.len() >= 13, "short row at line {}", i + 1);
        rows.push(Row {
            symbol: fields[4].to_string(),
            gross_pnl: Decimal::from_str(fields[8])
                .with_context(|| format!("gross_pnl at line {}", i + 1))?,
            net_pnl: Decimal::from_str(fields[9])
                .with_context(|| format!("net_pnl at line {}", i + 1))?,
            fees: Decimal::from_str(fields[11])
                .with_context(|| format!("fees at line {}", i + 1))?,
        });
    }
    Ok(rows)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let content =
        fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file))?;
    let rows = parse_rows(&content)?;

    if rows.is_empty() {
        println!("no trades recorded");
        return Ok(());
    }

    let gross: Decimal = rows.iter().map(|r| r.gross_pnl).sum();
    let net: Decimal = rows.iter().map(|r| r.net_pnl).sum();
    let fees: Decimal = rows.iter().map(|r| r.fees).sum();
    let wins = rows.iter().filter(|r| r.net_pnl > Decimal::ZERO).count();

    println!("── P&L summary: {} ──", args.file);
    println!("trades:   {}", rows.len());
    println!("wins:     {} ({:.1}%)", wins, wins as f64 / rows.len() as f64 * 100.0);
    println!("gross:    {}", gross.round_dp(4));
    println!("fees+gas: {}", fees.round_dp(4));
    println!("net:      {}", net.round_dp(4));

    let mut by_symbol: std::collections::BTreeMap<String, (usize, Decimal)> = Default::default();
    for row in &rows {
        let entry = by_symbol.entry(row.symbol.clone()).or_default();
        entry.0 += 1;
        entry.1 += row.net_pnl;
    }
    println!("── by symbol ──");
    for (symbol, (count, net)) in by_symbol {
        println!("{}: {} trades, net {}", symbol, count, net.round_dp(4));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_rows() {
        let csv = "id,timestamp,buy_venue,sell_venue,symbol,buy_price,sell_price,amount,gross_pnl,net_pnl,net_pnl_bps,fees,gas_cost\n\
                   a,2026-03-10T00:00:00+00:00,binance,wallet,ETHUSDC,2000,2010,1,10,1.5,7.5,8.5,0.5\n";
        let rows = parse_rows(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_pnl, dec!(1.5));
        assert_eq!(rows[0].symbol, "ETHUSDC");
    }

    #[test]
    fn test_rejects_foreign_csv() {
        assert!(parse_rows("a,b,c\n1,2,3\n").is_err());
    }
}
