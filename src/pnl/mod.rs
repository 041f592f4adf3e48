//! Realized P&L records and CSV export
//!
//! One ArbRecord per completed round trip, with the derived figures
//! (gross, fees, net, net bps) computed from the two legs rather than
//! stored, so the CSV can never disagree with the legs it came from.
//!
//! The CSV file is append-only in insertion order with ISO-8601 UTC
//! timestamps. Header and field order are part of the tool contract:
//! downstream scripts parse these files.
//!
//! Author: AI-Generated
//! Created: 2026-02-28

pub mod csv_writer;

pub use csv_writer::PnlCsvWriter;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One executed leg of an arbitrage round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLeg {
    pub venue: String,
    pub symbol: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
}

impl TradeLeg {
    pub fn notional(&self) -> Decimal {
        self.price * self.amount
    }
}

/// A completed arbitrage: buy leg, sell leg, and the gas it cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub buy_leg: TradeLeg,
    pub sell_leg: TradeLeg,
    pub gas_cost: Decimal,
}

impl ArbRecord {
    /// sell notional - buy notional
    pub fn gross_pnl(&self) -> Decimal {
        self.sell_leg.notional() - self.buy_leg.notional()
    }

    /// Both leg fees plus gas
    pub fn total_fees(&self) -> Decimal {
        self.buy_leg.fee + self.sell_leg.fee + self.gas_cost
    }

    pub fn net_pnl(&self) -> Decimal {
        self.gross_pnl() - self.total_fees()
    }

    /// Net P&L in bps of the buy notional; zero on zero notional
    pub fn net_pnl_bps(&self) -> Decimal {
        let notional = self.buy_leg.notional();
        if notional.is_zero() {
            Decimal::ZERO
        } else {
            self.net_pnl() / notional * Decimal::from(10_000)
        }
    }
}
