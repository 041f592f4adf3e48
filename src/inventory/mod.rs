//! Per-venue inventory tracking
//!
//! Balances by venue and asset, pre-trade affordability verdicts, in-place
//! trade deltas, and skew measurement against an even split across venues.
//! Everything is Decimal; this ledger is the engine's single source of truth
//! for what it can afford, so no floats and no silent rounding.
//!
//! The tracker is owned by the orchestrator and mutated only by it and the
//! executor on the single scheduler.
//!
//! Author: AI-Generated
//! Created: 2026-02-20
//! Modified: 2026-03-15 - rebalance planner

use crate::types::AssetBalance;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Deviation (percentage points from even split) that flags a rebalance
const REBALANCE_DEVIATION_PCT: u8 = 30;

/// Machine-readable refusal reasons for can_execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InsufficiencyReason {
    InsufficientBuyBalance,
    InsufficientSellBalance,
}

#[derive(Debug, Clone)]
pub struct ExecuteVerdict {
    pub ok: bool,
    pub reason: Option<InsufficiencyReason>,
    pub detail: Option<String>,
}

impl ExecuteVerdict {
    fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
            detail: None,
        }
    }

    fn refused(reason: InsufficiencyReason, detail: String) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            detail: Some(detail),
        }
    }
}

/// Skew of one asset across venues
#[derive(Debug, Clone)]
pub struct SkewReport {
    pub asset: String,
    /// (venue, share of total in percent)
    pub venue_pct: Vec<(String, Decimal)>,
    /// Largest deviation from an even split, in percentage points
    pub max_deviation: Decimal,
    pub needs_rebalance: bool,
}

/// A planned transfer restoring an even split
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    pub asset: String,
    pub from_venue: String,
    pub to_venue: String,
    pub amount: Decimal,
    /// Amount arriving after the withdrawal fee
    pub net_amount: Decimal,
}

/// Buy/sell marker for record_trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Default)]
pub struct InventoryTracker {
    /// venue -> asset -> balance
    venues: HashMap<String, HashMap<String, AssetBalance>>,
}

impl InventoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a venue's snapshot with fresh CEX balances
    pub fn update_from_cex(&mut self, venue: &str, balances: HashMap<String, AssetBalance>) {
        debug!("inventory snapshot for {}: {} assets", venue, balances.len());
        self.venues.insert(venue.to_string(), balances);
    }

    /// Replace a venue's snapshot with wallet amounts (all free)
    pub fn update_from_wallet(&mut self, venue: &str, amounts: HashMap<String, Decimal>) {
        let balances = amounts
            .into_iter()
            .map(|(asset, amount)| (asset, AssetBalance::new(amount, Decimal::ZERO)))
            .collect();
        self.venues.insert(venue.to_string(), balances);
    }

    /// Free balance; zero when the venue or asset is unknown
    pub fn get_available(&self, venue: &str, asset: &str) -> Decimal {
        self.venues
            .get(venue)
            .and_then(|assets| assets.get(asset))
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    /// Total across all venues
    pub fn total(&self, asset: &str) -> Decimal {
        self.venues
            .values()
            .filter_map(|assets| assets.get(asset))
            .map(|b| b.total())
            .sum()
    }

    /// Can we spend `buy_amount` of `buy_asset` on one venue and
    /// `sell_amount` of `sell_asset` on another?
    pub fn can_execute(
        &self,
        buy_venue: &str,
        buy_asset: &str,
        buy_amount: Decimal,
        sell_venue: &str,
        sell_asset: &str,
        sell_amount: Decimal,
    ) -> ExecuteVerdict {
        let buy_avail = self.get_available(buy_venue, buy_asset);
        if buy_avail < buy_amount {
            return ExecuteVerdict::refused(
                InsufficiencyReason::InsufficientBuyBalance,
                format!(
                    "{} {} at {} < required {}",
                    buy_avail, buy_asset, buy_venue, buy_amount
                ),
            );
        }
        let sell_avail = self.get_available(sell_venue, sell_asset);
        if sell_avail < sell_amount {
            return ExecuteVerdict::refused(
                InsufficiencyReason::InsufficientSellBalance,
                format!(
                    "{} {} at {} < required {}",
                    sell_avail, sell_asset, sell_venue, sell_amount
                ),
            );
        }
        ExecuteVerdict::ok()
    }

    /// Apply a fill in place. A Buy gains base and spends quote; a Sell is
    /// the mirror. The fee comes out of `fee_asset`.
    #[allow(clippy::too_many_arguments)]
    pub fn record_trade(
        &mut self,
        venue: &str,
        side: TradeSide,
        base: &str,
        quote: &str,
        base_amount: Decimal,
        quote_amount: Decimal,
        fee: Decimal,
        fee_asset: &str,
    ) {
        let assets = self.venues.entry(venue.to_string()).or_default();
        let apply = |assets: &mut HashMap<String, AssetBalance>, asset: &str, delta: Decimal| {
            let entry = assets.entry(asset.to_string()).or_default();
            entry.free += delta;
        };
        match side {
            TradeSide::Buy => {
                apply(assets, base, base_amount);
                apply(assets, quote, -quote_amount);
            }
            TradeSide::Sell => {
                apply(assets, base, -base_amount);
                apply(assets, quote, quote_amount);
            }
        }
        if !fee.is_zero() {
            apply(assets, fee_asset, -fee);
        }
        debug!(
            "trade recorded at {}: {:?} {} {} for {} {} (fee {} {})",
            venue, side, base_amount, base, quote_amount, quote, fee, fee_asset
        );
    }

    /// Per-venue shares of an asset and the largest deviation from even
    pub fn skew(&self, asset: &str) -> SkewReport {
        let holdings: Vec<(String, Decimal)> = self
            .venues
            .iter()
            .map(|(venue, assets)| {
                (
                    venue.clone(),
                    assets.get(asset).map(|b| b.total()).unwrap_or(Decimal::ZERO),
                )
            })
            .collect();
        let total: Decimal = holdings.iter().map(|(_, v)| *v).sum();

        let threshold = Decimal::from(REBALANCE_DEVIATION_PCT);
        if total.is_zero() || holdings.len() < 2 {
            return SkewReport {
                asset: asset.to_string(),
                venue_pct: holdings
                    .into_iter()
                    .map(|(v, _)| (v, Decimal::ZERO))
                    .collect(),
                max_deviation: Decimal::ZERO,
                needs_rebalance: false,
            };
        }

        let even = Decimal::ONE_HUNDRED / Decimal::from(holdings.len());
        let mut venue_pct = Vec::with_capacity(holdings.len());
        let mut max_deviation = Decimal::ZERO;
        for (venue, amount) in holdings {
            let pct = amount / total * Decimal::ONE_HUNDRED;
            max_deviation = max_deviation.max((pct - even).abs());
            venue_pct.push((venue, pct));
        }

        SkewReport {
            asset: asset.to_string(),
            venue_pct,
            max_deviation,
            needs_rebalance: max_deviation >= threshold,
        }
    }

    /// Plan a single transfer from the heaviest venue to the lightest that
    /// restores an even split. None when the skew is under the threshold.
    pub fn plan_rebalance(&self, asset: &str, withdrawal_fee: Decimal) -> Option<RebalancePlan> {
        let report = self.skew(asset);
        if !report.needs_rebalance {
            return None;
        }
        let total = self.total(asset);
        let venues = report.venue_pct.len();
        let even_amount = total / Decimal::from(venues);

        let heaviest = report
            .venue_pct
            .iter()
            .max_by(|a, b| a.1.cmp(&b.1))?
            .0
            .clone();
        let lightest = report
            .venue_pct
            .iter()
            .min_by(|a, b| a.1.cmp(&b.1))?
            .0
            .clone();

        let held = self
            .venues
            .get(&heaviest)
            .and_then(|assets| assets.get(asset))
            .map(|b| b.total())
            .unwrap_or(Decimal::ZERO);
        let amount = held - even_amount;
        if amount <= Decimal::ZERO {
            return None;
        }
        Some(RebalancePlan {
            asset: asset.to_string(),
            from_venue: heaviest,
            to_venue: lightest,
            amount,
            net_amount: amount - withdrawal_fee,
        })
    }
}
