//! Signal scoring
//!
//! Weighted composite in [0, 100] over four components: spread quality,
//! liquidity, inventory posture, and recent per-pair history. The liquidity
//! component is a fixed 80 behind its own method — the seam is there for a
//! depth-derived score, but none is wired in yet.
//!
//! Scores decay with age so a signal close to expiry is worth less than a
//! fresh one with the same economics.
//!
//! Author: AI-Generated
//! Created: 2026-02-22

use crate::inventory::SkewReport;
use crate::types::Signal;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, VecDeque};

/// Rolling history window per pair
const HISTORY_WINDOW: usize = 20;
/// Below this many samples the history component is neutral
const HISTORY_MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ScorerWeights {
    pub spread: f64,
    pub liquidity: f64,
    pub inventory: f64,
    pub history: f64,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            spread: 0.4,
            liquidity: 0.2,
            inventory: 0.2,
            history: 0.2,
        }
    }
}

pub struct SignalScorer {
    weights: ScorerWeights,
    min_spread_bps: f64,
    excellent_spread_bps: f64,
    /// pair symbol -> most recent outcomes, newest at the back
    history: HashMap<String, VecDeque<bool>>,
}

impl SignalScorer {
    pub fn new(weights: ScorerWeights, min_spread_bps: f64, excellent_spread_bps: f64) -> Self {
        Self {
            weights,
            min_spread_bps,
            excellent_spread_bps,
            history: HashMap::new(),
        }
    }

    /// Linear 0..100 between the minimum and "excellent" spread, clipped
    fn spread_score(&self, spread_bps: f64) -> f64 {
        let span = self.excellent_spread_bps - self.min_spread_bps;
        if span <= 0.0 {
            return 100.0;
        }
        ((spread_bps - self.min_spread_bps) / span * 100.0).clamp(0.0, 100.0)
    }

    /// Placeholder: constant 80 until a depth-derived score replaces it
    fn liquidity_score(&self) -> f64 {
        80.0
    }

    /// 20 when the base token's venue split is red, 60 otherwise
    fn inventory_score(&self, skew: Option<&SkewReport>) -> f64 {
        match skew {
            Some(report) if report.needs_rebalance => 20.0,
            _ => 60.0,
        }
    }

    /// Rolling success ratio on the last 20 results; neutral 50 under 3
    fn history_score(&self, pair: &str) -> f64 {
        let Some(results) = self.history.get(pair) else {
            return 50.0;
        };
        if results.len() < HISTORY_MIN_SAMPLES {
            return 50.0;
        }
        let wins = results.iter().filter(|r| **r).count();
        wins as f64 / results.len() as f64 * 100.0
    }

    /// Record an execution outcome for the pair's history component
    pub fn record_result(&mut self, pair: &str, success: bool) {
        let entry = self.history.entry(pair.to_string()).or_default();
        entry.push_back(success);
        while entry.len() > HISTORY_WINDOW {
            entry.pop_front();
        }
    }

    /// Composite score, one decimal place
    pub fn score_signal(&self, signal: &Signal, skew: Option<&SkewReport>) -> f64 {
        let spread_bps = signal.spread_bps.to_f64().unwrap_or(0.0);
        let composite = self.weights.spread * self.spread_score(spread_bps)
            + self.weights.liquidity * self.liquidity_score()
            + self.weights.inventory * self.inventory_score(skew)
            + self.weights.history * self.history_score(&signal.pair.cex_symbol);
        (composite.clamp(0.0, 100.0) * 10.0).round() / 10.0
    }

    /// Age-decayed score: score * max(0, 1 - age/ttl * 0.5)
    pub fn apply_decay(signal: &Signal, now: DateTime<Utc>) -> f64 {
        let ttl = (signal.expiry - signal.timestamp).num_milliseconds() as f64 / 1000.0;
        if ttl <= 0.0 {
            return 0.0;
        }
        let age = signal.age_seconds(now);
        let factor = (1.0 - age / ttl * 0.5).max(0.0);
        signal.score * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, MarketPair, Token};
    use alloy::primitives::Address;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn create_test_signal(spread_bps: Decimal, score: f64) -> Signal {
        let now = Utc::now();
        Signal {
            id: Uuid::new_v4(),
            pair: MarketPair::new(
                Token::new("WETH", Address::repeat_byte(1), 18),
                Token::new("USDC", Address::repeat_byte(2), 6),
                "ETHUSDC",
            ),
            direction: Direction::BuyCexSellDex,
            cex_price: dec!(2000),
            dex_price: dec!(2010),
            spread_bps,
            size: dec!(1),
            expected_gross: dec!(10),
            expected_fees: dec!(4),
            expected_net: dec!(6),
            score,
            timestamp: now,
            expiry: now + Duration::seconds(10),
            inventory_ok: true,
            within_limits: true,
        }
    }

    fn create_test_scorer() -> SignalScorer {
        SignalScorer::new(ScorerWeights::default(), 20.0, 100.0)
    }

    #[test]
    fn test_spread_score_linear_and_clipped() {
        let scorer = create_test_scorer();
        assert_eq!(scorer.spread_score(20.0), 0.0);
        assert_eq!(scorer.spread_score(60.0), 50.0);
        assert_eq!(scorer.spread_score(100.0), 100.0);
        assert_eq!(scorer.spread_score(500.0), 100.0);
        assert_eq!(scorer.spread_score(5.0), 0.0);
    }

    #[test]
    fn test_history_neutral_under_three_samples() {
        let mut scorer = create_test_scorer();
        assert_eq!(scorer.history_score("ETHUSDC"), 50.0);
        scorer.record_result("ETHUSDC", true);
        scorer.record_result("ETHUSDC", false);
        assert_eq!(scorer.history_score("ETHUSDC"), 50.0);
        scorer.record_result("ETHUSDC", true);
        assert!((scorer.history_score("ETHUSDC") - 66.666).abs() < 0.1);
    }

    #[test]
    fn test_history_window_caps_at_twenty() {
        let mut scorer = create_test_scorer();
        for _ in 0..30 {
            scorer.record_result("ETHUSDC", false);
        }
        for _ in 0..10 {
            scorer.record_result("ETHUSDC", true);
        }
        // window holds the last 20: 10 losses + 10 wins
        assert_eq!(scorer.history_score("ETHUSDC"), 50.0);
    }

    #[test]
    fn test_composite_score_bounds_and_rounding() {
        let scorer = create_test_scorer();
        let signal = create_test_signal(dec!(60), 0.0);
        let score = scorer.score_signal(&signal, None);
        // 0.4*50 + 0.2*80 + 0.2*60 + 0.2*50 = 58.0
        assert_eq!(score, 58.0);
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_inventory_component_red_skew() {
        let scorer = create_test_scorer();
        let signal = create_test_signal(dec!(60), 0.0);
        let red = SkewReport {
            asset: "WETH".into(),
            venue_pct: vec![],
            max_deviation: dec!(40),
            needs_rebalance: true,
        };
        let with_red = scorer.score_signal(&signal, Some(&red));
        let without = scorer.score_signal(&signal, None);
        // 60 -> 20 on a 0.2 weight: 8 points lower
        assert_eq!(without - with_red, 8.0);
    }

    #[test]
    fn test_decay_scenario() {
        // score 80, ttl 10s, age 5s -> 60.0
        let mut signal = create_test_signal(dec!(60), 80.0);
        signal.score = 80.0;
        let decayed = SignalScorer::apply_decay(&signal, signal.timestamp + Duration::seconds(5));
        assert!((decayed - 60.0).abs() < 0.1);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let signal = create_test_signal(dec!(60), 80.0);
        let decayed =
            SignalScorer::apply_decay(&signal, signal.timestamp + Duration::seconds(1000));
        assert_eq!(decayed, 0.0);
    }
}
