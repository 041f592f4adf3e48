//! Risk manager
//!
//! Operator-configured limits over trade size, capital fraction, daily
//! losses, drawdown from peak, consecutive losses, and trade frequency.
//! Outcome accounting lives here too: the orchestrator reports every
//! terminal execution so the caps see the same P&L stream the books do.
//!
//! Daily counters reset on the UTC date change.
//!
//! Author: AI-Generated
//! Created: 2026-02-23
//! Modified: 2026-03-22 - trades/hour window moved to a timestamp deque

use super::GateVeto;
use crate::types::Signal;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Hard cap on a single trade's notional (USD)
    pub max_trade_usd: Decimal,
    /// Cap as a fraction of current capital (0.1 = 10%)
    pub max_trade_pct_capital: Decimal,
    /// Most we tolerate losing in one UTC day (positive number)
    pub daily_loss_cap_usd: Decimal,
    /// Max drawdown from peak capital (0.2 = 20%)
    pub max_drawdown_pct: Decimal,
    pub max_consecutive_losses: u32,
    pub max_trades_per_hour: usize,
    pub starting_capital_usd: Decimal,
}

pub struct RiskManager {
    config: RiskConfig,
    capital: Decimal,
    peak_capital: Decimal,
    daily_loss: Decimal,
    day: NaiveDate,
    consecutive_losses: u32,
    /// Execution timestamps within the rolling hour
    trade_times: VecDeque<DateTime<Utc>>,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        let capital = config.starting_capital_usd;
        Self {
            config,
            capital,
            peak_capital: capital,
            daily_loss: Decimal::ZERO,
            day: Utc::now().date_naive(),
            consecutive_losses: 0,
            trade_times: VecDeque::new(),
        }
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    pub fn daily_loss(&self) -> Decimal {
        self.daily_loss
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    /// Trades executed in the rolling hour ending at `now`
    pub fn trades_last_hour(&self, now: DateTime<Utc>) -> usize {
        self.trade_times
            .iter()
            .filter(|t| now - **t < Duration::hours(1))
            .count()
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.day {
            info!(
                "risk day roll {} -> {}: daily loss {} reset",
                self.day, today, self.daily_loss
            );
            self.day = today;
            self.daily_loss = Decimal::ZERO;
        }
    }

    /// Admission check. Called after the pre-trade validator.
    pub fn check(&mut self, signal: &Signal, now: DateTime<Utc>) -> Result<(), GateVeto> {
        self.roll_day(now);
        let value = signal.trade_value();

        if value > self.config.max_trade_usd {
            return Err(GateVeto::RiskLimit(format!(
                "trade value {} exceeds per-trade cap {}",
                value.round_dp(2),
                self.config.max_trade_usd
            )));
        }
        let pct_cap = self.capital * self.config.max_trade_pct_capital;
        if value > pct_cap {
            return Err(GateVeto::RiskLimit(format!(
                "trade value {} exceeds {}% of capital ({})",
                value.round_dp(2),
                (self.config.max_trade_pct_capital * Decimal::ONE_HUNDRED).round_dp(1),
                pct_cap.round_dp(2)
            )));
        }
        if self.daily_loss >= self.config.daily_loss_cap_usd {
            return Err(GateVeto::RiskLimit(format!(
                "daily loss {} at cap {}",
                self.daily_loss.round_dp(2),
                self.config.daily_loss_cap_usd
            )));
        }
        let drawdown_floor =
            self.peak_capital * (Decimal::ONE - self.config.max_drawdown_pct);
        if self.capital <= drawdown_floor {
            return Err(GateVeto::RiskLimit(format!(
                "capital {} below drawdown floor {} (peak {})",
                self.capital.round_dp(2),
                drawdown_floor.round_dp(2),
                self.peak_capital.round_dp(2)
            )));
        }
        if self.consecutive_losses >= self.config.max_consecutive_losses {
            return Err(GateVeto::RiskLimit(format!(
                "{} consecutive losses (cap {})",
                self.consecutive_losses, self.config.max_consecutive_losses
            )));
        }
        if self.trades_last_hour(now) >= self.config.max_trades_per_hour {
            return Err(GateVeto::RiskLimit(format!(
                "{} trades in the last hour (cap {})",
                self.trades_last_hour(now),
                self.config.max_trades_per_hour
            )));
        }
        Ok(())
    }

    /// Record a terminal execution outcome
    pub fn record_outcome(&mut self, net_pnl: Decimal, now: DateTime<Utc>) {
        self.roll_day(now);
        self.trade_times.push_back(now);
        while let Some(front) = self.trade_times.front() {
            if now - *front >= Duration::hours(2) {
                self.trade_times.pop_front();
            } else {
                break;
            }
        }

        self.capital += net_pnl;
        if self.capital > self.peak_capital {
            self.peak_capital = self.capital;
        }
        if net_pnl < Decimal::ZERO {
            self.daily_loss += -net_pnl;
            self.consecutive_losses += 1;
            warn!(
                "loss recorded: {} (daily {}, streak {})",
                net_pnl.round_dp(2),
                self.daily_loss.round_dp(2),
                self.consecutive_losses
            );
        } else {
            self.consecutive_losses = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, MarketPair, Token};
    use alloy::primitives::Address;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn create_test_signal(size: Decimal, price: Decimal) -> Signal {
        let now = Utc::now();
        Signal {
            id: Uuid::new_v4(),
            pair: MarketPair::new(
                Token::new("WETH", Address::repeat_byte(1), 18),
                Token::new("USDC", Address::repeat_byte(2), 6),
                "ETHUSDC",
            ),
            direction: Direction::BuyCexSellDex,
            cex_price: price,
            dex_price: price + dec!(5),
            spread_bps: dec!(50),
            size,
            expected_gross: dec!(1),
            expected_fees: dec!(0.4),
            expected_net: dec!(0.6),
            score: 50.0,
            timestamp: now,
            expiry: now + chrono::Duration::seconds(10),
            inventory_ok: true,
            within_limits: true,
        }
    }

    fn create_test_manager() -> RiskManager {
        RiskManager::new(RiskConfig {
            max_trade_usd: dec!(20),
            max_trade_pct_capital: dec!(0.1),
            daily_loss_cap_usd: dec!(10),
            max_drawdown_pct: dec!(0.2),
            max_consecutive_losses: 3,
            max_trades_per_hour: 5,
            starting_capital_usd: dec!(200),
        })
    }

    #[test]
    fn test_small_trade_passes() {
        let mut mgr = create_test_manager();
        let signal = create_test_signal(dec!(0.005), dec!(2000)); // $10
        assert!(mgr.check(&signal, Utc::now()).is_ok());
    }

    #[test]
    fn test_per_trade_cap() {
        let mut mgr = create_test_manager();
        let signal = create_test_signal(dec!(0.02), dec!(2000)); // $40
        assert!(mgr.check(&signal, Utc::now()).is_err());
    }

    #[test]
    fn test_pct_of_capital_cap() {
        let mut mgr = create_test_manager();
        // $19 < $20 cap but > 10% of $150 after losses
        mgr.record_outcome(dec!(-50), Utc::now());
        // reset loss streak so only the pct cap triggers
        mgr.record_outcome(dec!(0.01), Utc::now());
        let signal = create_test_signal(dec!(0.0095), dec!(2000)); // $19
        let err = mgr.check(&signal, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("% of capital"));
    }

    #[test]
    fn test_daily_loss_cap() {
        let mut mgr = create_test_manager();
        mgr.record_outcome(dec!(-6), Utc::now());
        mgr.record_outcome(dec!(0.01), Utc::now());
        mgr.record_outcome(dec!(-5), Utc::now());
        mgr.record_outcome(dec!(0.01), Utc::now());
        let signal = create_test_signal(dec!(0.005), dec!(2000));
        let err = mgr.check(&signal, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("daily loss"));
    }

    #[test]
    fn test_consecutive_loss_cap() {
        let mut mgr = create_test_manager();
        for _ in 0..3 {
            mgr.record_outcome(dec!(-0.5), Utc::now());
        }
        let signal = create_test_signal(dec!(0.005), dec!(2000));
        let err = mgr.check(&signal, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("consecutive"));

        // one win resets the streak
        mgr.record_outcome(dec!(0.5), Utc::now());
        assert!(mgr.check(&signal, Utc::now()).is_ok());
    }

    #[test]
    fn test_trades_per_hour_cap() {
        let mut mgr = create_test_manager();
        let now = Utc::now();
        for _ in 0..5 {
            mgr.record_outcome(dec!(0.1), now);
        }
        let signal = create_test_signal(dec!(0.005), dec!(2000));
        let err = mgr.check(&signal, now).unwrap_err();
        assert!(err.to_string().contains("last hour"));

        // outside the rolling hour the cap clears
        assert!(mgr.check(&signal, now + Duration::minutes(61)).is_ok());
    }

    #[test]
    fn test_drawdown_cap() {
        let mut mgr = create_test_manager();
        // capital 200 -> 155 yesterday; floor is 160. The day roll clears
        // the daily-loss counter so the drawdown check is what fires.
        let yesterday = Utc::now() - Duration::days(1);
        mgr.record_outcome(dec!(-45), yesterday);
        mgr.record_outcome(dec!(0.01), yesterday);
        let signal = create_test_signal(dec!(0.005), dec!(2000));
        let err = mgr.check(&signal, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("drawdown"));
    }

    #[test]
    fn test_capital_tracks_outcomes() {
        let mut mgr = create_test_manager();
        mgr.record_outcome(dec!(5), Utc::now());
        mgr.record_outcome(dec!(-2), Utc::now());
        assert_eq!(mgr.capital(), dec!(203));
        assert_eq!(mgr.daily_loss(), dec!(2));
    }
}
