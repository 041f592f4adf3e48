//! Absolute safety floors
//!
//! The last gate before execution. These bounds are compiled in and the
//! operator cannot raise them through configuration; they exist to bound
//! the damage of any bug or misconfiguration above this layer. A violation
//! is not a veto — it is fatal to the whole loop.
//!
//! Author: AI-Generated
//! Created: 2026-02-23

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// No single trade moves more than this many USD
pub const MAX_TRADE_USD: Decimal = dec!(25);
/// No day loses more than this many USD
pub const MAX_DAILY_LOSS_USD: Decimal = dec!(20);
/// Trading halts if capital falls below this
pub const MIN_CAPITAL_USD: Decimal = dec!(50);
/// No more than this many executions per hour
pub const MAX_TRADES_PER_HOUR: usize = 30;

#[derive(Debug, Error, PartialEq)]
pub enum SafetyViolation {
    #[error("SAFETY: trade value {0} exceeds the 25 USD absolute cap")]
    TradeTooLarge(Decimal),
    #[error("SAFETY: daily loss {0} breaches the 20 USD absolute cap")]
    DailyLossBreached(Decimal),
    #[error("SAFETY: capital {0} below the 50 USD absolute floor")]
    CapitalTooLow(Decimal),
    #[error("SAFETY: {0} trades in the last hour exceeds the absolute cap of 30")]
    TooManyTrades(usize),
}

#[derive(Debug, Default)]
pub struct SafetyCheck;

impl SafetyCheck {
    pub fn new() -> Self {
        Self
    }

    /// Check the hard floors against the current account state. The caller
    /// must treat an Err as fatal: log URGENT, alert, and stop the loop.
    pub fn check(
        &self,
        trade_value_usd: Decimal,
        daily_loss_usd: Decimal,
        capital_usd: Decimal,
        trades_last_hour: usize,
        _now: DateTime<Utc>,
    ) -> Result<(), SafetyViolation> {
        if trade_value_usd > MAX_TRADE_USD {
            return Err(SafetyViolation::TradeTooLarge(trade_value_usd));
        }
        if daily_loss_usd > MAX_DAILY_LOSS_USD {
            return Err(SafetyViolation::DailyLossBreached(daily_loss_usd));
        }
        if capital_usd < MIN_CAPITAL_USD {
            return Err(SafetyViolation::CapitalTooLow(capital_usd));
        }
        if trades_last_hour > MAX_TRADES_PER_HOUR {
            return Err(SafetyViolation::TooManyTrades(trades_last_hour));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_floors_passes() {
        let check = SafetyCheck::new();
        assert!(check
            .check(dec!(20), dec!(5), dec!(100), 10, Utc::now())
            .is_ok());
    }

    #[test]
    fn test_trade_cap_is_absolute() {
        let check = SafetyCheck::new();
        assert_eq!(
            check.check(dec!(25.01), dec!(0), dec!(100), 0, Utc::now()),
            Err(SafetyViolation::TradeTooLarge(dec!(25.01)))
        );
        // exactly at the cap is allowed
        assert!(check.check(dec!(25), dec!(0), dec!(100), 0, Utc::now()).is_ok());
    }

    #[test]
    fn test_daily_loss_floor() {
        let check = SafetyCheck::new();
        assert_eq!(
            check.check(dec!(1), dec!(20.5), dec!(100), 0, Utc::now()),
            Err(SafetyViolation::DailyLossBreached(dec!(20.5)))
        );
    }

    #[test]
    fn test_capital_floor() {
        let check = SafetyCheck::new();
        assert_eq!(
            check.check(dec!(1), dec!(0), dec!(49), 0, Utc::now()),
            Err(SafetyViolation::CapitalTooLow(dec!(49)))
        );
    }

    #[test]
    fn test_rate_floor() {
        let check = SafetyCheck::new();
        assert_eq!(
            check.check(dec!(1), dec!(0), dec!(100), 31, Utc::now()),
            Err(SafetyViolation::TooManyTrades(31))
        );
    }
}
