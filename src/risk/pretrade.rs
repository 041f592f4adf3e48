//! Pre-trade data sanity gate
//!
//! Catches broken inputs before they reach risk accounting: non-positive
//! prices or sizes, spreads too wide to be real, and stale signals. A
//! 500 bps "spread" on a liquid pair is a data error, not a trade.
//!
//! Author: AI-Generated
//! Created: 2026-02-23

use super::GateVeto;
use crate::types::Signal;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Spreads above this are treated as bad data
const MAX_PLAUSIBLE_SPREAD_BPS: i64 = 500;
/// Signals older than this are refused
const MAX_AGE_SECS: u64 = 5;

#[derive(Debug, Default)]
pub struct PreTradeValidator;

impl PreTradeValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, signal: &Signal, now: DateTime<Utc>) -> Result<(), GateVeto> {
        if signal.cex_price <= Decimal::ZERO || signal.dex_price <= Decimal::ZERO {
            return Err(GateVeto::BadData(format!(
                "non-positive price: cex {} dex {}",
                signal.cex_price, signal.dex_price
            )));
        }
        if signal.size <= Decimal::ZERO {
            return Err(GateVeto::BadData(format!(
                "non-positive size {}",
                signal.size
            )));
        }
        if signal.spread_bps > Decimal::from(MAX_PLAUSIBLE_SPREAD_BPS) {
            return Err(GateVeto::BadData(format!(
                "spread {} bps beyond plausible {} bps",
                signal.spread_bps.round_dp(1),
                MAX_PLAUSIBLE_SPREAD_BPS
            )));
        }
        let age = signal.age_seconds(now);
        if age > MAX_AGE_SECS as f64 {
            return Err(GateVeto::Stale {
                age_secs: age,
                max_secs: MAX_AGE_SECS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, MarketPair, Token};
    use alloy::primitives::Address;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn create_test_signal() -> Signal {
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
            spread_bps: dec!(50),
            size: dec!(1),
            expected_gross: dec!(10),
            expected_fees: dec!(4),
            expected_net: dec!(6),
            score: 50.0,
            timestamp: now,
            expiry: now + Duration::seconds(10),
            inventory_ok: true,
            within_limits: true,
        }
    }

    #[test]
    fn test_clean_signal_passes() {
        let signal = create_test_signal();
        assert!(PreTradeValidator::new()
            .validate(&signal, Utc::now())
            .is_ok());
    }

    #[test]
    fn test_wide_spread_is_bad_data() {
        let mut signal = create_test_signal();
        signal.spread_bps = dec!(501);
        let err = PreTradeValidator::new()
            .validate(&signal, Utc::now())
            .unwrap_err();
        assert!(matches!(err, GateVeto::BadData(_)));
    }

    #[test]
    fn test_stale_signal_refused() {
        let signal = create_test_signal();
        let err = PreTradeValidator::new()
            .validate(&signal, signal.timestamp + Duration::seconds(6))
            .unwrap_err();
        assert!(matches!(err, GateVeto::Stale { .. }));
    }

    #[test]
    fn test_non_positive_price_refused() {
        let mut signal = create_test_signal();
        signal.dex_price = Decimal::ZERO;
        assert!(PreTradeValidator::new()
            .validate(&signal, Utc::now())
            .is_err());
    }
}
