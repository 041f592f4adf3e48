//! Normalized Level-2 order book
//!
//! One snapshot of a CEX book, validated at construction: both sides
//! non-empty, bids strictly descending, asks strictly ascending, positive
//! prices and sizes, and best_ask above best_bid. Downstream analytics can
//! then assume a well-formed book. Everything is Decimal; no floats touch
//! prices or sizes.
//!
//! Author: AI-Generated
//! Created: 2026-02-13

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BookError {
    #[error("order book side is empty: {0}")]
    EmptySide(&'static str),
    #[error("order book not monotonic: {0}")]
    NotMonotonic(&'static str),
    #[error("crossed book: best ask {ask} <= best bid {bid}")]
    Crossed { bid: Decimal, ask: Decimal },
    #[error("non-positive level: price {price}, size {size}")]
    BadLevel { price: Decimal, size: Decimal },
}

/// One price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl BookLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Side of the book an operation works against, named by the aggressor:
/// a Buy walks the asks, a Sell walks the bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Buy,
    Sell,
}

/// Validated L2 snapshot: bids descending, asks ascending
#[derive(Debug, Clone)]
pub struct NormalizedOrderBook {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
}

impl NormalizedOrderBook {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
    ) -> Result<Self, BookError> {
        if bids.is_empty() {
            return Err(BookError::EmptySide("bids"));
        }
        if asks.is_empty() {
            return Err(BookError::EmptySide("asks"));
        }
        for level in bids.iter().chain(asks.iter()) {
            if level.price <= Decimal::ZERO || level.size <= Decimal::ZERO {
                return Err(BookError::BadLevel {
                    price: level.price,
                    size: level.size,
                });
            }
        }
        if bids.windows(2).any(|w| w[0].price <= w[1].price) {
            return Err(BookError::NotMonotonic("bids must descend"));
        }
        if asks.windows(2).any(|w| w[0].price >= w[1].price) {
            return Err(BookError::NotMonotonic("asks must ascend"));
        }
        let best_bid = bids[0].price;
        let best_ask = asks[0].price;
        if best_ask <= best_bid {
            return Err(BookError::Crossed {
                bid: best_bid,
                ask: best_ask,
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            timestamp,
            bids,
            asks,
        })
    }

    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    pub fn best_bid(&self) -> Decimal {
        self.bids[0].price
    }

    pub fn best_ask(&self) -> Decimal {
        self.asks[0].price
    }

    pub fn mid(&self) -> Decimal {
        (self.best_bid() + self.best_ask()) / Decimal::TWO
    }

    /// (ask - bid) / mid * 10_000
    pub fn spread_bps(&self) -> Decimal {
        (self.best_ask() - self.best_bid()) / self.mid() * Decimal::from(10_000)
    }

    /// Levels walked by an aggressor on `side`: asks for a buyer, bids for
    /// a seller, already sorted in consumption order.
    pub fn levels_for(&self, side: BookSide) -> &[BookLevel] {
        match side {
            BookSide::Buy => &self.asks,
            BookSide::Sell => &self.bids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn create_test_book() -> NormalizedOrderBook {
        NormalizedOrderBook::new(
            "ETHUSDC",
            Utc::now(),
            vec![
                BookLevel::new(dec!(1999), dec!(1.0)),
                BookLevel::new(dec!(1998), dec!(2.0)),
            ],
            vec![
                BookLevel::new(dec!(2001), dec!(1.0)),
                BookLevel::new(dec!(2002), dec!(2.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_valid_book_derived_fields() {
        let book = create_test_book();
        assert_eq!(book.best_bid(), dec!(1999));
        assert_eq!(book.best_ask(), dec!(2001));
        assert_eq!(book.mid(), dec!(2000));
        assert_eq!(book.spread_bps(), dec!(10));
    }

    #[test]
    fn test_rejects_empty_side() {
        let err = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![],
            vec![BookLevel::new(dec!(1), dec!(1))],
        )
        .unwrap_err();
        assert_eq!(err, BookError::EmptySide("bids"));
    }

    #[test]
    fn test_rejects_unsorted_sides() {
        let err = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![
                BookLevel::new(dec!(10), dec!(1)),
                BookLevel::new(dec!(11), dec!(1)),
            ],
            vec![BookLevel::new(dec!(12), dec!(1))],
        )
        .unwrap_err();
        assert_eq!(err, BookError::NotMonotonic("bids must descend"));
    }

    #[test]
    fn test_rejects_crossed_book() {
        let err = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![BookLevel::new(dec!(100), dec!(1))],
            vec![BookLevel::new(dec!(99), dec!(1))],
        )
        .unwrap_err();
        assert!(matches!(err, BookError::Crossed { .. }));
    }

    #[test]
    fn test_rejects_non_positive_levels() {
        let err = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![BookLevel::new(dec!(100), dec!(0))],
            vec![BookLevel::new(dec!(101), dec!(1))],
        )
        .unwrap_err();
        assert!(matches!(err, BookError::BadLevel { .. }));
    }
}
