//! Order-book analytics
//!
//! Depth, imbalance, walk-the-book fills and effective spread over a
//! validated NormalizedOrderBook. All arithmetic stays in Decimal so sizes
//! and prices keep full precision through aggregation.
//!
//! Author: AI-Generated
//! Created: 2026-02-13
//! Modified: 2026-03-02 - effective_spread defined in bps of mid

use super::book::{BookLevel, BookSide, NormalizedOrderBook};
use rust_decimal::Decimal;

/// Result of walking one side of the book for a target quantity
#[derive(Debug, Clone, PartialEq)]
pub struct WalkResult {
    /// Size-weighted average fill price (zero when nothing filled)
    pub avg_price: Decimal,
    /// Total quote spent/received
    pub total_cost: Decimal,
    /// |avg - best| / best * 10_000
    pub slippage_bps: Decimal,
    pub levels_consumed: usize,
    pub fully_filled: bool,
    /// Per-level fills in consumption order
    pub fills: Vec<BookLevel>,
}

/// Analytics over one book snapshot
pub struct BookAnalyzer<'a> {
    book: &'a NormalizedOrderBook,
}

impl<'a> BookAnalyzer<'a> {
    pub fn new(book: &'a NormalizedOrderBook) -> Self {
        Self { book }
    }

    /// Fill `qty` against the book: a Buy consumes asks ascending, a Sell
    /// consumes bids descending. Fills sum to min(qty, side liquidity).
    pub fn walk_the_book(&self, side: BookSide, qty: Decimal) -> WalkResult {
        let levels = self.book.levels_for(side);
        let best = levels[0].price;

        let mut remaining = qty.max(Decimal::ZERO);
        let mut total_cost = Decimal::ZERO;
        let mut filled = Decimal::ZERO;
        let mut fills = Vec::new();

        for level in levels {
            if remaining.is_zero() {
                break;
            }
            let take = remaining.min(level.size);
            total_cost += take * level.price;
            filled += take;
            remaining -= take;
            fills.push(BookLevel::new(level.price, take));
        }

        let avg_price = if filled.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / filled
        };
        let slippage_bps = if filled.is_zero() {
            Decimal::ZERO
        } else {
            ((avg_price - best).abs() / best) * Decimal::from(10_000)
        };

        WalkResult {
            avg_price,
            total_cost,
            slippage_bps,
            levels_consumed: fills.len(),
            fully_filled: remaining.is_zero() && !qty.is_zero(),
            fills,
        }
    }

    /// Total size resting within `bps` of the best price on `side`
    pub fn depth_at_bps(&self, side: BookSide, bps: Decimal) -> Decimal {
        let levels = self.book.levels_for(side);
        let best = levels[0].price;
        let band = best * bps / Decimal::from(10_000);
        let limit = match side {
            BookSide::Buy => best + band,
            BookSide::Sell => best - band,
        };
        levels
            .iter()
            .filter(|l| match side {
                BookSide::Buy => l.price <= limit,
                BookSide::Sell => l.price >= limit,
            })
            .map(|l| l.size)
            .sum()
    }

    /// (bid_qty - ask_qty) / (bid_qty + ask_qty) over the top `n` levels,
    /// zero when both sides are empty within n.
    pub fn imbalance(&self, n: usize) -> Decimal {
        let bid_qty: Decimal = self.book.bids().iter().take(n).map(|l| l.size).sum();
        let ask_qty: Decimal = self.book.asks().iter().take(n).map(|l| l.size).sum();
        let denom = bid_qty + ask_qty;
        if denom.is_zero() {
            Decimal::ZERO
        } else {
            (bid_qty - ask_qty) / denom
        }
    }

    /// Round-trip cost of trading `qty` both ways, in bps of the mid:
    /// (buy_avg - sell_avg) / mid * 10_000
    pub fn effective_spread(&self, qty: Decimal) -> Decimal {
        let buy = self.walk_the_book(BookSide::Buy, qty);
        let sell = self.walk_the_book(BookSide::Sell, qty);
        (buy.avg_price - sell.avg_price) / self.book.mid() * Decimal::from(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn create_test_book() -> NormalizedOrderBook {
        NormalizedOrderBook::new(
            "ETHUSDC",
            Utc::now(),
            vec![
                BookLevel::new(dec!(1999), dec!(1.0)),
                BookLevel::new(dec!(1998), dec!(2.0)),
                BookLevel::new(dec!(1990), dec!(5.0)),
            ],
            vec![
                BookLevel::new(dec!(2001), dec!(1.0)),
                BookLevel::new(dec!(2002), dec!(2.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_walk_two_levels_exact_average() {
        // Buying 2 consumes (2001, 1) and half of (2002, 2):
        // avg = (2001*1 + 2002*1) / 2 = 2001.5
        let book = create_test_book();
        let walk = BookAnalyzer::new(&book).walk_the_book(BookSide::Buy, dec!(2));
        assert_eq!(walk.avg_price, dec!(2001.5));
        assert_eq!(walk.total_cost, dec!(4003));
        assert_eq!(walk.levels_consumed, 2);
        assert!(walk.fully_filled);
        assert_eq!(walk.fills[0], BookLevel::new(dec!(2001), dec!(1)));
        assert_eq!(walk.fills[1], BookLevel::new(dec!(2002), dec!(1)));
    }

    #[test]
    fn test_walk_fills_sum_to_min_of_qty_and_liquidity() {
        let book = create_test_book();
        let analyzer = BookAnalyzer::new(&book);

        // qty inside liquidity
        let walk = analyzer.walk_the_book(BookSide::Sell, dec!(2.5));
        let total: Decimal = walk.fills.iter().map(|f| f.size).sum();
        assert_eq!(total, dec!(2.5));
        assert!(walk.fully_filled);

        // qty beyond liquidity (asks hold 3.0)
        let walk = analyzer.walk_the_book(BookSide::Buy, dec!(10));
        let total: Decimal = walk.fills.iter().map(|f| f.size).sum();
        assert_eq!(total, dec!(3.0));
        assert!(!walk.fully_filled);
    }

    #[test]
    fn test_walk_slippage_bps() {
        let book = create_test_book();
        let walk = BookAnalyzer::new(&book).walk_the_book(BookSide::Buy, dec!(2));
        // |2001.5 - 2001| / 2001 * 10_000
        let expected = dec!(0.5) / dec!(2001) * dec!(10000);
        assert_eq!(walk.slippage_bps, expected);
    }

    #[test]
    fn test_depth_at_bps() {
        let book = create_test_book();
        let analyzer = BookAnalyzer::new(&book);
        // 1999 * 10bps band = ~2.0 -> includes 1999 and 1998, not 1990
        assert_eq!(analyzer.depth_at_bps(BookSide::Sell, dec!(10)), dec!(3.0));
        // wide band includes everything
        assert_eq!(analyzer.depth_at_bps(BookSide::Sell, dec!(100)), dec!(8.0));
    }

    #[test]
    fn test_imbalance() {
        let book = create_test_book();
        let analyzer = BookAnalyzer::new(&book);
        // top 2: bids 3.0, asks 3.0
        assert_eq!(analyzer.imbalance(2), Decimal::ZERO);
        // top 3: bids 8.0, asks 3.0 -> 5/11
        assert_eq!(analyzer.imbalance(3), dec!(5) / dec!(11));
        // zero levels -> defined as zero
        assert_eq!(analyzer.imbalance(0), Decimal::ZERO);
    }

    #[test]
    fn test_effective_spread() {
        let book = create_test_book();
        let analyzer = BookAnalyzer::new(&book);
        // qty 1: buy avg 2001, sell avg 1999, mid 2000 -> 10 bps
        assert_eq!(analyzer.effective_spread(dec!(1)), dec!(10));
        // larger qty widens the effective spread
        assert!(analyzer.effective_spread(dec!(2)) > dec!(10));
    }
}
