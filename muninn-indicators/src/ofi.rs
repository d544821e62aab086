//! Order Flow Imbalance over top-of-book updates.
//!
//! Event-contribution form: each BBO change contributes signed size on each
//! side, and OFI is bid contribution minus ask contribution. Positive values
//! mean net buy pressure. Per side:
//!
//! - price improves (bid up / ask down): the full new size counts as fresh
//!   pressure on that side;
//! - price retreats (bid down / ask up): the prior resting size counts as
//!   withdrawn;
//! - price unchanged: the size delta counts.

use crate::bbo::{BboState, Level};

/// Stateful OFI calculator for one instrument.
#[derive(Debug, Default)]
pub struct OfiCalculator {
    prev: BboState,
}

impl OfiCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the remembered BBO; the next update seeds state again.
    pub fn reset(&mut self) {
        self.prev.clear();
    }

    /// The last BBO this calculator has seen.
    pub fn state(&self) -> BboState {
        self.prev
    }

    /// Update with a complete top of book.
    ///
    /// Returns `None` on the seeding observation (no previous state to diff
    /// against), `Some(ofi)` afterwards.
    pub fn update(&mut self, bid: Level, ask: Level) -> Option<f64> {
        let (prev_bid, prev_ask) = match (self.prev.bid, self.prev.ask) {
            (Some(b), Some(a)) => (b, a),
            _ => {
                self.prev.bid = Some(bid);
                self.prev.ask = Some(ask);
                return None;
            }
        };

        let bid_contrib = if bid.price > prev_bid.price {
            bid.size
        } else if bid.price < prev_bid.price {
            -prev_bid.size
        } else {
            bid.size - prev_bid.size
        };

        let ask_contrib = if ask.price < prev_ask.price {
            ask.size
        } else if ask.price > prev_ask.price {
            -prev_ask.size
        } else {
            ask.size - prev_ask.size
        };

        self.prev.bid = Some(bid);
        self.prev.ask = Some(ask);
        Some(bid_contrib - ask_contrib)
    }

    /// Update tolerating missing depth.
    ///
    /// When either side is absent the flow is treated as zero and the stored
    /// state replaced, so a momentary feed gap does not fabricate pressure.
    pub fn update_levels(&mut self, bid: Option<Level>, ask: Option<Level>) -> Option<f64> {
        match (bid, ask) {
            (Some(b), Some(a)) => self.update(b, a),
            _ => {
                self.prev.bid = bid;
                self.prev.ask = ask;
                Some(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(bid: (f64, f64), ask: (f64, f64)) -> OfiCalculator {
        let mut calc = OfiCalculator::new();
        assert_eq!(calc.update(Level::new(bid.0, bid.1), Level::new(ask.0, ask.1)), None);
        calc
    }

    #[test]
    fn bid_size_add_is_buy_pressure() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        let ofi = calc.update(Level::new(100.0, 15.0), Level::new(101.0, 10.0)).unwrap();
        assert_eq!(ofi, 5.0);
    }

    #[test]
    fn ask_size_drop_is_buy_pressure() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        let ofi = calc.update(Level::new(100.0, 10.0), Level::new(101.0, 2.0)).unwrap();
        // ask_contrib = 2 - 10 = -8; OFI = 0 - (-8) = +8
        assert_eq!(ofi, 8.0);
    }

    #[test]
    fn broken_bid_support_is_sell_pressure() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        let ofi = calc.update(Level::new(99.5, 20.0), Level::new(101.0, 10.0)).unwrap();
        assert_eq!(ofi, -10.0);
    }

    #[test]
    fn bid_price_improvement_counts_full_size() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        let ofi = calc.update(Level::new(100.5, 7.0), Level::new(101.0, 10.0)).unwrap();
        assert_eq!(ofi, 7.0);
    }

    #[test]
    fn aggressive_ask_down_move_counts_full_size() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        let ofi = calc.update(Level::new(100.0, 10.0), Level::new(100.5, 6.0)).unwrap();
        assert_eq!(ofi, -6.0);
    }

    #[test]
    fn swapping_sides_inverts_sign() {
        // Mirror a bid-side size add onto the ask side: sign flips.
        let mut bid_side = seeded((100.0, 10.0), (101.0, 10.0));
        let up = bid_side.update(Level::new(100.0, 18.0), Level::new(101.0, 10.0)).unwrap();

        let mut ask_side = seeded((100.0, 10.0), (101.0, 10.0));
        let down = ask_side.update(Level::new(100.0, 10.0), Level::new(101.0, 18.0)).unwrap();

        assert_eq!(up, -down);
        assert_eq!(up, 8.0);
    }

    #[test]
    fn missing_depth_reports_zero_flow() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        assert_eq!(calc.update_levels(Some(Level::new(100.0, 10.0)), None), Some(0.0));
        // State was replaced, so the next full update seeds again.
        assert_eq!(
            calc.update(Level::new(100.0, 12.0), Level::new(101.0, 10.0)),
            None
        );
    }

    #[test]
    fn reset_forgets_state() {
        let mut calc = seeded((100.0, 10.0), (101.0, 10.0));
        calc.reset();
        assert_eq!(calc.update(Level::new(100.0, 15.0), Level::new(101.0, 10.0)), None);
    }
}
