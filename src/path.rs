//! Intra-candle price path reconstruction.
//!
//! Only OHLC data is available, so each candle is replayed along one of two
//! canonical shapes:
//!
//! - bullish (`close >= open`): previous price → open → low → high → close
//! - bearish (`close < open`):  previous price → open → high → low → close
//!
//! This is an approximation. A candle that really visited its high before its
//! low (or crossed a level several times) is replayed in the fixed order above,
//! so results drift from reality as grid spacing narrows relative to the
//! typical candle range.

use std::iter::FusedIterator;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::data::Candle;

/// One point on the reconstructed path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub timestamp: DateTime<FixedOffset>,
    pub price: f64,
}

const PATH_LEN: usize = 5;

/// Lazy path through one candle, ending on its close.
#[derive(Debug, Clone)]
pub struct CandlePath {
    timestamp: DateTime<FixedOffset>,
    prices: [f64; PATH_LEN],
    next: usize,
}

impl CandlePath {
    /// Expand `candle`, starting from the price carried over from the previous candle.
    pub fn new(candle: &Candle, curr_price: f64) -> Self {
        let prices = if candle.is_bullish() {
            [curr_price, candle.open, candle.low, candle.high, candle.close]
        } else {
            [curr_price, candle.open, candle.high, candle.low, candle.close]
        };
        Self {
            timestamp: candle.timestamp,
            prices,
            next: 0,
        }
    }
}

impl Iterator for CandlePath {
    type Item = PathStep;

    fn next(&mut self) -> Option<PathStep> {
        let price = *self.prices.get(self.next)?;
        self.next += 1;
        Some(PathStep {
            timestamp: self.timestamp,
            price,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = PATH_LEN.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CandlePath {}

impl FusedIterator for CandlePath {}

/// Convenience wrapper for [`CandlePath::new`].
pub fn expand_candle(candle: &Candle, curr_price: f64) -> CandlePath {
    CandlePath::new(candle, curr_price)
}
