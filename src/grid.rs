//! Grid ladder construction.
//!
//! A [`GridLadder`] is the immutable, ascending sequence of trigger prices
//! derived from a [`GridConfig`]: `steps + 1` levels from the lower to the
//! upper bound with a fixed interval (arithmetic) or a fixed ratio (geometric).
//! A central price that falls between two levels is bracketed by them.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{GridConfig, ResolvedBounds, SizingMode, SpacingMode};
use crate::errors::Result;

/// Relative tolerance used when comparing prices against grid levels.
pub(crate) const PRICE_TOLERANCE: f64 = 1e-9;

pub(crate) fn same_price(a: f64, b: f64) -> bool {
    (a - b).abs() <= PRICE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// A single trigger price and the quantity traded when it fills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLevel {
    pub price: f64,
    pub quantity: f64,
}

impl GridLevel {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Immutable ladder of grid levels, ascending by price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLadder {
    spacing: SpacingMode,
    bounds: ResolvedBounds,
    /// Absolute interval for arithmetic grids, `ratio - 1` for geometric grids.
    interval: f64,
    central_index: usize,
    levels: Vec<GridLevel>,
}

impl GridLadder {
    /// Build the ladder for `config`, resolving relative bounds and a missing
    /// central price against `start_price`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `steps` is outside `1..=MAX_STEPS`,
    /// `lower >= upper`, or the central price lies outside `[lower, upper]`.
    pub fn build(config: &GridConfig, start_price: f64) -> Result<Self> {
        config.validate()?;
        let bounds = config.resolve(start_price)?;
        let steps = f64::from(config.steps);
        let central = bounds.central;

        let (interval, prices): (f64, Vec<f64>) = match config.spacing {
            SpacingMode::Arithmetic => {
                let interval = (bounds.upper - bounds.lower) / steps;
                let prices = (0..=config.steps)
                    .map(|i| bounds.lower + f64::from(i) * interval)
                    .collect();
                (interval, prices)
            }
            SpacingMode::Geometric => {
                let ratio = (bounds.upper / bounds.lower).powf(1.0 / steps);
                let prices = (0..=config.steps)
                    .map(|i| bounds.lower * ratio.powf(f64::from(i)))
                    .collect();
                (ratio - 1.0, prices)
            }
        };

        // Level at or below the central price.
        let central_index = prices
            .iter()
            .rposition(|p| *p < central || same_price(*p, central))
            .unwrap_or(0);
        let levels = size_levels(&prices, config.deployed_capital(), config.sizing);

        let ladder = Self {
            spacing: config.spacing,
            bounds,
            interval,
            central_index,
            levels,
        };

        info!(
            spacing = ?ladder.spacing,
            levels = ladder.levels.len(),
            lower = ladder.bounds.lower,
            upper = ladder.bounds.upper,
            central = central,
            interval = ladder.interval,
            "grid ladder built"
        );

        Ok(ladder)
    }

    pub fn spacing(&self) -> SpacingMode {
        self.spacing
    }

    pub fn bounds(&self) -> ResolvedBounds {
        self.bounds
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn levels(&self) -> &[GridLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, index: usize) -> Option<&GridLevel> {
        self.levels.get(index)
    }

    pub fn prices(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.price).collect()
    }

    /// Index of the level at or below the central price.
    pub fn central_index(&self) -> usize {
        self.central_index
    }

    pub fn central_price(&self) -> f64 {
        self.levels[self.central_index].price
    }

    /// Indices of the levels directly below and above `index`.
    pub fn neighbors(&self, index: usize) -> (Option<usize>, Option<usize>) {
        let below = index.checked_sub(1);
        let above = if index + 1 < self.levels.len() {
            Some(index + 1)
        } else {
            None
        };
        (below, above)
    }

    /// Nearest levels strictly bracketing `price`.
    ///
    /// A price sitting on a level is bracketed by that level's neighbours.
    /// Either side is `None` when the price is outside the ladder.
    pub fn bracket(&self, price: f64) -> (Option<usize>, Option<usize>) {
        if let Some(index) = self.levels.iter().position(|l| same_price(l.price, price)) {
            return self.neighbors(index);
        }
        let above = self.levels.iter().position(|l| l.price > price);
        let below = match above {
            Some(0) => None,
            Some(i) => Some(i - 1),
            None => Some(self.levels.len() - 1),
        };
        (below, above)
    }

    /// Profit of one completed grid round-trip as a fraction of price.
    pub fn expected_profit_rate(&self) -> f64 {
        match self.spacing {
            SpacingMode::Arithmetic => self.interval / self.central_price(),
            SpacingMode::Geometric => self.interval,
        }
    }

    /// Profit of one completed round-trip at the central level, in quote currency.
    pub fn expected_profit_amount(&self) -> f64 {
        let central = &self.levels[self.central_index];
        match self.spacing {
            SpacingMode::Arithmetic => self.interval * central.quantity,
            SpacingMode::Geometric => central.price * self.interval * central.quantity,
        }
    }
}

fn size_levels(prices: &[f64], deployed: f64, sizing: SizingMode) -> Vec<GridLevel> {
    match sizing {
        SizingMode::EqualQuantity => {
            let quantity = deployed / prices.iter().sum::<f64>();
            prices
                .iter()
                .map(|&price| GridLevel { price, quantity })
                .collect()
        }
        SizingMode::EqualNotional => {
            let per_level = deployed / prices.len() as f64;
            prices
                .iter()
                .map(|&price| GridLevel {
                    price,
                    quantity: per_level / price,
                })
                .collect()
        }
    }
}
