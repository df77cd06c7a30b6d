//! # Backtest Configuration
//!
//! Immutable configuration for a single grid backtest run. Everything here is
//! created once before replay and never mutated afterwards.
//!
//! Settings can be built in code with the `with_*` helpers or loaded from JSON:
//!
//! ```rust,ignore
//! use grid_backtest::config::BacktestSettings;
//!
//! let settings = BacktestSettings::from_json_file("grid.json")?;
//! settings.validate()?;
//! # Ok::<(), grid_backtest::errors::GridBacktestError>(())
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::errors::{GridBacktestError, Result};

/// Spacing between consecutive grid levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingMode {
    /// Constant absolute distance between levels.
    Arithmetic,
    /// Constant percentage distance between levels.
    Geometric,
}

/// How the grid price range is specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceBounds {
    /// Fixed lower and upper prices.
    Explicit { lower: f64, upper: f64 },
    /// Range relative to the starting price, e.g. `0.05` for ±5%.
    ///
    /// Geometric grids use `central / (1 + range)` as the lower bound so the
    /// central price sits on the middle level.
    Relative { range: f64 },
}

/// Which side of the book the grid is allowed to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionMode {
    /// Both net long and net short grid positions.
    #[default]
    Neutral,
    /// Never opens a net short position.
    Long,
    /// Never opens a net long position.
    Short,
}

/// How deployed capital is turned into per-level order quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Same unit count on every level: `capital / sum(level prices)`.
    #[default]
    EqualQuantity,
    /// Same notional on every level: `capital / (levels * level price)`.
    EqualNotional,
}

/// Grid strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub spacing: SpacingMode,
    pub bounds: PriceBounds,
    /// Central price of the ladder. `None` uses the starting price of the replay.
    #[serde(default)]
    pub central_price: Option<f64>,
    pub steps: u32,
    pub capital: f64,
    pub leverage: f64,
    /// Share of `capital * leverage` committed to the grid.
    #[serde(default = "default_capital_ratio")]
    pub capital_ratio: f64,
    #[serde(default)]
    pub direction: DirectionMode,
    #[serde(default)]
    pub sizing: SizingMode,
    /// Maintenance margin rate used by the liquidation check. `None` disables it.
    #[serde(default)]
    pub maintenance_margin_rate: Option<f64>,
}

/// Largest accepted step count.
pub const MAX_STEPS: u32 = 100_000;

fn default_capital_ratio() -> f64 {
    1.0
}

impl GridConfig {
    /// Create a neutral, equal-quantity grid with explicit bounds.
    pub fn new(spacing: SpacingMode, lower: f64, upper: f64, steps: u32, capital: f64) -> Self {
        Self {
            spacing,
            bounds: PriceBounds::Explicit { lower, upper },
            central_price: None,
            steps,
            capital,
            leverage: 1.0,
            capital_ratio: default_capital_ratio(),
            direction: DirectionMode::Neutral,
            sizing: SizingMode::EqualQuantity,
            maintenance_margin_rate: None,
        }
    }

    /// Create a grid whose bounds are derived from the starting price.
    pub fn relative(spacing: SpacingMode, range: f64, steps: u32, capital: f64) -> Self {
        Self {
            bounds: PriceBounds::Relative { range },
            ..Self::new(spacing, 0.0, 0.0, steps, capital)
        }
    }

    #[must_use]
    pub fn with_central_price(mut self, price: f64) -> Self {
        self.central_price = Some(price);
        self
    }

    #[must_use]
    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    #[must_use]
    pub fn with_capital_ratio(mut self, ratio: f64) -> Self {
        self.capital_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: DirectionMode) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_sizing(mut self, sizing: SizingMode) -> Self {
        self.sizing = sizing;
        self
    }

    #[must_use]
    pub fn with_maintenance_margin_rate(mut self, rate: f64) -> Self {
        self.maintenance_margin_rate = Some(rate);
        self
    }

    /// Resolve central price and bounds against the replay's starting price.
    pub fn resolve(&self, start_price: f64) -> Result<ResolvedBounds> {
        if !(start_price.is_finite() && start_price > 0.0) {
            return Err(GridBacktestError::config_error(format!(
                "starting price must be positive, got {}",
                start_price
            )));
        }

        let central = self.central_price.unwrap_or(start_price);
        let (lower, upper) = match self.bounds {
            PriceBounds::Explicit { lower, upper } => (lower, upper),
            PriceBounds::Relative { range } => {
                if !(range > 0.0 && range < 1.0) {
                    return Err(GridBacktestError::config_error(format!(
                        "relative range must be in (0, 1), got {}",
                        range
                    )));
                }
                let upper = central * (1.0 + range);
                match self.spacing {
                    SpacingMode::Arithmetic => (central * (1.0 - range), upper),
                    SpacingMode::Geometric => (central / (1.0 + range), upper),
                }
            }
        };

        let resolved = ResolvedBounds {
            lower,
            upper,
            central,
        };
        resolved.validate(self.steps)?;
        Ok(resolved)
    }

    /// Validate the parts of the configuration that do not depend on prices.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_STEPS).contains(&self.steps) {
            return Err(GridBacktestError::config_error(format!(
                "grid steps must be in 1..={}, got {}",
                MAX_STEPS, self.steps
            )));
        }
        if !(self.capital.is_finite() && self.capital > 0.0) {
            return Err(GridBacktestError::config_error("capital must be positive"));
        }
        if !(self.leverage.is_finite() && self.leverage > 0.0) {
            return Err(GridBacktestError::config_error("leverage must be positive"));
        }
        if !(self.capital_ratio > 0.0 && self.capital_ratio <= 1.0) {
            return Err(GridBacktestError::config_error(
                "capital_ratio must be in (0, 1]",
            ));
        }
        if let Some(rate) = self.maintenance_margin_rate {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(GridBacktestError::config_error(
                    "maintenance_margin_rate must be in (0, 1)",
                ));
            }
        }
        if let Some(central) = self.central_price {
            if !(central.is_finite() && central > 0.0) {
                return Err(GridBacktestError::config_error(format!(
                    "central price must be positive, got {}",
                    central
                )));
            }
        }
        if let PriceBounds::Explicit { lower, upper } = self.bounds {
            if !(lower > 0.0 && lower < upper && upper.is_finite()) {
                return Err(GridBacktestError::config_error(format!(
                    "lower bound {} must be positive and below upper bound {}",
                    lower, upper
                )));
            }
        }
        Ok(())
    }

    /// Capital committed to the grid after leverage and capital ratio.
    pub fn deployed_capital(&self) -> f64 {
        self.capital * self.leverage * self.capital_ratio
    }
}

/// Bounds and central price after relative ranges have been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBounds {
    pub lower: f64,
    pub upper: f64,
    pub central: f64,
}

impl ResolvedBounds {
    fn validate(&self, steps: u32) -> Result<()> {
        if !(1..=MAX_STEPS).contains(&steps) {
            return Err(GridBacktestError::config_error(format!(
                "grid steps must be in 1..={}, got {}",
                MAX_STEPS, steps
            )));
        }
        if !(self.lower > 0.0 && self.lower < self.upper && self.upper.is_finite()) {
            return Err(GridBacktestError::config_error(format!(
                "lower bound {} must be positive and below upper bound {}",
                self.lower, self.upper
            )));
        }
        if !(self.lower..=self.upper).contains(&self.central) {
            return Err(GridBacktestError::config_error(format!(
                "central price {} outside [{}, {}]",
                self.central, self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// Candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Granularity {
    /// Get supported interval names
    pub fn supported() -> &'static [&'static str] {
        &["1m", "5m", "15m", "1h", "4h", "1d"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::FifteenMinutes => "15m",
            Granularity::OneHour => "1h",
            Granularity::FourHours => "4h",
            Granularity::OneDay => "1d",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 5 * 60,
            Granularity::FifteenMinutes => 15 * 60,
            Granularity::OneHour => 3600,
            Granularity::FourHours => 4 * 3600,
            Granularity::OneDay => 24 * 3600,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = GridBacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1m" => Ok(Granularity::OneMinute),
            "5m" => Ok(Granularity::FiveMinutes),
            "15m" => Ok(Granularity::FifteenMinutes),
            "1h" => Ok(Granularity::OneHour),
            "4h" => Ok(Granularity::FourHours),
            "1d" => Ok(Granularity::OneDay),
            other => Err(GridBacktestError::UnsupportedGranularity(other.to_string())),
        }
    }
}

/// Historical window replayed by a run: `duration_hours` ending at `end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestWindow {
    pub end_time: DateTime<FixedOffset>,
    pub duration_hours: f64,
    pub granularity: Granularity,
}

impl BacktestWindow {
    pub fn new(end_time: DateTime<FixedOffset>, duration_hours: f64, granularity: Granularity) -> Self {
        Self {
            end_time,
            duration_hours,
            granularity,
        }
    }

    /// Number of candles covering the window, rounded down.
    pub fn candle_count(&self) -> Result<usize> {
        let duration_secs = (self.duration_hours * 3600.0) as i64;
        let count = duration_secs / self.granularity.seconds();
        if !self.duration_hours.is_finite() || count < 1 {
            return Err(GridBacktestError::InvalidWindow {
                end: self.end_time.to_rfc3339(),
                duration_secs,
            });
        }
        Ok(count as usize)
    }

    /// Open time of the first candle in the window.
    pub fn start_time(&self) -> Result<DateTime<FixedOffset>> {
        let count = self.candle_count()? as i64;
        Ok(self.end_time - Duration::seconds(count * self.granularity.seconds()))
    }
}

/// Everything needed for one run: instrument, window and grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    pub symbol: String,
    pub window: BacktestWindow,
    pub grid: GridConfig,
}

impl BacktestSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(GridBacktestError::config_error("symbol cannot be empty"));
        }
        self.window.candle_count()?;
        self.grid.validate()
    }
}
