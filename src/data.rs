//! # Historical Candle Data
//!
//! Candle types and the contract for the external candle source. The replay
//! engine never talks to an exchange itself: it asks a [`CandleSource`] for an
//! ordered candle sequence once, validates it, and then works purely in memory.
//!
//! Two sources ship with the crate:
//!
//! - [`InMemoryCandleSource`] for tests, demos and callers that already hold data
//! - [`CsvCandleSource`] for locally cached `timestamp,open,high,low,close` files
//!
//! Network clients, retries and gap filling belong to the caller's own
//! [`CandleSource`] implementation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Granularity;
use crate::errors::{GridBacktestError, Result};
use crate::utils::time;

/// One OHLC candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time.
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(timestamp: DateTime<FixedOffset>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Candle where all four prices are the same.
    pub fn flat(timestamp: DateTime<FixedOffset>, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price)
    }

    /// Close at or above open.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    fn validate(&self, index: usize) -> Result<()> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(GridBacktestError::data_error(format!(
                "non-positive or non-finite price in candle {} at {}",
                index, self.timestamp
            )));
        }
        if self.high < self.low {
            return Err(GridBacktestError::data_error(format!(
                "high price {} is less than low price {} at index {}",
                self.high, self.low, index
            )));
        }
        if self.open > self.high || self.open < self.low || self.close > self.high || self.close < self.low {
            return Err(GridBacktestError::data_error(format!(
                "open/close outside high-low range at index {}",
                index
            )));
        }
        Ok(())
    }
}

/// Validated, strictly chronological candle sequence for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate and wrap a candle sequence.
    ///
    /// Fails with a data error if the sequence is empty, contains malformed
    /// candles or is not strictly ascending by timestamp.
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Result<Self> {
        let symbol = symbol.into();
        if candles.is_empty() {
            return Err(GridBacktestError::data_error(format!(
                "no candles for {}",
                symbol
            )));
        }

        for (i, candle) in candles.iter().enumerate() {
            candle.validate(i)?;
        }

        for i in 1..candles.len() {
            if candles[i].timestamp <= candles[i - 1].timestamp {
                return Err(GridBacktestError::data_error(format!(
                    "candles not in chronological order at indices {} and {}",
                    i - 1,
                    i
                )));
            }
        }

        Ok(Self { symbol, candles })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> &Candle {
        &self.candles[0]
    }

    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }

    /// Lowest low and highest high over the series.
    pub fn price_range(&self) -> (f64, f64) {
        self.candles.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        })
    }
}

/// Contract for the external candle collaborator.
///
/// Implementations return candles ascending by timestamp that end at or before
/// `end_time`. Any failure they report is carried to the caller unchanged.
pub trait CandleSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        end_time: DateTime<FixedOffset>,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>>;
}

fn tail_window(candles: &[Candle], end_time: DateTime<FixedOffset>, count: usize) -> Vec<Candle> {
    let eligible: Vec<Candle> = candles
        .iter()
        .filter(|c| c.timestamp < end_time)
        .copied()
        .collect();
    let skip = eligible.len().saturating_sub(count);
    eligible.into_iter().skip(skip).collect()
}

/// Candle source backed by candles already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandleSource {
    symbol: String,
    candles: Vec<Candle>,
}

impl InMemoryCandleSource {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            candles,
        }
    }
}

impl CandleSource for InMemoryCandleSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        end_time: DateTime<FixedOffset>,
        _granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>> {
        if symbol != self.symbol {
            return Ok(Vec::new());
        }
        Ok(tail_window(&self.candles, end_time, count))
    }
}

/// Candle source reading a local CSV file with a
/// `timestamp,open,high,low,close` header. Timestamps are RFC 3339 strings or
/// unix milliseconds. Extra columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvCandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CsvCandleSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every candle in the file, in file order.
    pub fn read_all(&self) -> Result<Vec<Candle>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut candles = Vec::new();
        for row in reader.deserialize() {
            let row: CsvCandleRow = row?;
            candles.push(Candle::new(
                parse_timestamp(&row.timestamp)?,
                row.open,
                row.high,
                row.low,
                row.close,
            ));
        }
        debug!(path = %self.path.display(), rows = candles.len(), "loaded candle file");
        Ok(candles)
    }

    /// Write candles in the format understood by [`CsvCandleSource::read_all`].
    pub fn write_all(&self, candles: &[Candle]) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(["timestamp", "open", "high", "low", "close"])?;
        for candle in candles {
            writer.write_record(&[
                candle.timestamp.to_rfc3339(),
                candle.open.to_string(),
                candle.high.to_string(),
                candle.low.to_string(),
                candle.close.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl CandleSource for CsvCandleSource {
    fn fetch_candles(
        &self,
        _symbol: &str,
        end_time: DateTime<FixedOffset>,
        _granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let candles = self.read_all()?;
        Ok(tail_window(&candles, end_time, count))
    }
}

/// Parse an RFC 3339 timestamp or a unix-millisecond integer.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return time::utc()
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| GridBacktestError::data_error(format!("invalid timestamp {}", millis)));
    }
    Ok(DateTime::parse_from_rfc3339(raw)?)
}
