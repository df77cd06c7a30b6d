//! Utility functions shared by the runner and the report

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Time helpers
pub mod time {
    use super::*;

    /// Smallest duration used as a divisor for rates, in hours.
    pub const MIN_HOURS: f64 = 0.001;

    /// Hours between two timestamps, floored at [`MIN_HOURS`].
    pub fn hours_between(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> f64 {
        let secs = (end - start).num_milliseconds() as f64 / 1000.0;
        (secs / 3600.0).max(MIN_HOURS)
    }

    /// UTC as a fixed offset.
    pub fn utc() -> FixedOffset {
        Utc.fix()
    }
}

/// Return and drawdown statistics
pub mod math {
    /// Hours in a 365-day year.
    pub const HOURS_PER_YEAR: f64 = 8760.0;

    /// Largest peak-to-trough decline of `values`, as a fraction of the peak.
    ///
    /// Peaks at or below zero are ignored.
    pub fn max_drawdown(values: &[f64]) -> f64 {
        let mut peak = f64::NEG_INFINITY;
        let mut worst = 0.0_f64;
        for &value in values {
            peak = peak.max(value);
            if peak > 0.0 {
                worst = worst.max((peak - value) / peak);
            }
        }
        worst
    }

    /// Drawdown of each value from the running peak.
    pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
        let mut peak = f64::NEG_INFINITY;
        values
            .iter()
            .map(|&value| {
                peak = peak.max(value);
                if peak > 0.0 {
                    (peak - value) / peak
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Return `r` earned over `hours`, scaled linearly to a year.
    pub fn simple_annualized(r: f64, hours: f64) -> f64 {
        r * HOURS_PER_YEAR / hours
    }

    /// Return `r` earned over `hours`, compounded to a year.
    ///
    /// `None` when the result overflows, which happens for short windows.
    pub fn compound_annualized(r: f64, hours: f64) -> Option<f64> {
        let apr = (1.0 + r).powf(HOURS_PER_YEAR / hours) - 1.0;
        apr.is_finite().then_some(apr)
    }

    /// Events per 24 hours.
    pub fn per_day(count: u64, hours: f64) -> f64 {
        count as f64 * 24.0 / hours
    }
}

/// CSV utilities for data export
pub mod csv_utils {
    use crate::errors::Result;
    use std::path::Path;

    /// Write a header and rows to a CSV file
    pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], data: &[Vec<String>]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(headers)?;
        for row in data {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
