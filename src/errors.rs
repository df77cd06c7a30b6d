//! Error types for grid backtesting operations

use thiserror::Error;

/// Result type alias for consistent error handling throughout the crate
pub type Result<T> = std::result::Result<T, GridBacktestError>;

/// Main error type for grid backtesting operations
#[derive(Debug, Error)]
pub enum GridBacktestError {
    /// Invalid grid bounds, step count, capital or central price
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Empty, malformed or non-chronological candle data
    #[error("Data error: {0}")]
    Data(String),

    /// Backtest window that cannot produce a single candle
    #[error("Invalid backtest window: end {end}, duration {duration_secs}s")]
    InvalidWindow { end: String, duration_secs: i64 },

    /// Unsupported candle granularity
    #[error("Unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    /// Failure raised by the candle source, passed through unchanged
    #[error("Candle source error: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV processing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Date/time parsing errors
    #[error("DateTime parsing error: {0}")]
    DateTimeParsing(#[from] chrono::ParseError),
}

impl From<std::num::ParseFloatError> for GridBacktestError {
    fn from(err: std::num::ParseFloatError) -> Self {
        GridBacktestError::Data(format!("invalid number: {}", err))
    }
}

impl From<std::num::ParseIntError> for GridBacktestError {
    fn from(err: std::num::ParseIntError) -> Self {
        GridBacktestError::Data(format!("invalid integer: {}", err))
    }
}

impl GridBacktestError {
    /// Create a new configuration error with context
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new data error with context
    pub fn data_error(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    /// Wrap a failure reported by an external candle source
    pub fn upstream<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream(Box::new(err))
    }

    /// Check if this error is due to user input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::InvalidWindow { .. } | Self::UnsupportedGranularity(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config",
            Self::Data(_) => "data",
            Self::InvalidWindow { .. } => "validation",
            Self::UnsupportedGranularity(_) => "validation",
            Self::Upstream(_) => "upstream",
            Self::Json(_) => "parsing",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
            Self::DateTimeParsing(_) => "parsing",
        }
    }
}
