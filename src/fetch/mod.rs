use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, FetchError, Result};

pub mod alpha_vantage;
pub mod scheduler;

pub use alpha_vantage::AlphaVantageSource;
pub use scheduler::{FetchReport, IntervalTicker, RateLimitedScheduler, Ticker, WindowFailure};

/// Requests allowed per window on the Alpha Vantage free tier.
pub const DEFAULT_REQUESTS_PER_WINDOW: usize = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Clone, PartialEq)]
/// One quote as returned by the data source.
pub struct Quote {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub price: f64,
    pub volume: u64,
    pub latest_trading_day: String,
    pub previous_close: String,
    pub change: f64,
    pub change_percent: String,
}

/// Anything able to produce a quote for a single symbol.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> FetchResult<Quote>;
}

/// "count requests per window" limit imposed by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchQuota {
    pub count: usize,
    pub window: Duration,
}

impl FetchQuota {
    pub fn new(count: usize, window: Duration) -> Result<Self> {
        if count == 0 {
            return Err(AppError::config("fetch quota must allow at least one request"));
        }
        Ok(Self { count, window })
    }
}

impl Default for FetchQuota {
    fn default() -> Self {
        Self {
            count: DEFAULT_REQUESTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}
