//! Batch fetching under a "N requests per window" quota.
//!
//! A symbol list that fits in one window is fetched as a single batch and any
//! failure fails the call. Longer lists are split into windows issued on a fixed
//! tick; a window with a failing symbol is dropped as a whole and recorded in the
//! report, and the call itself always succeeds. Ticks are measured from the
//! previous issue time, not from the previous window's completion, so a window
//! slower than the quota period overlaps the next one. Tune the period to the
//! provider's latency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::error::{AppError, FetchError, FetchErrorKind, Result};

use super::{DataSource, FetchQuota, FetchResult, Quote};

/// Paces window issuance.
#[async_trait]
pub trait Ticker: Send {
    /// Resolves when the next window may be issued. The first call resolves immediately.
    async fn tick(&mut self);
}

/// Wall-clock ticker backed by `tokio::time::interval`.
pub struct IntervalTicker {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        if self.period.is_zero() {
            tokio::task::yield_now().await;
            return;
        }

        // Created lazily so the first tick lines up with the first window.
        let period = self.period;
        let ticks = self.interval.get_or_insert_with(|| {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks
        });
        ticks.tick().await;
    }
}

#[derive(Debug, Clone)]
pub struct WindowFailure {
    pub index: usize,
    pub symbols: Vec<String>,
    pub error: FetchError,
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub quotes: Vec<Quote>,
    pub windows: usize,
    pub failed_windows: Vec<WindowFailure>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.failed_windows.is_empty()
    }

    pub fn dropped_symbols(&self) -> impl Iterator<Item = &str> {
        self.failed_windows
            .iter()
            .flat_map(|failure| failure.symbols.iter().map(String::as_str))
    }
}

pub struct RateLimitedScheduler {
    source: Arc<dyn DataSource>,
    quota: FetchQuota,
}

impl RateLimitedScheduler {
    pub fn new(source: Arc<dyn DataSource>, quota: FetchQuota) -> Result<Self> {
        if quota.count == 0 {
            return Err(AppError::config("api_limit must be greater than zero"));
        }
        Ok(Self { source, quota })
    }

    pub async fn schedule(&self, symbols: &[String]) -> FetchResult<FetchReport> {
        self.schedule_with(symbols, IntervalTicker::new(self.quota.window))
            .await
    }

    pub async fn schedule_with<T: Ticker>(
        &self,
        symbols: &[String],
        mut ticker: T,
    ) -> FetchResult<FetchReport> {
        if symbols.is_empty() {
            debug!("No symbols to fetch");
            return Ok(FetchReport::default());
        }

        if symbols.len() <= self.quota.count {
            debug!("Fetching {} symbols in a single batch", symbols.len());
            let quotes = fetch_window(Arc::clone(&self.source), symbols.to_vec()).await?;
            return Ok(FetchReport {
                quotes,
                windows: 1,
                failed_windows: Vec::new(),
            });
        }

        let windows: Vec<Vec<String>> = symbols
            .chunks(self.quota.count)
            .map(<[String]>::to_vec)
            .collect();
        info!(
            "Fetching {} symbols in {} windows of up to {} every {:?}",
            symbols.len(),
            windows.len(),
            self.quota.count,
            self.quota.window
        );

        let mut in_flight: Vec<(Vec<String>, JoinHandle<FetchResult<Vec<Quote>>>)> =
            Vec::with_capacity(windows.len());
        for (index, window) in windows.into_iter().enumerate() {
            ticker.tick().await;
            debug!("Issuing window {}: {}", index + 1, window.join(", "));
            let handle = tokio::spawn(fetch_window(Arc::clone(&self.source), window.clone()));
            in_flight.push((window, handle));
        }

        let mut report = FetchReport {
            windows: in_flight.len(),
            ..FetchReport::default()
        };

        for (index, (symbols, handle)) in in_flight.into_iter().enumerate() {
            let outcome = handle.await.unwrap_or_else(|join_error| {
                Err(FetchError::new(
                    FetchErrorKind::Transport,
                    symbols.join(","),
                    format!("window task aborted: {join_error}"),
                ))
            });

            match outcome {
                Ok(quotes) => report.quotes.extend(quotes),
                Err(error) => {
                    warn!(
                        "Error getting stock data for window {} ({}): {error}",
                        index + 1,
                        symbols.join(", ")
                    );
                    report.failed_windows.push(WindowFailure {
                        index,
                        symbols,
                        error,
                    });
                }
            }
        }

        info!(
            "Fetched {} quotes; {} of {} windows dropped",
            report.quotes.len(),
            report.failed_windows.len(),
            report.windows
        );
        Ok(report)
    }
}

/// Fetch every symbol concurrently; the first failure fails the window.
async fn fetch_window(
    source: Arc<dyn DataSource>,
    symbols: Vec<String>,
) -> FetchResult<Vec<Quote>> {
    try_join_all(symbols.iter().map(|symbol| source.fetch(symbol))).await
}
