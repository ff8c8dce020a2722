use std::sync::Arc;

use log::{error, info, warn};

use crate::config::Settings;
use crate::dispatch::{NotificationSink, ALERT_MESSAGE};
use crate::error::Result;
use crate::fetch::{DataSource, FetchReport, Quote, RateLimitedScheduler};
use crate::render::Renderer;
use crate::subscriptions::{resolve, Destination, SymbolTable};
use crate::utils::current_human_timestamp;
use crate::view::{build_view, select, View};

/// Per-run delivery counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Delivery {
    Sent,
    Skipped,
}

/// Wires subscriptions, fetching, views and delivery together for one run.
pub struct AppController {
    settings: Settings,
    scheduler: RateLimitedScheduler,
    sink: Arc<dyn NotificationSink>,
    renderer: Arc<dyn Renderer>,
}

impl AppController {
    pub fn new(
        settings: Settings,
        source: Arc<dyn DataSource>,
        sink: Arc<dyn NotificationSink>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self> {
        let scheduler = RateLimitedScheduler::new(source, settings.quota)?;
        Ok(Self {
            settings,
            scheduler,
            sink,
            renderer,
        })
    }

    pub async fn run(&self) -> Result<DispatchSummary> {
        let plan = resolve(
            &self.settings.defaults,
            &self.settings.destinations,
            self.settings.use_image,
        )?;
        info!(
            "Run started at {}: {} symbols for {} channels{}",
            current_human_timestamp(),
            plan.fetch_set.len(),
            plan.destinations.len(),
            if self.settings.test_mode { " (test mode)" } else { "" }
        );

        let report = match self.scheduler.schedule(&plan.fetch_set).await {
            Ok(report) => report,
            Err(err) => {
                error!("Error getting stock data: {err}");
                self.alert(&plan.destinations).await;
                return Err(err.into());
            }
        };
        log_dropped(&report);

        let mut summary = DispatchSummary::default();
        for destination in &plan.destinations {
            match self.deliver(destination, &report.quotes).await {
                Ok(Delivery::Sent) => summary.delivered += 1,
                Ok(Delivery::Skipped) => summary.skipped += 1,
                Err(err) => {
                    error!("Error sending message to channel {}: {err}", destination.id);
                    summary.failed += 1;
                }
            }
        }

        if summary.failed > 0 {
            self.alert(&plan.destinations).await;
        }

        info!(
            "Run finished: {} delivered, {} skipped, {} failed",
            summary.delivered, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Fetch the default table only and build the message it would produce.
    pub async fn preview(&self) -> Result<View> {
        let symbols: Vec<String> = self
            .settings
            .defaults
            .symbols()
            .map(str::to_string)
            .collect();

        let report = self.scheduler.schedule(&symbols).await?;
        log_dropped(&report);

        Ok(build_view(
            &report.quotes,
            &self.settings.defaults,
            &self.settings.message,
            None,
        ))
    }

    async fn deliver(&self, destination: &Destination, quotes: &[Quote]) -> Result<Delivery> {
        if destination.render_as_image {
            return self.deliver_image(destination, quotes).await;
        }

        let view = build_view(
            quotes,
            &self.settings.defaults,
            &self.settings.message,
            Some(destination),
        );
        if view.is_empty() {
            info!("Nothing to send to channel {}", destination.id);
            return Ok(Delivery::Skipped);
        }

        self.sink.send(&destination.id, &view).await?;
        Ok(Delivery::Sent)
    }

    async fn deliver_image(
        &self,
        destination: &Destination,
        quotes: &[Quote],
    ) -> Result<Delivery> {
        let selected = select(quotes, &self.settings.defaults, Some(destination));
        if selected.is_empty() {
            info!("Nothing to render for channel {}", destination.id);
            return Ok(Delivery::Skipped);
        }

        let names: SymbolTable = selected
            .iter()
            .map(|(quote, label)| (quote.symbol.as_str(), *label))
            .collect();
        let quotes: Vec<Quote> = selected.into_iter().map(|(quote, _)| quote.clone()).collect();

        // Rendering writes files synchronously.
        let renderer = Arc::clone(&self.renderer);
        let path = tokio::task::spawn_blocking(move || renderer.render(&quotes, &names)).await??;
        self.sink.send_image(&destination.id, &path).await?;
        Ok(Delivery::Sent)
    }

    async fn alert(&self, destinations: &[Destination]) {
        if !self.settings.alert_if_error {
            return;
        }

        let targets: Vec<&str> = match &self.settings.alert_destination {
            Some(id) => vec![id.as_str()],
            None => {
                let mut ids: Vec<&str> = Vec::new();
                for destination in destinations {
                    if !ids.contains(&destination.id.as_str()) {
                        ids.push(&destination.id);
                    }
                }
                ids
            }
        };

        for target in targets {
            if let Err(err) = self.sink.send_text(target, ALERT_MESSAGE).await {
                error!("Error sending alert to channel {target}: {err}");
            }
        }
    }
}

fn log_dropped(report: &FetchReport) {
    if report.is_complete() {
        return;
    }
    warn!(
        "{} of {} fetch windows failed; no data for {}",
        report.failed_windows.len(),
        report.windows,
        report.dropped_symbols().collect::<Vec<_>>().join(", ")
    );
}
