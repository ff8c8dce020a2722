use std::sync::Arc;

use log::{info, warn};

use crate::app::controller::AppController;
use crate::cli::{Cli, Command};
use crate::config::{load_settings, Settings};
use crate::dispatch::{console::format_view, ConsoleSink, DiscordSink, NotificationSink};
use crate::error::Result;
use crate::fetch::{AlphaVantageSource, DataSource};
use crate::render::{HtmlTableRenderer, Renderer};

/// Entry point used by `main` once arguments are parsed and logging is up.
pub async fn run(cli: &Cli) -> Result<()> {
    match cli.command() {
        Command::Run { test, dry_run } => {
            let settings = load_settings(&cli.config, test)?;
            let controller = build_controller(settings, dry_run)?;
            let summary = controller.run().await?;
            if summary.failed > 0 {
                warn!("{} channel(s) could not be notified", summary.failed);
            }
            Ok(())
        }
        Command::Preview => {
            let settings = load_settings(&cli.config, false)?;
            let controller = build_controller(settings, true)?;
            let view = controller.preview().await?;
            println!("{}", format_view(&view));
            Ok(())
        }
    }
}

fn build_controller(settings: Settings, dry_run: bool) -> Result<AppController> {
    let source: Arc<dyn DataSource> = Arc::new(AlphaVantageSource::new(
        settings.alpha_vantage_api_key.clone(),
        settings.request_timeout,
    )?);

    let sink: Arc<dyn NotificationSink> = if dry_run {
        info!("Dry run: printing messages instead of sending them");
        Arc::new(ConsoleSink::new())
    } else {
        Arc::new(DiscordSink::new(
            settings.discord_api_key.clone(),
            settings.request_timeout,
        )?)
    };

    let output_dir = settings.image.output_dir.clone();
    let renderer: Arc<dyn Renderer> = match &settings.image.template {
        Some(template) => Arc::new(HtmlTableRenderer::from_template_file(template, output_dir)?),
        None => Arc::new(HtmlTableRenderer::new(output_dir)),
    };

    AppController::new(settings, source, sink, renderer)
}
