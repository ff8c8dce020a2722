use clap::Parser;
use log::error;

use stock_notifier::app::bootstrap;
use stock_notifier::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    if let Err(err) = bootstrap::run(&cli).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}
