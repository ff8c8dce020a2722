use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Debug, Parser)]
#[command(name = "stock-notifier")]
#[command(about = "Fetches stock quotes and posts them to Discord channels")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the JSON config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch quotes and notify every configured channel
    Run {
        /// Send to `test_channels` instead of `discord_channels`
        #[arg(long)]
        test: bool,

        /// Print messages to stdout instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the default message without sending anything
    Preview,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run {
            test: false,
            dry_run: false,
        })
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
