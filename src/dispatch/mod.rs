use std::path::Path;

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::view::View;

pub mod console;
pub mod discord;

pub use console::ConsoleSink;
pub use discord::DiscordSink;

/// Plain notice sent to operators when a run fails.
pub const ALERT_MESSAGE: &str = "An error occurred.";

/// Delivery target for rendered views, alerts and images.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, destination: &str, view: &View) -> Result<(), DispatchError>;

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), DispatchError>;

    async fn send_image(&self, destination: &str, path: &Path) -> Result<(), DispatchError>;
}
