use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchQuota;
use crate::subscriptions::{DestinationSpec, SymbolTable};
use crate::view::MessageStyle;

pub mod loader;
pub mod validator;

pub use loader::{load_settings, parse_settings};
pub use validator::validate_settings;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_IMAGE_OUTPUT_DIR: &str = "renders";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSettings {
    pub template: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub alpha_vantage_api_key: String,
    pub discord_api_key: String,
    pub defaults: SymbolTable,
    /// `discord_channels`, or `test_channels` when running in test mode.
    pub destinations: Vec<DestinationSpec>,
    pub test_mode: bool,
    pub quota: FetchQuota,
    pub request_timeout: Duration,
    pub alert_if_error: bool,
    pub alert_destination: Option<String>,
    pub use_image: bool,
    pub message: MessageStyle,
    pub image: ImageSettings,
}
