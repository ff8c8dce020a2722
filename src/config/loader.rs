use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::{Context, Result};
use crate::fetch::{FetchQuota, DEFAULT_REQUESTS_PER_WINDOW, DEFAULT_WINDOW};
use crate::subscriptions::{DestinationSpec, SymbolTable};
use crate::view::MessageStyle;

use super::{
    validator, ImageSettings, Settings, DEFAULT_IMAGE_OUTPUT_DIR, DEFAULT_REQUEST_TIMEOUT,
};

/// Read, normalise and validate the JSON config at `path`.
///
/// Relative paths inside the file resolve against the file's directory.
pub fn load_settings(path: &Path, test_mode: bool) -> Result<Settings> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    parse_settings(&json, &base_dir, test_mode)
}

pub fn parse_settings(json: &str, base_dir: &Path, test_mode: bool) -> Result<Settings> {
    let raw: RawSettings =
        serde_json::from_str(json).context("failed to parse config JSON")?;

    let settings = raw.into_settings(base_dir, test_mode);
    validator::validate_settings(&settings)?;

    Ok(settings)
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    alpha_vantage_api_key: String,
    #[serde(default)]
    discord_api_key: String,
    #[serde(default)]
    stocks: SymbolTable,
    #[serde(default)]
    discord_channels: Option<RawChannels>,
    #[serde(default)]
    test_channels: Option<RawChannels>,
    #[serde(default)]
    api_limit: Option<i64>,
    #[serde(default)]
    api_window_ms: Option<u64>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    alert_if_error: bool,
    #[serde(default)]
    alert_channel: Option<String>,
    #[serde(default)]
    use_image: bool,
    #[serde(default)]
    image_template: Option<String>,
    #[serde(default)]
    image_output_dir: Option<String>,
    #[serde(default)]
    message_config: MessageStyle,
}

/// `discord_channels` may hold one entry or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChannels {
    Many(Vec<DestinationSpec>),
    One(DestinationSpec),
}

impl RawChannels {
    fn into_specs(self) -> Vec<DestinationSpec> {
        match self {
            RawChannels::Many(specs) => specs,
            RawChannels::One(spec) => vec![spec],
        }
    }
}

impl RawSettings {
    fn into_settings(self, base_dir: &Path, test_mode: bool) -> Settings {
        let channels = if test_mode {
            self.test_channels
        } else {
            self.discord_channels
        };

        let count = self
            .api_limit
            .map(|limit| usize::try_from(limit).unwrap_or(0))
            .unwrap_or(DEFAULT_REQUESTS_PER_WINDOW);
        let window = self
            .api_window_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WINDOW);

        let output_dir = self
            .image_output_dir
            .unwrap_or_else(|| DEFAULT_IMAGE_OUTPUT_DIR.to_string());

        Settings {
            alpha_vantage_api_key: self.alpha_vantage_api_key.trim().to_string(),
            discord_api_key: self.discord_api_key.trim().to_string(),
            defaults: self.stocks,
            destinations: channels.map(RawChannels::into_specs).unwrap_or_default(),
            test_mode,
            quota: FetchQuota { count, window },
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            alert_if_error: self.alert_if_error,
            alert_destination: self.alert_channel.map(|id| id.trim().to_string()),
            use_image: self.use_image,
            message: self.message_config,
            image: ImageSettings {
                template: self
                    .image_template
                    .map(|template| normalize_path(base_dir, template)),
                output_dir: normalize_path(base_dir, output_dir),
            },
        }
    }
}

fn normalize_path(root: &Path, value: String) -> PathBuf {
    let path = PathBuf::from(&value);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
