use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};

use crate::error::{self, Context, DispatchError};
use crate::view::{MessageStyle, View, ViewField};

use super::NotificationSink;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
/// Discord rejects embeds with more fields than this.
const MAX_FIELDS_PER_EMBED: usize = 25;
const MAX_EMBEDS_PER_MESSAGE: usize = 10;

/// Posts to Discord text channels through the REST API with a bot token.
pub struct DiscordSink {
    client: Client,
    token: String,
    base_url: String,
}

impl DiscordSink {
    pub fn new(token: impl Into<String>, timeout: Duration) -> error::Result<Self> {
        Self::with_base_url(token, timeout, DISCORD_API_BASE)
    }

    pub fn with_base_url(
        token: impl Into<String>,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> error::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to construct HTTP client for Discord")?;

        Ok(Self::with_client(client, token, base_url))
    }

    pub fn with_client(
        client: Client,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self, channel: &str) -> String {
        format!("{}/channels/{}/messages", self.base_url, channel)
    }

    async fn post(&self, destination: &str, request: RequestBuilder) -> Result<(), DispatchError> {
        debug!("Dispatching message to channel {destination}");
        let response = request
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                destination: destination.to_string(),
                message: e.to_string(),
            })?;

        check_status(destination, response).await
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn send(&self, destination: &str, view: &View) -> Result<(), DispatchError> {
        if view.is_empty() {
            return Err(DispatchError::EmptyView(destination.to_string()));
        }

        let payloads = message_payloads(view);
        if payloads.len() > 1 {
            debug!(
                "View for channel {destination} has {} fields, sending {} messages",
                view.fields.len(),
                payloads.len()
            );
        }

        for payload in payloads {
            let request = self
                .client
                .post(self.messages_url(destination))
                .json(&payload);
            self.post(destination, request).await?;
        }
        Ok(())
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), DispatchError> {
        let request = self
            .client
            .post(self.messages_url(destination))
            .json(&json!({ "content": text }));
        self.post(destination, request).await
    }

    async fn send_image(&self, destination: &str, path: &Path) -> Result<(), DispatchError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("stocks.html")
            .to_string();

        let payload = json!({ "attachments": [{ "id": 0, "filename": file_name }] });
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", Part::bytes(bytes).file_name(file_name));

        let request = self
            .client
            .post(self.messages_url(destination))
            .multipart(form);
        self.post(destination, request).await
    }
}

async fn check_status(destination: &str, response: Response) -> Result<(), DispatchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    match status {
        StatusCode::NOT_FOUND => Err(DispatchError::UnknownDestination(destination.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(DispatchError::Unauthorized(destination.to_string()))
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(DispatchError::Rejected {
                destination: destination.to_string(),
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Build the message bodies for a view. Fields beyond one embed's capacity spill
/// into further embeds, and embeds beyond one message's capacity into further
/// messages. The title and thumbnail go on the very first embed, image and footer
/// on the very last.
pub fn message_payloads(view: &View) -> Vec<Value> {
    let style = &view.style;
    let color = style.color.as_deref().and_then(|raw| {
        let parsed = parse_color(raw);
        if parsed.is_none() {
            warn!("Ignoring unrecognised embed color `{raw}`");
        }
        parsed
    });

    let chunks: Vec<&[ViewField]> = view.fields.chunks(MAX_FIELDS_PER_EMBED).collect();
    let last = chunks.len().saturating_sub(1);

    let embeds: Vec<Value> = chunks
        .iter()
        .enumerate()
        .map(|(index, fields)| embed(style, color, fields, index == 0, index == last))
        .collect();

    embeds
        .chunks(MAX_EMBEDS_PER_MESSAGE)
        .map(|embeds| json!({ "embeds": embeds }))
        .collect()
}

fn embed(
    style: &MessageStyle,
    color: Option<u32>,
    fields: &[ViewField],
    first: bool,
    last: bool,
) -> Value {
    let mut embed = Map::new();

    if let Some(color) = color {
        embed.insert("color".to_string(), json!(color));
    }
    if first {
        if let Some(title) = &style.title {
            embed.insert("title".to_string(), json!(title));
        }
        if let Some(thumbnail) = &style.thumbnail {
            embed.insert("thumbnail".to_string(), json!({ "url": thumbnail }));
        }
    }
    if last {
        if let Some(image) = &style.image {
            embed.insert("image".to_string(), json!({ "url": image }));
        }
        if let Some(footer) = &style.footer {
            embed.insert("footer".to_string(), json!({ "text": footer }));
        }
    }

    let fields: Vec<Value> = fields
        .iter()
        .map(|field| {
            json!({
                "name": field.label,
                "value": field.value,
                "inline": style.inline,
            })
        })
        .collect();
    embed.insert("fields".to_string(), Value::Array(fields));

    Value::Object(embed)
}

/// Accepts `#RRGGBB`, `0xRRGGBB` or a decimal RGB integer.
pub fn parse_color(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let parsed = if let Some(hex) = trimmed.strip_prefix('#') {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        trimmed.parse::<u32>().ok()
    };

    parsed.filter(|color| *color <= 0xFF_FF_FF)
}
