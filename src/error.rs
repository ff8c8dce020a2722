use std::fmt;

use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        AppError::Config(msg.into())
    }
}

/// Broad classification of a failed quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NotFound,
    RateLimited,
    InvalidKey,
    MalformedResponse,
    Transport,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchErrorKind::NotFound => "not found",
            FetchErrorKind::RateLimited => "rate limited",
            FetchErrorKind::InvalidKey => "invalid API key",
            FetchErrorKind::MalformedResponse => "malformed response",
            FetchErrorKind::Transport => "transport error",
        };
        f.write_str(label)
    }
}

/// Failure reported by a data source for a single symbol.
#[derive(Debug, Clone, Error)]
#[error("failed to fetch {symbol} ({kind}): {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub symbol: String,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            message: message.into(),
        }
    }
}

/// Delivery failure for one destination.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot find channel for ID {0}")]
    UnknownDestination(String),
    #[error("not authorised to post to {0}")]
    Unauthorized(String),
    #[error("refusing to send an empty view to {0}")]
    EmptyView(String),
    #[error("{destination} rejected the message with status {status}: {message}")]
    Rejected {
        destination: String,
        status: u16,
        message: String,
    },
    #[error("error sending message to channel {destination}: {message}")]
    Transport {
        destination: String,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure while turning quotes into an image artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render template invalid: {0}")]
    Template(String),
    #[error("no quotes to render")]
    NoQuotes,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
