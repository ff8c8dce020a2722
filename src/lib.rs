pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod render;
pub mod subscriptions;
pub mod utils;
pub mod view;

#[cfg(test)]
mod test_support;

pub use error::{AppError, Result};
