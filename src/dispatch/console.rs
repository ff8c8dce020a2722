use std::path::Path;

use async_trait::async_trait;
use unicode_width::UnicodeWidthStr;

use crate::error::DispatchError;
use crate::view::View;

use super::NotificationSink;

/// Prints everything to stdout instead of delivering it. Used for dry runs and previews.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

pub fn format_view(view: &View) -> String {
    let mut lines = Vec::with_capacity(view.fields.len() + 2);
    if let Some(title) = &view.style.title {
        lines.push(title.clone());
    }

    let width = view
        .fields
        .iter()
        .map(|field| UnicodeWidthStr::width(field.label.as_str()))
        .max()
        .unwrap_or(0);
    for field in &view.fields {
        let pad = width.saturating_sub(UnicodeWidthStr::width(field.label.as_str()));
        lines.push(format!(
            "  {}{}  {}",
            field.label,
            " ".repeat(pad),
            field.value
        ));
    }

    if let Some(footer) = &view.style.footer {
        lines.push(footer.clone());
    }
    lines.join("\n")
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn send(&self, destination: &str, view: &View) -> Result<(), DispatchError> {
        println!("# {destination}");
        println!("{}", format_view(view));
        println!();
        Ok(())
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), DispatchError> {
        println!("# {destination}");
        println!("{text}");
        println!();
        Ok(())
    }

    async fn send_image(&self, destination: &str, path: &Path) -> Result<(), DispatchError> {
        println!("# {destination}");
        println!("[image] {}", path.display());
        println!();
        Ok(())
    }
}
