use std::path::PathBuf;

use crate::error::RenderError;
use crate::fetch::Quote;
use crate::subscriptions::SymbolTable;

pub mod html;

pub use html::HtmlTableRenderer;

/// Turns quotes into a file that can be attached to a message.
pub trait Renderer: Send + Sync {
    fn render(&self, quotes: &[Quote], names: &SymbolTable) -> Result<PathBuf, RenderError>;
}
