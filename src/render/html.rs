use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use crate::error::RenderError;
use crate::fetch::Quote;
use crate::subscriptions::SymbolTable;
use crate::utils::{escape_html, render_timestamp_slug};

use super::Renderer;

pub const STOCKS_PLACEHOLDER: &str = "{stocks}";

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
body { margin: 0; padding: 12px; background: #2f3136; color: #dcddde; font-family: sans-serif; }
#stocks { column-gap: 24px; row-gap: 4px; }
h4 { margin: 0 0 6px 0; text-align: left; }
.inc { color: #43b581; }
.dec { color: #f04747; }
</style>
</head>
<body>
{stocks}
</body>
</html>
"#;

/// Writes quotes as a five-column HTML table into a template page.
pub struct HtmlTableRenderer {
    template: String,
    output_dir: PathBuf,
    rendered: AtomicUsize,
}

impl HtmlTableRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            output_dir: output_dir.into(),
            rendered: AtomicUsize::new(0),
        }
    }

    pub fn with_template(
        template: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, RenderError> {
        let template = template.into();
        if !template.contains(STOCKS_PLACEHOLDER) {
            return Err(RenderError::Template(format!(
                "template has no {STOCKS_PLACEHOLDER} placeholder"
            )));
        }

        Ok(Self {
            template,
            output_dir: output_dir.into(),
            rendered: AtomicUsize::new(0),
        })
    }

    pub fn from_template_file(
        path: &Path,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, RenderError> {
        let template = fs::read_to_string(path)?;
        Self::with_template(template, output_dir)
    }

    pub fn page(&self, quotes: &[Quote], names: &SymbolTable) -> String {
        self.template
            .replacen(STOCKS_PLACEHOLDER, &stocks_table(quotes, names), 1)
    }
}

impl Renderer for HtmlTableRenderer {
    fn render(&self, quotes: &[Quote], names: &SymbolTable) -> Result<PathBuf, RenderError> {
        if quotes.is_empty() {
            return Err(RenderError::NoQuotes);
        }

        fs::create_dir_all(&self.output_dir)?;
        let sequence = self.rendered.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.output_dir.join(format!(
            "stocks_{}_{sequence}.html",
            render_timestamp_slug()
        ));

        fs::write(&path, self.page(quotes, names))?;
        debug!("Rendered {} quotes to {}", quotes.len(), path.display());
        Ok(path)
    }
}

fn stocks_table(quotes: &[Quote], names: &SymbolTable) -> String {
    let mut html = String::from(
        "<div id=\"stocks\" style=\"display:grid;grid-template-columns:auto auto auto auto auto\">\
         <h4 id=\"symbol\">Symbol</h4><h4 id=\"name\">Name</h4><h4 id=\"price\">Price</h4>\
         <h4 id=\"change\">Change</h4><h4 id=\"change-perc\">Change %</h4>",
    );

    for quote in quotes {
        let class = if quote.change >= 0.0 { "inc" } else { "dec" };
        let name = names.get(&quote.symbol).unwrap_or(quote.symbol.as_str());
        let sign = if quote.change < 0.0 { "-" } else { "" };

        html.push_str(&format!(
            "<div class=\"{class} symbol-value\">{}</div>\
             <div class=\"{class} name-value\">{}</div>\
             <div class=\"{class} price-value\">${}</div>\
             <div class=\"{class} change-value\">{sign}${}</div>\
             <div class=\"{class} change-perc-value\">{}</div>",
            escape_html(&quote.symbol),
            escape_html(name),
            quote.price,
            quote.change.abs(),
            escape_html(&quote.change_percent),
        ));
    }

    html.push_str("</div>");
    html
}
