use serde::Deserialize;

use crate::fetch::Quote;
use crate::subscriptions::{Destination, SymbolTable};

pub const UP_MARKER: &str = ":chart_with_upwards_trend:";
pub const DOWN_MARKER: &str = ":chart_with_downwards_trend:";

/// Presentation settings copied verbatim into every view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessageStyle {
    pub title: Option<String>,
    pub color: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub footer: Option<String>,
    pub inline: bool,
    #[serde(alias = "change_indicators")]
    pub trend_indicator: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewField {
    pub label: String,
    pub value: String,
}

/// Rendered label/value rows for one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub fields: Vec<ViewField>,
    pub style: MessageStyle,
}

impl View {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Quotes a destination (or, with `None`, the default audience) should see, paired
/// with their display names. Keeps the order of `quotes`.
pub fn select<'a>(
    quotes: &'a [Quote],
    defaults: &'a SymbolTable,
    destination: Option<&'a Destination>,
) -> Vec<(&'a Quote, &'a str)> {
    quotes
        .iter()
        .filter(|quote| match destination {
            Some(destination) => destination.wants(&quote.symbol, defaults),
            None => defaults.contains(&quote.symbol),
        })
        .map(|quote| (quote, label_for(&quote.symbol, defaults, destination)))
        .collect()
}

fn label_for<'a>(
    symbol: &'a str,
    defaults: &'a SymbolTable,
    destination: Option<&'a Destination>,
) -> &'a str {
    destination
        .and_then(|destination| destination.overrides.get(symbol))
        .or_else(|| defaults.get(symbol))
        .unwrap_or(symbol)
}

pub fn format_value(quote: &Quote, trend_indicator: bool) -> String {
    let mut value = format!("{} ({})", quote.price, quote.change_percent);
    if trend_indicator {
        if quote.change > 0.0 {
            value.push(' ');
            value.push_str(UP_MARKER);
        } else if quote.change < 0.0 {
            value.push(' ');
            value.push_str(DOWN_MARKER);
        }
    }
    value
}

pub fn build_view(
    quotes: &[Quote],
    defaults: &SymbolTable,
    style: &MessageStyle,
    destination: Option<&Destination>,
) -> View {
    let fields = select(quotes, defaults, destination)
        .into_iter()
        .map(|(quote, label)| ViewField {
            label: label.to_string(),
            value: format_value(quote, style.trend_indicator),
        })
        .collect();

    View {
        fields,
        style: style.clone(),
    }
}
