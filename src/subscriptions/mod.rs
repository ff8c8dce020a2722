//! Destination subscriptions: which channel wants which instruments, and under what names.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{AppError, Result};

pub mod symbol_table;

pub use symbol_table::{normalize_symbol, SymbolTable};

/// Destination entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DestinationSpec {
    /// A bare channel id that receives the default table only.
    Bare(String),
    Record(DestinationRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DestinationRecord {
    #[serde(default)]
    pub id: Option<DestinationIds>,
    #[serde(default, alias = "stocks")]
    pub overrides: SymbolTable,
    #[serde(default, alias = "ignore_default")]
    pub ignore_defaults: bool,
    #[serde(default, alias = "use_image")]
    pub render_as_image: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DestinationIds {
    Single(String),
    Many(Vec<String>),
}

impl DestinationIds {
    /// Trimmed identifiers, or `None` when any of them (or the list itself) is empty.
    pub fn normalized(&self) -> Option<Vec<String>> {
        let ids: Vec<String> = match self {
            DestinationIds::Single(id) => vec![id.trim().to_string()],
            DestinationIds::Many(ids) => ids.iter().map(|id| id.trim().to_string()).collect(),
        };

        if ids.is_empty() || ids.iter().any(String::is_empty) {
            None
        } else {
            Some(ids)
        }
    }
}

impl DestinationSpec {
    /// True when the destination would receive at least the default table.
    pub fn uses_defaults(&self) -> bool {
        match self {
            DestinationSpec::Bare(_) => true,
            DestinationSpec::Record(record) => !record.ignore_defaults,
        }
    }

    pub fn overrides(&self) -> Option<&SymbolTable> {
        match self {
            DestinationSpec::Bare(_) => None,
            DestinationSpec::Record(record) => Some(&record.overrides),
        }
    }

    /// Human-readable label for log and validation messages.
    pub fn describe(&self) -> String {
        match self {
            DestinationSpec::Bare(id) => id.clone(),
            DestinationSpec::Record(record) => match &record.id {
                Some(DestinationIds::Single(id)) => id.clone(),
                Some(DestinationIds::Many(ids)) => ids.join(", "),
                None => "<missing id>".to_string(),
            },
        }
    }
}

/// A single delivery target after expansion and normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub id: String,
    pub overrides: SymbolTable,
    pub ignore_defaults: bool,
    pub render_as_image: bool,
}

impl Destination {
    pub fn new(id: impl Into<String>, render_as_image: bool) -> Self {
        Self {
            id: id.into(),
            overrides: SymbolTable::new(),
            ignore_defaults: false,
            render_as_image,
        }
    }

    pub fn wants(&self, symbol: &str, defaults: &SymbolTable) -> bool {
        self.overrides.contains(symbol) || (!self.ignore_defaults && defaults.contains(symbol))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPlan {
    pub fetch_set: Vec<String>,
    pub destinations: Vec<Destination>,
}

/// Expand destination specs into concrete destinations and the minimal symbol set to fetch.
///
/// Defaults come first in their table order; override symbols are appended in the
/// order they are first seen across destinations.
pub fn resolve(
    defaults: &SymbolTable,
    specs: &[DestinationSpec],
    default_render_as_image: bool,
) -> Result<SubscriptionPlan> {
    let mut fetch_set: Vec<String> = defaults.symbols().map(str::to_string).collect();
    let mut seen: HashSet<String> = fetch_set.iter().cloned().collect();
    let mut destinations = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        match spec {
            DestinationSpec::Bare(id) => {
                let id = id.trim();
                if id.is_empty() {
                    return Err(AppError::config(format!(
                        "channel of index {index} has an empty id"
                    )));
                }
                destinations.push(Destination::new(id, default_render_as_image));
            }
            DestinationSpec::Record(record) => {
                let ids = record
                    .id
                    .as_ref()
                    .and_then(DestinationIds::normalized)
                    .ok_or_else(|| {
                        AppError::config(format!("channel of index {index} does not list an id"))
                    })?;

                for symbol in record.overrides.symbols() {
                    if seen.insert(symbol.to_string()) {
                        fetch_set.push(symbol.to_string());
                    }
                }

                let render_as_image = record.render_as_image.unwrap_or(default_render_as_image);
                for id in ids {
                    destinations.push(Destination {
                        id,
                        overrides: record.overrides.clone(),
                        ignore_defaults: record.ignore_defaults,
                        render_as_image,
                    });
                }
            }
        }
    }

    Ok(SubscriptionPlan {
        fetch_set,
        destinations,
    })
}
