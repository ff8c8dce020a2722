use crate::error::{AppError, Result};
use crate::subscriptions::{DestinationIds, DestinationSpec};

use super::Settings;

/// Validate loaded settings, reporting every problem at once.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut issues = Vec::new();

    validate_required(settings, &mut issues);
    validate_quota(settings, &mut issues);
    validate_destinations(settings, &mut issues);
    validate_alerts(settings, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_required(settings: &Settings, issues: &mut Vec<String>) {
    let mut missing = Vec::new();
    if settings.alpha_vantage_api_key.is_empty() {
        missing.push("alpha_vantage_api_key");
    }
    if settings.discord_api_key.is_empty() {
        missing.push("discord_api_key");
    }
    if settings.destinations.is_empty() && !settings.test_mode {
        missing.push("discord_channels");
    }

    if !missing.is_empty() {
        issues.push(format!("missing keys/values: {}", missing.join(", ")));
    }

    if settings.destinations.is_empty() && settings.test_mode {
        issues.push("test mode requires a non-empty test_channels setting".to_string());
    }
}

fn validate_quota(settings: &Settings, issues: &mut Vec<String>) {
    if settings.quota.count == 0 {
        issues.push("api_limit must be greater than zero".to_string());
    }
    if settings.quota.window.is_zero() {
        issues.push("api_window_ms must be greater than zero".to_string());
    }
    if settings.request_timeout.is_zero() {
        issues.push("request_timeout_secs must be greater than zero".to_string());
    }
}

fn validate_destinations(settings: &Settings, issues: &mut Vec<String>) {
    for (index, spec) in settings.destinations.iter().enumerate() {
        match spec {
            DestinationSpec::Bare(id) if id.trim().is_empty() => {
                issues.push(format!("channel of index {index} has an empty id"));
            }
            DestinationSpec::Bare(_) => {}
            DestinationSpec::Record(record) => match &record.id {
                None => issues.push(format!("channel of index {index} does not list an id")),
                Some(ids) if ids.normalized().is_none() => {
                    let detail = match ids {
                        DestinationIds::Many(list) if list.is_empty() => "an empty id list",
                        _ => "an empty id",
                    };
                    issues.push(format!("channel of index {index} has {detail}"));
                }
                Some(_) => {}
            },
        }
    }

    if !settings.defaults.is_empty() || settings.destinations.is_empty() {
        return;
    }

    let any_overrides = settings
        .destinations
        .iter()
        .any(|spec| spec.overrides().is_some_and(|table| !table.is_empty()));
    if !any_overrides {
        issues.push("stocks list is empty".to_string());
        return;
    }

    for spec in &settings.destinations {
        let has_overrides = spec.overrides().is_some_and(|table| !table.is_empty());
        if spec.uses_defaults() && !has_overrides {
            issues.push(format!(
                "channel `{}` relies on the default stocks list, which is empty",
                spec.describe()
            ));
        }
    }
}

fn validate_alerts(settings: &Settings, issues: &mut Vec<String>) {
    if let Some(id) = &settings.alert_destination {
        if id.is_empty() {
            issues.push("alert_channel must not be empty".to_string());
        }
    }
}
