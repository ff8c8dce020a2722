use chrono::Local;

pub fn current_human_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

/// Filesystem-safe timestamp used in rendered file names.
pub fn render_timestamp_slug() -> String {
    Local::now().format("%Y_%m_%d_%H_%M_%S").to_string()
}
