pub mod text;
pub mod time;

pub use text::escape_html;
pub use time::{current_human_timestamp, render_timestamp_slug};
