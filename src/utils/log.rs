// src/utils/log.rs

//! Console-style progress helpers layered on the `log` facade.
//!
//! Headers, step markers and summaries go through `log::info!` so the
//! binary's logger decides formatting and filtering. The level macros are
//! re-exported, letting callers `use crate::utils::log;` and still write
//! `log::warn!`.

pub use ::log::{debug, error, info, trace, warn};

/// Width of header borders and separators.
const RULE_WIDTH: usize = 60;

/// Log a success message (always INFO).
pub fn success(message: &str) {
    ::log::info!("[OK] {}", message);
}

/// Log a step in a multi-step process.
pub fn step(step_num: usize, total: usize, message: &str) {
    ::log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a separator line.
pub fn separator() {
    ::log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a header framed by borders.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    ::log::info!("{}", border);
    ::log::info!("  {}", title);
    ::log::info!("{}", border);
}

/// Log an indented sub-item.
pub fn sub_item(message: &str) {
    ::log::info!("    {}", message);
}

/// Render a summary block as lines, title first.
pub fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(format!("[SUMMARY] {}", title));
    for (key, value) in items {
        lines.push(format!("    {}: {}", key, value));
    }
    lines
}

/// Log a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        ::log::info!("{}", line);
    }
}
