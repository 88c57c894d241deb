use crate::model::LabelSet;
use chrono::{DateTime, Local, TimeZone, Utc};
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

/// Label column width for target, metric and rule blocks.
pub const LABEL_WIDTH: usize = 20;

/// `Label:               value` on its own line.
pub fn kv_line(label: &str, value: impl std::fmt::Display) -> String {
    kv_line_width(label, value, LABEL_WIDTH)
}

pub fn kv_line_width(label: &str, value: impl std::fmt::Display, width: usize) -> String {
    format!("{:<width$} {}\n", label, value, width = width)
}

/// Full local timestamp, used for scrape, evaluation and alert times.
pub fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S%.f %z")
        .to_string()
}

/// Short local timestamp for query samples (`Jan 2 15:04:05 -0700`).
pub fn sample_time(unix_secs: f64) -> String {
    let millis = (unix_secs * 1000.0).round() as i64;
    match Local.timestamp_millis_opt(millis).single() {
        Some(ts) => ts.format("%b %-d %H:%M:%S %z").to_string(),
        None => unix_secs.to_string(),
    }
}

/// Elapsed time as `MM:SS`; minutes wrap at the hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", (secs / 60) % 60, secs % 60)
}

/// Double-quoted label value. Only backslash, double quote and newline are
/// escaped; everything else, control characters included, passes through.
pub fn quote_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `{a="b", c="d"}`, keys in sorted order, values quoted and escaped.
pub fn format_label_set(labels: &LabelSet) -> String {
    let pairs: Vec<String> = labels
        .iter()
        .map(|(name, value)| format!("{}={}", name, quote_label_value(value)))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Write rendered command output to stdout. A closed pipe surfaces as an
/// `io::Error` instead of a panic.
pub fn write_stdout(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

// ── stderr styling (TTY-aware) ──

pub fn styled_error(text: &str) -> String {
    if !std::io::stderr().is_terminal() {
        return text.to_string();
    }
    text.red().bold().to_string()
}

pub fn styled_warning(text: &str) -> String {
    if !std::io::stderr().is_terminal() {
        return text.to_string();
    }
    text.yellow().bold().to_string()
}
