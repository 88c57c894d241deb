//! `query` command: instant and range PromQL queries.

use crate::client::{PromApi, QueryRange};
use crate::display_helpers::{format_elapsed, format_label_set, sample_time, styled_warning};
use crate::model::QueryValue;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use std::io::Write;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub query: String,
    /// `None` runs an instant query at the current time.
    pub range: Option<QueryRange>,
    /// Print the wall-clock time spent waiting on the server.
    pub timed: bool,
    pub skip_timestamp: bool,
}

/// Range ending at `now` and reaching `length` back.
pub fn range_ending_at(now: DateTime<Utc>, length: Duration, step: Duration) -> Result<QueryRange> {
    let length = chrono::Duration::from_std(length).context("query range is too long")?;
    let start = now
        .checked_sub_signed(length)
        .context("query range starts before the representable time range")?;
    Ok(QueryRange {
        start,
        end: now,
        step,
    })
}

/// Duration flag parser that rejects zero.
pub fn parse_step(s: &str) -> Result<Duration, String> {
    let step = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if step.is_zero() {
        return Err("step must be greater than zero".to_string());
    }
    Ok(step)
}

pub async fn run(api: &impl PromApi, args: &QueryArgs) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    write_query(api, args, &mut stdout, &mut stderr).await
}

/// Run the query and write the result to `out`. Server warnings go to `err`
/// and never suppress the result.
pub async fn write_query<W: Write, E: Write>(
    api: &impl PromApi,
    args: &QueryArgs,
    out: &mut W,
    err: &mut E,
) -> Result<()> {
    let started = Instant::now();
    let result = match &args.range {
        None => api.query(&args.query, Utc::now()).await,
        Some(range) => {
            debug!(
                "range query {} .. {} step {:?}",
                range.start, range.end, range.step
            );
            api.query_range(&args.query, range).await
        }
    }
    .context("query failed")?;
    let elapsed = started.elapsed();

    if !result.warnings.is_empty() {
        writeln!(
            err,
            "{} {}",
            styled_warning("warnings:"),
            result.warnings.join(", ")
        )?;
        err.flush()?;
    }

    out.write_all(render(&result.value, args.skip_timestamp).as_bytes())?;
    if args.timed {
        writeln!(out, "{}", timing_line(elapsed))?;
    }
    out.flush()?;
    Ok(())
}

fn timing_line(elapsed: Duration) -> String {
    format!("query time: {}", format_elapsed(elapsed))
}

/// Stand-in for a native-histogram sample, which has no single value to print.
const HISTOGRAM_PLACEHOLDER: &str = "native histogram (unsupported)";

fn timestamped(timestamp: f64, text: impl std::fmt::Display, skip_timestamp: bool) -> String {
    if skip_timestamp {
        text.to_string()
    } else {
        format!("[{}] {}", sample_time(timestamp), text)
    }
}

pub fn render(value: &QueryValue, skip_timestamp: bool) -> String {
    let mut out = String::new();
    match value {
        QueryValue::Vector(samples) => {
            for sample in samples {
                let labels = format_label_set(&sample.metric);
                let line = match (&sample.value, &sample.histogram) {
                    (Some(pair), _) => timestamped(
                        pair.timestamp,
                        format!("{} = {}", labels, pair.value),
                        skip_timestamp,
                    ),
                    (None, Some(hist)) => timestamped(
                        hist.0,
                        format!("{} = {}", labels, HISTOGRAM_PLACEHOLDER),
                        skip_timestamp,
                    ),
                    (None, None) => {
                        debug!("sample {} has no value", labels);
                        continue;
                    }
                };
                out.push_str(&line);
                out.push('\n');
            }
        }
        QueryValue::Matrix(streams) => {
            for stream in streams {
                out.push_str(&format!("{} = \n", format_label_set(&stream.metric)));
                for pair in &stream.values {
                    out.push_str(&format!(
                        "\t{}\n",
                        timestamped(pair.timestamp, pair.value, skip_timestamp)
                    ));
                }
                for hist in &stream.histograms {
                    out.push_str(&format!(
                        "\t{}\n",
                        timestamped(hist.0, HISTOGRAM_PLACEHOLDER, skip_timestamp)
                    ));
                }
            }
        }
        QueryValue::Scalar(pair) => out.push_str(&format!("{}\n", pair.value)),
        QueryValue::String(sample) => out.push_str(&format!("{}\n", sample.value)),
    }
    out
}
