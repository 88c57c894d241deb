//! `metrics` command: metric metadata per scrape job.
//!
//! Output is one of:
//! - a single total (`--count`),
//! - `<job>,<metric-name>,<metric-help>,<metric-type>` rows (`--csv`),
//! - a four-line block per metric.

use crate::client::PromApi;
use crate::display_helpers::{kv_line, quote_label_value};
use crate::model::{label, MetricMetadata, TargetHealth, TargetsResult};
use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct MetricArgs {
    /// Only this job; otherwise every job with a target that is not down.
    pub job: Option<String>,
    pub count_only: bool,
    pub csv: bool,
    /// Add the metric unit to the block output when the server reports one.
    pub verbose: bool,
}

pub async fn run(api: &impl PromApi, args: &MetricArgs) -> Result<()> {
    let mut stdout = std::io::stdout();
    write_metrics(api, args, &mut stdout).await
}

/// Fetch and print metadata job by job. The first failed fetch aborts the
/// remaining jobs; output already written for earlier jobs stays.
pub async fn write_metrics<W: Write>(api: &impl PromApi, args: &MetricArgs, out: &mut W) -> Result<()> {
    let jobs = match args.job.as_deref().filter(|j| !j.is_empty()) {
        Some(job) => vec![job.to_string()],
        None => {
            let targets = api
                .targets()
                .await
                .context("Error retrieving list of targets")?;
            discover_jobs(&targets)
        }
    };
    debug!("fetching metric metadata for jobs {:?}", jobs);

    let mut count = 0usize;
    for job in &jobs {
        let metadata = api
            .targets_metadata(&job_selector(job))
            .await
            .with_context(|| format!("Error retrieving metric metadata for {}", job))?;

        count += metadata.len();
        if args.count_only {
            continue;
        }
        out.write_all(render_job(job, &metadata, args).as_bytes())?;
    }

    if args.count_only {
        writeln!(out, "{}", count)?;
    }
    out.flush()?;
    Ok(())
}

/// Distinct `job` values of targets that are not down, first-seen order.
fn discover_jobs(targets: &TargetsResult) -> Vec<String> {
    let mut jobs: Vec<String> = Vec::new();
    for target in &targets.active {
        if target.health == TargetHealth::Down {
            continue;
        }
        let job = label(&target.labels, "job");
        if !jobs.iter().any(|j| j == job) {
            jobs.push(job.to_string());
        }
    }
    jobs
}

/// `{job="<job>"}`, with the value escaped for the selector syntax.
fn job_selector(job: &str) -> String {
    format!("{{job={}}}", quote_label_value(job))
}

/// Commas in help text become semicolons; nothing else is escaped.
fn csv_row(job: &str, metric: &MetricMetadata) -> String {
    format!(
        "{},{},{},{}\n",
        job,
        metric.metric,
        metric.help.replace(',', ";"),
        metric.metric_type
    )
}

fn render_job(job: &str, metadata: &[MetricMetadata], args: &MetricArgs) -> String {
    let mut out = String::new();
    for metric in metadata {
        if args.csv {
            out.push_str(&csv_row(job, metric));
            continue;
        }
        out.push_str(&kv_line("Job:", job));
        out.push_str(&kv_line("Metric Name:", &metric.metric));
        out.push_str(&kv_line("Metric Help:", &metric.help));
        out.push_str(&kv_line("Metric Type:", &metric.metric_type));
        if args.verbose && !metric.unit.is_empty() {
            out.push_str(&kv_line("Metric Unit:", &metric.unit));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeApi;
    use serde_json::json;
    use std::collections::HashMap;

    fn metadata(entries: &[(&str, &str, &str)]) -> Vec<MetricMetadata> {
        entries
            .iter()
            .map(|(metric, help, kind)| MetricMetadata {
                metric: metric.to_string(),
                metric_type: kind.to_string(),
                help: help.to_string(),
                unit: String::new(),
            })
            .collect()
    }

    fn api() -> FakeApi {
        let targets: TargetsResult = serde_json::from_value(json!({
            "activeTargets": [
                {"scrapeUrl": "http://api-1/metrics", "health": "up", "labels": {"job": "api"}},
                {"scrapeUrl": "http://db-1/metrics", "health": "down", "labels": {"job": "db"}},
                {"scrapeUrl": "http://node-1/metrics", "health": "unknown", "labels": {"job": "node"}},
                {"scrapeUrl": "http://api-2/metrics", "health": "up", "labels": {"job": "api"}}
            ],
            "droppedTargets": []
        }))
        .unwrap();

        let mut by_selector = HashMap::new();
        by_selector.insert(
            r#"{job="api"}"#.to_string(),
            metadata(&[
                ("up", "1, if up", "gauge"),
                ("http_requests_total", "Total requests.", "counter"),
            ]),
        );
        by_selector.insert(
            r#"{job="node"}"#.to_string(),
            metadata(&[("node_load1", "1m load average.", "gauge")]),
        );

        FakeApi {
            targets,
            metadata: by_selector,
            ..FakeApi::default()
        }
    }

    async fn output(api: &FakeApi, args: &MetricArgs) -> String {
        let mut buf = Vec::new();
        write_metrics(api, args, &mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_discover_jobs_skips_down_and_dedupes() {
        assert_eq!(discover_jobs(&api().targets), vec!["api", "node"]);
    }

    #[test]
    fn test_job_selector() {
        assert_eq!(job_selector("api"), r#"{job="api"}"#);
        assert_eq!(job_selector(r#"a"b"#), r#"{job="a\"b"}"#);
        assert_eq!(job_selector("x\u{1b}y"), "{job=\"x\u{1b}y\"}");
    }

    #[test]
    fn test_csv_replaces_commas_in_help_only() {
        let rows = metadata(&[("up", "1, if up", "gauge")]);
        assert_eq!(csv_row("api", &rows[0]), "api,up,1; if up,gauge\n");

        let plain = metadata(&[("x", "no commas; here", "counter")]);
        assert_eq!(csv_row("api", &plain[0]), "api,x,no commas; here,counter\n");
    }

    #[tokio::test]
    async fn test_csv_across_discovered_jobs() {
        let api = api();
        let args = MetricArgs {
            csv: true,
            ..MetricArgs::default()
        };
        assert_eq!(
            output(&api, &args).await,
            "api,up,1; if up,gauge\n\
             api,http_requests_total,Total requests.,counter\n\
             node,node_load1,1m load average.,gauge\n"
        );
        assert_eq!(
            api.calls(),
            vec!["targets", r#"{job="api"}"#, r#"{job="node"}"#]
        );
    }

    #[tokio::test]
    async fn test_count_wins_over_csv() {
        let args = MetricArgs {
            count_only: true,
            csv: true,
            ..MetricArgs::default()
        };
        assert_eq!(output(&api(), &args).await, "3\n");
    }

    #[tokio::test]
    async fn test_explicit_job_skips_discovery() {
        let api = api();
        let args = MetricArgs {
            job: Some("node".to_string()),
            ..MetricArgs::default()
        };
        let out = output(&api, &args).await;
        assert_eq!(
            out,
            "Job:                 node\n\
             Metric Name:         node_load1\n\
             Metric Help:         1m load average.\n\
             Metric Type:         gauge\n\n"
        );
        assert_eq!(api.calls(), vec![r#"{job="node"}"#]);
    }

    #[tokio::test]
    async fn test_verbose_adds_unit() {
        let mut api = api();
        api.metadata.get_mut(r#"{job="node"}"#).unwrap()[0].unit = "seconds".to_string();
        let args = MetricArgs {
            job: Some("node".to_string()),
            verbose: true,
            ..MetricArgs::default()
        };
        assert!(output(&api, &args)
            .await
            .contains("Metric Unit:         seconds\n"));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_jobs() {
        let mut api = api();
        api.failing.push(r#"{job="api"}"#.to_string());

        let mut buf: Vec<u8> = Vec::new();
        let err = write_metrics(&api, &MetricArgs::default(), &mut buf)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).starts_with("Error retrieving metric metadata for api"));
        assert!(buf.is_empty());
        assert_eq!(api.calls(), vec!["targets", r#"{job="api"}"#]);
    }
}
