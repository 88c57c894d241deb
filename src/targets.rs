//! `targets` command: active and dropped scrape targets.

use crate::client::PromApi;
use crate::display_helpers::{kv_line, local_time, write_stdout};
use crate::model::{label, ActiveTarget, DroppedTarget, LabelSet, TargetHealth, TargetsResult};
use anyhow::{Context, Result};
use log::debug;

#[derive(Debug, Clone, Default)]
pub struct TargetArgs {
    /// Only targets whose `job` label equals this value.
    pub job: Option<String>,
    /// Skip the dropped-target listing.
    pub active_only: bool,
    /// Only active targets that are down. Implies `active_only`.
    pub down_only: bool,
    /// Print the number of matching active targets and nothing else.
    pub count_only: bool,
    /// Also dump every discovered label.
    pub verbose: bool,
}

impl TargetArgs {
    pub fn new(job: Option<String>, active: bool, down: bool, count: bool, verbose: bool) -> Self {
        Self {
            job,
            active_only: active || down,
            down_only: down,
            count_only: count,
            verbose,
        }
    }
}

pub async fn run(api: &impl PromApi, args: &TargetArgs) -> Result<()> {
    let result = api
        .targets()
        .await
        .context("Error retrieving list of targets")?;
    debug!(
        "{} active, {} dropped targets",
        result.active.len(),
        result.dropped.len()
    );

    write_stdout(&render(&result, args))?;
    Ok(())
}

/// Exact match on the `job` label; no filter (or an empty one) matches all.
fn job_matches(filter: Option<&str>, labels: &LabelSet) -> bool {
    match filter {
        None | Some("") => true,
        Some(job) => label(labels, "job") == job,
    }
}

/// Active targets surviving the job and health filters, in server order.
fn filter_active<'a>(targets: &'a [ActiveTarget], args: &TargetArgs) -> Vec<&'a ActiveTarget> {
    targets
        .iter()
        .filter(|t| job_matches(args.job.as_deref(), &t.labels))
        .filter(|t| !args.down_only || t.health == TargetHealth::Down)
        .collect()
}

pub fn render(result: &TargetsResult, args: &TargetArgs) -> String {
    let active = filter_active(&result.active, args);

    if args.count_only {
        return format!("{}\n", active.len());
    }

    let mut out = String::new();
    if !args.down_only {
        out.push_str("Active targets\n");
        out.push_str("==============\n");
    }
    for target in active {
        render_active(&mut out, target, args.verbose);
    }

    if args.active_only {
        return out;
    }

    out.push_str("Dropped targets:\n");
    for target in result
        .dropped
        .iter()
        .filter(|t| job_matches(args.job.as_deref(), &t.discovered_labels))
    {
        render_dropped(&mut out, target, args.verbose);
    }
    out
}

fn render_active(out: &mut String, target: &ActiveTarget, verbose: bool) {
    out.push_str(&kv_line("Scrape URL:", &target.scrape_url));
    out.push_str(&kv_line("Last Scrape:", local_time(&target.last_scrape)));
    out.push_str(&kv_line("Jobs:", label(&target.labels, "job")));
    let pod = label(&target.labels, "pod");
    if !pod.is_empty() {
        out.push_str(&kv_line("Pod:", pod));
    }
    out.push_str(&kv_line("State:", target.health));
    if target.health == TargetHealth::Down {
        out.push_str(&kv_line("Error:", &target.last_error));
    }
    if verbose {
        for (name, value) in &target.discovered_labels {
            out.push_str(&kv_line(name, value));
        }
    }
    out.push('\n');
}

fn render_dropped(out: &mut String, target: &DroppedTarget, verbose: bool) {
    out.push_str(&format!(
        "Job: {}\n",
        label(&target.discovered_labels, "job")
    ));
    if verbose {
        for (name, value) in &target.discovered_labels {
            out.push_str(&format!("{}: {}\n", name, value));
        }
    }
    out.push('\n');
}
