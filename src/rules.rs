//! `rules` command: list rule groups, or inspect one rule in detail.

use crate::client::PromApi;
use crate::display_helpers::{kv_line, local_time, write_stdout};
use crate::model::{AlertingRule, LabelSet, RecordingRule, Rule, RuleHealth, RuleGroup};
use anyhow::{Context, Result};

/// `rule_name` and `rule_group` are mutually exclusive; the CLI enforces it.
#[derive(Debug, Clone, Default)]
pub struct RuleArgs {
    pub rule_name: Option<String>,
    pub rule_group: Option<String>,
}

pub async fn run(api: &impl PromApi, args: &RuleArgs) -> Result<()> {
    let result = api
        .rules()
        .await
        .context("Error retrieving list of rules")?;

    write_stdout(&render(&result.groups, args))?;
    Ok(())
}

pub fn render(groups: &[RuleGroup], args: &RuleArgs) -> String {
    let rule_name = args.rule_name.as_deref().filter(|n| !n.is_empty());
    let rule_group = args.rule_group.as_deref().filter(|g| !g.is_empty());

    let mut out = String::new();
    for group in groups {
        if rule_group.is_some_and(|g| g != group.name) {
            continue;
        }
        if rule_name.is_none() {
            out.push_str(&format!("Group: {}\n", group.name));
        }

        for rule in &group.rules {
            match (rule, rule_name) {
                (Rule::Alerting(r), None) => out.push_str(&format!("\tAlert Rule: {}\n", r.name)),
                (Rule::Recording(r), None) => {
                    out.push_str(&format!("\tRecording Rule: {}\n", r.name))
                }
                (Rule::Alerting(r), Some(name)) if r.name == name => render_alerting(&mut out, r),
                (Rule::Recording(r), Some(name)) if r.name == name => {
                    render_recording(&mut out, r)
                }
                (Rule::Alerting(_) | Rule::Recording(_), Some(_)) => {}
                (Rule::Unknown(kind), _) => {
                    out.push_str(&format!("unknown rule type {}\n", kind))
                }
            }
        }
    }
    out.push('\n');
    out
}

fn render_labels(out: &mut String, labels: &LabelSet) {
    for (name, value) in labels {
        out.push_str(&format!("  {}: {}\n", name, value));
    }
}

fn render_health(out: &mut String, health: RuleHealth, last_error: &str) {
    out.push_str(&kv_line("Rule Health:", health));
    if health != RuleHealth::Ok {
        out.push_str(&format!("    {}", kv_line("last error:", last_error)));
    }
}

fn render_alerting(out: &mut String, rule: &AlertingRule) {
    out.push('\n');
    out.push_str(&kv_line("Type:", "alerting rule"));
    out.push_str(&kv_line("Name:", &rule.name));
    out.push_str(&kv_line("Expression:", &rule.query));
    out.push_str(&kv_line("For:", format!("{} secs", rule.duration)));
    out.push_str("Annotations:\n");
    render_labels(out, &rule.annotations);
    out.push_str("Labels:\n");
    render_labels(out, &rule.labels);
    render_health(out, rule.health, &rule.last_error);
    out.push_str(&kv_line("State:", &rule.state));
    if !rule.alerts.is_empty() {
        out.push_str("Active Alerts:\n");
        for alert in &rule.alerts {
            out.push_str(&format!("  {}", kv_line("Message:", alert.message())));
            out.push_str(&format!("  {}", kv_line("Last Fired:", local_time(&alert.active_at))));
        }
    }
    out.push_str(&kv_line("Evaluation Time:", format!("{} secs", rule.evaluation_time)));
    out.push_str(&kv_line("Last Evaluation:", local_time(&rule.last_evaluation)));
}

fn render_recording(out: &mut String, rule: &RecordingRule) {
    out.push('\n');
    out.push_str(&kv_line("Type:", "recording rule"));
    out.push_str(&kv_line("Name:", &rule.name));
    out.push_str(&kv_line("Expression:", &rule.query));
    out.push_str("Labels:\n");
    render_labels(out, &rule.labels);
    render_health(out, rule.health, &rule.last_error);
    out.push_str(&kv_line("Evaluation Time:", format!("{} secs", rule.evaluation_time)));
    out.push_str(&kv_line("Last Evaluation:", local_time(&rule.last_evaluation)));
}
