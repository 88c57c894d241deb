//! `alerts` command: active alerts grouped by alert name.

use crate::client::PromApi;
use crate::display_helpers::write_stdout;
use crate::model::Alert;
use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;

/// Always-firing alert that only proves the alerting pipeline works.
pub const HEARTBEAT_ALERT: &str = "Watchdog";

#[derive(Debug, Clone, Default)]
pub struct AlertArgs {
    /// Only alerts whose `severity` label equals this value.
    pub severity: Option<String>,
    /// Print the raw number of alerts reported by the server.
    pub count_only: bool,
}

#[derive(Debug, Default, PartialEq)]
struct AlertGroup {
    /// Severity of the first instance seen.
    severity: String,
    /// `message` annotation of every instance, duplicates kept.
    messages: Vec<String>,
}

pub async fn run(api: &impl PromApi, args: &AlertArgs) -> Result<()> {
    let result = api
        .alerts()
        .await
        .context("Error retrieving list of alerts")?;
    debug!("{} alerts reported", result.alerts.len());

    write_stdout(&render(&result.alerts, args))?;
    Ok(())
}

/// Group by alert name, sorted by name.
fn group_alerts<'a>(alerts: &'a [Alert], severity: Option<&str>) -> BTreeMap<&'a str, AlertGroup> {
    let mut groups: BTreeMap<&str, AlertGroup> = BTreeMap::new();

    for alert in alerts {
        if alert.name() == HEARTBEAT_ALERT {
            continue;
        }
        if let Some(wanted) = severity.filter(|s| !s.is_empty()) {
            if alert.severity() != wanted {
                continue;
            }
        }

        let group = groups.entry(alert.name()).or_insert_with(|| AlertGroup {
            severity: alert.severity().to_string(),
            messages: Vec::new(),
        });
        group.messages.push(alert.message().to_string());
    }

    groups
}

pub fn render(alerts: &[Alert], args: &AlertArgs) -> String {
    // Raw instance count from the server, before any filtering.
    if args.count_only {
        return format!("{}\n", alerts.len());
    }

    let mut out = String::from("\n");
    for (name, group) in group_alerts(alerts, args.severity.as_deref()) {
        out.push_str(&format!("alert: {}\n", name));
        out.push_str(&format!("severity: {}\n", group.severity));
        for message in &group.messages {
            out.push_str(&format!("  {}\n", message));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeApi;
    use crate::model::AlertsResult;
    use serde_json::json;

    fn alert(name: &str, severity: Option<&str>, message: &str) -> serde_json::Value {
        let mut labels = json!({"alertname": name});
        if let Some(sev) = severity {
            labels["severity"] = json!(sev);
        }
        json!({
            "labels": labels,
            "annotations": {"message": message},
            "state": "firing",
            "activeAt": "2024-03-01T10:00:00Z",
            "value": "1"
        })
    }

    fn fixture() -> Vec<Alert> {
        let result: AlertsResult = serde_json::from_value(json!({
            "alerts": [
                alert("Watchdog", Some("none"), "pipeline alive"),
                alert("TargetDown", Some("warning"), "node-1 is down"),
                alert("DiskFull", Some("critical"), "/ is 95% full"),
                alert("TargetDown", Some("critical"), "node-2 is down"),
                alert("TargetDown", Some("warning"), "node-1 is down"),
            ]
        }))
        .unwrap();
        result.alerts
    }

    #[test]
    fn test_groups_by_name_sorted() {
        let out = render(&fixture(), &AlertArgs::default());
        assert_eq!(
            out,
            "\n\
             alert: DiskFull\n\
             severity: critical\n  / is 95% full\n\n\
             alert: TargetDown\n\
             severity: warning\n  node-1 is down\n  node-2 is down\n  node-1 is down\n\n"
        );
    }

    #[test]
    fn test_heartbeat_never_shown() {
        let out = render(&fixture(), &AlertArgs::default());
        assert!(!out.contains(HEARTBEAT_ALERT));

        let only_heartbeat = vec![fixture().remove(0)];
        assert_eq!(render(&only_heartbeat, &AlertArgs::default()), "\n");

        let none_severity = AlertArgs {
            severity: Some("none".to_string()),
            count_only: false,
        };
        assert!(!render(&fixture(), &none_severity).contains(HEARTBEAT_ALERT));
    }

    #[test]
    fn test_severity_filter_applies_per_instance() {
        let args = AlertArgs {
            severity: Some("critical".to_string()),
            count_only: false,
        };
        let alerts = fixture();
        let groups = group_alerts(&alerts, args.severity.as_deref());
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups["TargetDown"],
            AlertGroup {
                severity: "critical".to_string(),
                messages: vec!["node-2 is down".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_severity_never_matches_filter() {
        let result: AlertsResult = serde_json::from_value(json!({
            "alerts": [alert("NoSeverity", None, "m")]
        }))
        .unwrap();
        let args = AlertArgs {
            severity: Some("critical".to_string()),
            count_only: false,
        };
        assert_eq!(render(&result.alerts, &args), "\n");
        assert!(render(&result.alerts, &AlertArgs::default()).contains("severity: \n"));
    }

    #[test]
    fn test_count_is_raw_server_count() {
        let args = AlertArgs {
            severity: Some("critical".to_string()),
            count_only: true,
        };
        // Watchdog and the non-critical instances still count
        assert_eq!(render(&fixture(), &args), "5\n");
    }

    #[tokio::test]
    async fn test_run_fetches_once() {
        let api = FakeApi {
            alerts: AlertsResult {
                alerts: fixture(),
            },
            ..FakeApi::default()
        };
        run(&api, &AlertArgs::default()).await.unwrap();
        assert_eq!(api.calls(), vec!["alerts".to_string()]);
    }
}
