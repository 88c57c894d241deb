//! Typed views of the Prometheus HTTP API v1 responses.
//!
//! Everything here is deserialized straight from the `data` member of the
//! API envelope and is never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Label name to label value. Kept sorted so every rendering is stable.
pub type LabelSet = BTreeMap<String, String>;

/// Health of an active scrape target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetHealth {
    Up,
    Down,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TargetHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetHealth::Up => "up",
            TargetHealth::Down => "down",
            TargetHealth::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTarget {
    #[serde(default)]
    pub discovered_labels: LabelSet,
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub scrape_url: String,
    #[serde(default)]
    pub last_error: String,
    #[serde(default)]
    pub last_scrape: DateTime<Utc>,
    pub health: TargetHealth,
}

/// A target removed by relabelling. Only its pre-relabelling labels survive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedTarget {
    #[serde(default)]
    pub discovered_labels: LabelSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsResult {
    #[serde(rename = "activeTargets", default)]
    pub active: Vec<ActiveTarget>,
    #[serde(rename = "droppedTargets", default)]
    pub dropped: Vec<DroppedTarget>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub annotations: LabelSet,
    #[serde(default)]
    pub active_at: DateTime<Utc>,
}

impl Alert {
    pub fn name(&self) -> &str {
        label(&self.labels, "alertname")
    }

    pub fn severity(&self) -> &str {
        label(&self.labels, "severity")
    }

    pub fn message(&self) -> &str {
        label(&self.annotations, "message")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsResult {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// Value of `name` in `labels`, or the empty string when absent.
pub fn label<'a>(labels: &'a LabelSet, name: &str) -> &'a str {
    labels.get(name).map(String::as_str).unwrap_or("")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleHealth {
    Ok,
    Err,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for RuleHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleHealth::Ok => "ok",
            RuleHealth::Err => "err",
            RuleHealth::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingRule {
    pub name: String,
    #[serde(default)]
    pub query: String,
    /// `for` clause, in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub annotations: LabelSet,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    pub health: RuleHealth,
    #[serde(default)]
    pub last_error: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub evaluation_time: f64,
    #[serde(default)]
    pub last_evaluation: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRule {
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub labels: LabelSet,
    pub health: RuleHealth,
    #[serde(default)]
    pub last_error: String,
    #[serde(default)]
    pub evaluation_time: f64,
    #[serde(default)]
    pub last_evaluation: DateTime<Utc>,
}

/// A rule as reported by `/api/v1/rules`, dispatched on its `type` field.
#[derive(Debug, Clone)]
pub enum Rule {
    Alerting(AlertingRule),
    Recording(RecordingRule),
    /// Any rule kind this client does not know; carries the reported `type`.
    Unknown(String),
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        match kind.as_str() {
            "alerting" => serde_json::from_value(value)
                .map(Rule::Alerting)
                .map_err(de::Error::custom),
            "recording" => serde_json::from_value(value)
                .map(Rule::Recording)
                .map_err(de::Error::custom),
            _ => Ok(Rule::Unknown(kind)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesResult {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

/// One entry of `/api/v1/targets/metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricMetadata {
    pub metric: String,
    #[serde(rename = "type", default)]
    pub metric_type: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    #[serde(rename = "CWD", default)]
    pub cwd: String,
    #[serde(default)]
    pub reload_config_success: bool,
    #[serde(default)]
    pub last_config_time: DateTime<Utc>,
    #[serde(default)]
    pub chunk_count: i64,
    #[serde(default)]
    pub time_series_count: i64,
    #[serde(default)]
    pub corruption_count: i64,
    #[serde(default)]
    pub goroutine_count: i64,
    #[serde(rename = "GOMAXPROCS", default)]
    pub gomaxprocs: i64,
    #[serde(rename = "GOGC", default)]
    pub gogc: String,
    #[serde(rename = "GODEBUG", default)]
    pub godebug: String,
    #[serde(default)]
    pub storage_retention: String,
}

/// A sample value, printed the way the server itself prints floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleValue(pub f64);

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            f.write_str("NaN")
        } else if v.is_infinite() {
            f.write_str(if v > 0.0 { "+Inf" } else { "-Inf" })
        } else {
            write!(f, "{}", v)
        }
    }
}

impl FromStr for SampleValue {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<f64>().map(SampleValue)
    }
}

/// `[<unix seconds>, "<value>"]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "(f64, String)")]
pub struct SamplePair {
    pub timestamp: f64,
    pub value: SampleValue,
}

impl TryFrom<(f64, String)> for SamplePair {
    type Error = String;

    fn try_from((timestamp, raw): (f64, String)) -> Result<Self, Self::Error> {
        let value = raw
            .parse()
            .map_err(|e| format!("invalid sample value {:?}: {}", raw, e))?;
        Ok(SamplePair { timestamp, value })
    }
}

/// `[<unix seconds>, {...}]`. Bucket layout is kept undecoded.
#[derive(Debug, Clone, Deserialize)]
pub struct HistogramPoint(pub f64, pub serde_json::Value);

/// Float samples carry `value`, native-histogram samples carry `histogram`.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub metric: LabelSet,
    #[serde(default)]
    pub value: Option<SamplePair>,
    #[serde(default)]
    pub histogram: Option<HistogramPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleStream {
    #[serde(default)]
    pub metric: LabelSet,
    #[serde(default)]
    pub values: Vec<SamplePair>,
    #[serde(default)]
    pub histograms: Vec<HistogramPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "(f64, String)")]
pub struct StringSample {
    pub timestamp: f64,
    pub value: String,
}

impl From<(f64, String)> for StringSample {
    fn from((timestamp, value): (f64, String)) -> Self {
        StringSample { timestamp, value }
    }
}

/// Result of an instant or range query.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryValue {
    Vector(Vec<Sample>),
    Matrix(Vec<SampleStream>),
    Scalar(SamplePair),
    String(StringSample),
}

/// A query value plus any warnings the server attached to it.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub value: QueryValue,
    pub warnings: Vec<String>,
}
