//! Prometheus HTTP API v1 client.
//!
//! Commands only see the [`PromApi`] trait, so they can be driven by the
//! real HTTP client or by an in-memory fake in tests.

use crate::config::ServerConfig;
use crate::model::{
    AlertsResult, MetricMetadata, QueryResult, QueryValue, RulesResult, RuntimeInfo,
    TargetsResult,
};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid server URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed")]
    Transport(#[source] reqwest::Error),

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{error_type}: {message}")]
    Api { error_type: String, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Time window and resolution of a range query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

/// The read operations this tool needs from a Prometheus server.
#[allow(async_fn_in_trait)]
pub trait PromApi {
    async fn targets(&self) -> Result<TargetsResult, ApiError>;
    async fn alerts(&self) -> Result<AlertsResult, ApiError>;
    async fn rules(&self) -> Result<RulesResult, ApiError>;
    /// Metric metadata for every target matching `match_target`.
    async fn targets_metadata(&self, match_target: &str) -> Result<Vec<MetricMetadata>, ApiError>;
    async fn runtime_info(&self) -> Result<RuntimeInfo, ApiError>;
    async fn query(&self, query: &str, time: DateTime<Utc>) -> Result<QueryResult, ApiError>;
    async fn query_range(&self, query: &str, range: &QueryRange) -> Result<QueryResult, ApiError>;
}

/// Response envelope shared by every `/api/v1` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Payload plus the warnings the server attached to it.
struct Response<T> {
    data: T,
    warnings: Vec<String>,
}

pub struct HttpClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(&config.endpoint).map_err(|e| ApiError::InvalidUrl {
            url: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: config.endpoint.clone(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(ApiError::Build)?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            http,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Response<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        trace!("{} -> {}", path, status);

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        decode_envelope(status.as_u16(), &body)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(err)
        }
    }

    async fn get_query(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<QueryResult, ApiError> {
        let response: Response<QueryValue> = self.get(path, params).await?;
        Ok(QueryResult {
            value: response.data,
            warnings: response.warnings,
        })
    }
}

/// Unwrap the API envelope. Error envelopes win over the HTTP status, since
/// the server reports bad queries as 4xx with a JSON body.
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Response<T>, ApiError> {
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            if !(200..300).contains(&status) {
                return Err(ApiError::Status {
                    status,
                    body: body.trim().to_string(),
                });
            }
            return Err(ApiError::Decode(err.to_string()));
        }
    };

    if envelope.status != "success" {
        return Err(ApiError::Api {
            error_type: envelope.error_type.unwrap_or_else(|| "error".to_string()),
            message: envelope.error.unwrap_or_default(),
        });
    }

    match envelope.data {
        Some(data) => Ok(Response {
            data,
            warnings: envelope.warnings,
        }),
        None => Err(ApiError::Decode("missing data field".to_string())),
    }
}

fn unix_seconds(ts: &DateTime<Utc>) -> String {
    format!("{:.3}", ts.timestamp_millis() as f64 / 1000.0)
}

impl PromApi for HttpClient {
    async fn targets(&self) -> Result<TargetsResult, ApiError> {
        Ok(self.get("/api/v1/targets", &[]).await?.data)
    }

    async fn alerts(&self) -> Result<AlertsResult, ApiError> {
        Ok(self.get("/api/v1/alerts", &[]).await?.data)
    }

    async fn rules(&self) -> Result<RulesResult, ApiError> {
        Ok(self.get("/api/v1/rules", &[]).await?.data)
    }

    async fn targets_metadata(&self, match_target: &str) -> Result<Vec<MetricMetadata>, ApiError> {
        let params = [("match_target", match_target.to_string())];
        Ok(self.get("/api/v1/targets/metadata", &params).await?.data)
    }

    async fn runtime_info(&self) -> Result<RuntimeInfo, ApiError> {
        Ok(self.get("/api/v1/status/runtimeinfo", &[]).await?.data)
    }

    async fn query(&self, query: &str, time: DateTime<Utc>) -> Result<QueryResult, ApiError> {
        let params = [("query", query.to_string()), ("time", unix_seconds(&time))];
        self.get_query("/api/v1/query", &params).await
    }

    async fn query_range(&self, query: &str, range: &QueryRange) -> Result<QueryResult, ApiError> {
        let params = [
            ("query", query.to_string()),
            ("start", unix_seconds(&range.start)),
            ("end", unix_seconds(&range.end)),
            ("step", range.step.as_secs_f64().to_string()),
        ];
        self.get_query("/api/v1/query_range", &params).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetHealth;

    fn server(endpoint: &str) -> ServerConfig {
        ServerConfig {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(30),
            insecure: false,
        }
    }

    #[test]
    fn test_decode_success_envelope() {
        let body = r#"{"status":"success","data":{"activeTargets":[{"scrapeUrl":"http://a:9100/metrics","health":"up","labels":{"job":"node"}}],"droppedTargets":[]}}"#;
        let response: Response<TargetsResult> = decode_envelope(200, body).unwrap();
        assert_eq!(response.data.active.len(), 1);
        assert_eq!(response.data.active[0].health, TargetHealth::Up);
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn test_decode_keeps_warnings() {
        let body = r#"{"status":"success","data":{"resultType":"scalar","result":[1,"2"]},"warnings":["partial data"]}"#;
        let response: Response<QueryValue> = decode_envelope(200, body).unwrap();
        assert_eq!(response.warnings, vec!["partial data".to_string()]);
    }

    #[test]
    fn test_decode_api_error_on_4xx() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 3"}"#;
        let err = decode_envelope::<QueryValue>(400, body).err().unwrap();
        match err {
            ApiError::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "bad_data");
                assert_eq!(message, "parse error at char 3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_non_json_error_status() {
        let err = decode_envelope::<RulesResult>(502, "Bad Gateway\n").err().unwrap();
        assert!(matches!(err, ApiError::Status { status: 502, ref body } if body == "Bad Gateway"));
    }

    #[test]
    fn test_decode_malformed_success() {
        let err = decode_envelope::<RulesResult>(200, "not json").err().unwrap();
        assert!(matches!(err, ApiError::Decode(_)));

        let err = decode_envelope::<RulesResult>(200, r#"{"status":"success"}"#)
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_unix_seconds() {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_250).unwrap();
        assert_eq!(unix_seconds(&ts), "1700000000.250");
    }

    #[test]
    fn test_client_rejects_bad_urls() {
        assert!(matches!(
            HttpClient::new(&server("not a url")),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpClient::new(&server("ftp://prom:9090")),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HttpClient::new(&server("http://prom:9090/prefix/")).unwrap();
        assert_eq!(client.base_url, "http://prom:9090/prefix");
    }
}
