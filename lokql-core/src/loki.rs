//! The Loki query executor.
//!
//! One `GET /loki/api/v1/query_range` per invocation, no retries, no
//! caching. The response is decoded into a [`QueryOutcome`] and rendered
//! as deterministic text suitable for handing straight back to the model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lokql_error::{Error, Result};
use serde::Deserialize;

use crate::config::LokiConfig;
use crate::timerange::TimeWindow;

/// Default number of log lines returned per query.
pub const DEFAULT_LIMIT: u64 = 100;

/// Hard ceiling on the result-count limit; larger requests are clamped,
/// not rejected.
pub const MAX_LIMIT: u64 = 5000;

/// Fixed rendering for the zero-match outcome. Never an empty string.
pub const NO_RESULTS_TEXT: &str = "No results found for this query and time range.";

/// Step sent with every range query; controls matrix resolution.
pub const DEFAULT_INTERVAL: &str = "1m";

/// Result ordering for stream queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    /// Newest first
    #[default]
    Backward,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

/// One query against the backend. Immutable, constructed per invocation.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub logql: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<u64>,
    pub direction: Direction,
    pub interval: String,
}

impl QueryRequest {
    pub fn new(logql: impl Into<String>) -> Self {
        Self {
            logql: logql.into(),
            start: None,
            end: None,
            limit: None,
            direction: Direction::default(),
            interval: DEFAULT_INTERVAL.to_string(),
        }
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    /// Validate and resolve against `now`. Runs before any network I/O.
    fn resolve(&self, now: DateTime<Utc>) -> Result<ResolvedQuery> {
        if self.logql.trim().is_empty() {
            return Err(Error::invalid_argument("logql query must not be empty")
                .with_operation("loki::resolve"));
        }

        let limit = match self.limit {
            Some(0) => {
                return Err(Error::invalid_argument("limit must be a positive integer")
                    .with_operation("loki::resolve"));
            }
            Some(n) => n.min(MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };

        let window = TimeWindow::resolve(self.start.as_deref(), self.end.as_deref(), now)?;

        Ok(ResolvedQuery {
            logql: self.logql.trim().to_string(),
            window,
            limit,
            direction: self.direction,
            interval: self.interval.clone(),
        })
    }
}

#[derive(Debug, Clone)]
struct ResolvedQuery {
    logql: String,
    window: TimeWindow,
    limit: u64,
    direction: Direction,
    interval: String,
}

/// One log line from a stream query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub labels: BTreeMap<String, String>,
    pub line: String,
}

/// One series from a matrix (range aggregation) result.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<(DateTime<Utc>, String)>,
}

/// One sample from a vector (instant aggregation) result.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub labels: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub value: String,
}

/// What the backend returned. Lives only for the duration of one call.
///
/// `Empty` is a distinct zero-match outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Streams(Vec<LogEntry>),
    Matrix(Vec<MetricSeries>),
    Vector(Vec<MetricSample>),
    Empty,
}

impl QueryOutcome {
    /// Deterministic text rendering of the outcome.
    pub fn render(&self) -> String {
        match self {
            QueryOutcome::Empty => NO_RESULTS_TEXT.to_string(),
            QueryOutcome::Streams(entries) => {
                let lines: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        format!(
                            "[{}] {{{}}} {}",
                            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            format_labels(&entry.labels),
                            entry.line
                        )
                    })
                    .collect();
                lines.join("\n")
            }
            QueryOutcome::Vector(samples) => {
                let lines: Vec<String> = samples
                    .iter()
                    .map(|sample| {
                        format!(
                            "{{{}}} => {} @ {}",
                            format_labels(&sample.labels),
                            sample.value,
                            sample.timestamp.format("%Y-%m-%d %H:%M:%S")
                        )
                    })
                    .collect();
                lines.join("\n")
            }
            QueryOutcome::Matrix(series) => {
                let mut lines = Vec::new();
                for s in series {
                    lines.push(format!("{{{}}}", format_labels(&s.labels)));
                    for (timestamp, value) in &s.samples {
                        lines.push(format!("  [{}] {}", timestamp.format("%Y-%m-%d %H:%M:%S"), value));
                    }
                }
                lines.join("\n")
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutcome::Empty)
    }
}

fn format_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Loki wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[allow(dead_code)]
    status: String,
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    stream: BTreeMap<String, String>,
    values: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct RawMetric {
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
    #[serde(default)]
    value: Option<(f64, String)>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for Loki's range-query endpoint.
pub struct LokiClient {
    http: reqwest::Client,
    base_url: String,
}

impl LokiClient {
    pub fn new(config: &LokiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Execute one range query. Exactly one outbound request; errors
    /// propagate verbatim with no retry.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let resolved = request.resolve(Utc::now())?;

        let url = format!("{}/loki/api/v1/query_range", self.base_url);
        let start = resolved.window.start_ns();
        let end = resolved.window.end_ns();
        let limit = resolved.limit.to_string();
        tracing::debug!(
            logql = %resolved.logql,
            start = %start,
            end = %end,
            limit = resolved.limit,
            "querying loki"
        );
        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", resolved.logql.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("limit", limit.as_str()),
                ("direction", resolved.direction.as_str()),
                ("interval", resolved.interval.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                Error::backend_unavailable(reason)
                    .with_operation("loki::query")
                    .with_context("url", &url)
                    .set_source(e)
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| body.trim().to_string());
            return Err(Error::query_rejected(message)
                .with_operation("loki::query")
                .with_context("status", status.as_str().to_string())
                .with_context("logql", resolved.logql));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::backend_unavailable(format!(
                "loki returned {}: {}",
                status.as_u16(),
                body.trim()
            ))
            .with_operation("loki::query"));
        }

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            Error::parse_failed(format!("invalid loki response body: {}", e))
                .with_operation("loki::query")
                .set_source(e)
        })?;

        decode_outcome(parsed.data)
    }
}

fn decode_outcome(data: QueryData) -> Result<QueryOutcome> {
    match data.result_type.as_str() {
        "streams" => {
            let streams: Vec<RawStream> = serde_json::from_value(data.result)
                .map_err(|e| decode_error("streams", e))?;
            let mut entries = Vec::new();
            for stream in streams {
                for (ts, line) in stream.values {
                    entries.push(LogEntry {
                        timestamp: nanos_to_instant(&ts)?,
                        labels: stream.stream.clone(),
                        line,
                    });
                }
            }
            if entries.is_empty() {
                Ok(QueryOutcome::Empty)
            } else {
                Ok(QueryOutcome::Streams(entries))
            }
        }
        "matrix" => {
            let raw: Vec<RawMetric> = serde_json::from_value(data.result)
                .map_err(|e| decode_error("matrix", e))?;
            let series: Vec<MetricSeries> = raw
                .into_iter()
                .map(|m| MetricSeries {
                    labels: m.metric,
                    samples: m
                        .values
                        .into_iter()
                        .map(|(secs, value)| (seconds_to_instant(secs), value))
                        .collect(),
                })
                .collect();
            if series.is_empty() {
                Ok(QueryOutcome::Empty)
            } else {
                Ok(QueryOutcome::Matrix(series))
            }
        }
        "vector" => {
            let raw: Vec<RawMetric> = serde_json::from_value(data.result)
                .map_err(|e| decode_error("vector", e))?;
            let samples: Vec<MetricSample> = raw
                .into_iter()
                .filter_map(|m| {
                    m.value.map(|(secs, value)| MetricSample {
                        labels: m.metric,
                        timestamp: seconds_to_instant(secs),
                        value,
                    })
                })
                .collect();
            if samples.is_empty() {
                Ok(QueryOutcome::Empty)
            } else {
                Ok(QueryOutcome::Vector(samples))
            }
        }
        other => Err(Error::parse_failed(format!("unsupported result type '{}'", other))
            .with_operation("loki::decode")),
    }
}

fn decode_error(result_type: &'static str, err: serde_json::Error) -> Error {
    Error::parse_failed(format!("malformed {} result: {}", result_type, err))
        .with_operation("loki::decode")
        .set_source(err)
}

fn nanos_to_instant(raw: &str) -> Result<DateTime<Utc>> {
    let nanos: i64 = raw.parse().map_err(|_| {
        Error::parse_failed(format!("invalid entry timestamp '{}'", raw))
            .with_operation("loki::decode")
    })?;
    Ok(DateTime::from_timestamp_nanos(nanos))
}

fn seconds_to_instant(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos((secs * 1e9) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_logql_rejected() {
        let err = QueryRequest::new("  ").resolve(Utc::now()).unwrap_err();
        assert_eq!(err.kind(), lokql_error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = QueryRequest::new("{job=\"nginx\"}")
            .with_limit(0)
            .resolve(Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), lokql_error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_oversized_limit_clamped() {
        let resolved = QueryRequest::new("{job=\"nginx\"}")
            .with_limit(999_999)
            .resolve(Utc::now())
            .unwrap();
        assert_eq!(resolved.limit, MAX_LIMIT);
    }

    #[test]
    fn test_default_limit_applied() {
        let resolved = QueryRequest::new("{job=\"nginx\"}").resolve(Utc::now()).unwrap();
        assert_eq!(resolved.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_stream_rendering_preserves_order_and_sorts_labels() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let outcome = QueryOutcome::Streams(vec![
            LogEntry {
                timestamp: ts,
                labels: labels(&[("job", "nginx"), ("env", "prod")]),
                line: "GET /a 500".into(),
            },
            LogEntry {
                timestamp: ts,
                labels: labels(&[("job", "nginx"), ("env", "prod")]),
                line: "GET /b 500".into(),
            },
        ]);

        let rendered = outcome.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "[2024-05-01 12:00:00] {env=\"prod\", job=\"nginx\"} GET /a 500"
        );
        assert!(lines[1].ends_with("GET /b 500"));
    }

    #[test]
    fn test_empty_renders_fixed_text() {
        assert_eq!(QueryOutcome::Empty.render(), NO_RESULTS_TEXT);
        assert!(!QueryOutcome::Empty.render().is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let outcome = QueryOutcome::Vector(vec![MetricSample {
            labels: labels(&[("app", "api")]),
            timestamp: ts,
            value: "42".into(),
        }]);
        assert_eq!(outcome.render(), outcome.render());
        assert_eq!(outcome.render(), "{app=\"api\"} => 42 @ 2024-05-01 12:00:00");
    }

    #[test]
    fn test_decode_streams() {
        let data = QueryData {
            result_type: "streams".into(),
            result: serde_json::json!([
                {
                    "stream": {"job": "nginx"},
                    "values": [
                        ["1714564800000000000", "first"],
                        ["1714564801000000000", "second"]
                    ]
                }
            ]),
        };
        match decode_outcome(data).unwrap() {
            QueryOutcome::Streams(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].line, "first");
                assert_eq!(entries[1].line, "second");
                assert_eq!(entries[0].labels["job"], "nginx");
            }
            other => panic!("expected streams, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_streams_is_empty_outcome() {
        let data = QueryData {
            result_type: "streams".into(),
            result: serde_json::json!([]),
        };
        assert!(decode_outcome(data).unwrap().is_empty());
    }

    #[test]
    fn test_decode_matrix() {
        let data = QueryData {
            result_type: "matrix".into(),
            result: serde_json::json!([
                {
                    "metric": {"filename": "/var/log/syslog"},
                    "values": [[1714564800.0, "3"], [1714564860.0, "5"]]
                }
            ]),
        };
        match decode_outcome(data).unwrap() {
            QueryOutcome::Matrix(series) => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].samples.len(), 2);
                assert_eq!(series[0].samples[0].1, "3");
            }
            other => panic!("expected matrix, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_vector() {
        let data = QueryData {
            result_type: "vector".into(),
            result: serde_json::json!([
                {"metric": {"app": "api"}, "value": [1714564800.0, "42"]}
            ]),
        };
        match decode_outcome(data).unwrap() {
            QueryOutcome::Vector(samples) => {
                assert_eq!(samples.len(), 1);
                assert_eq!(samples[0].value, "42");
            }
            other => panic!("expected vector, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_result_type() {
        let data = QueryData {
            result_type: "scalar".into(),
            result: serde_json::json!([]),
        };
        let err = decode_outcome(data).unwrap_err();
        assert_eq!(err.kind(), lokql_error::ErrorKind::ParseFailed);
    }
}
