//! The one capability exposed to the model: `query_loki_logs`.
//!
//! Arguments supplied by the model are deserialized into [`QueryArgs`] and
//! validated before anything touches the network; tool-call arguments are
//! never executed as code.

use lokql_error::{Error, Result};
use serde::Deserialize;

use crate::loki::{LokiClient, QueryRequest};
use crate::provider::{ToolCall, ToolDefinition};

/// Name the model uses to invoke the query executor.
pub const TOOL_NAME: &str = "query_loki_logs";

/// Build the tool definition handed to the provider on every completion.
pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        TOOL_NAME,
        "Query logs from Grafana Loki using LogQL. Examples: \
         '{job=\"system_logs\"}' for all system logs; \
         '{job=\"system_logs\"} |= \"error\"' to filter lines containing \"error\"; \
         '{app=\"nginx\"} | json | status_code=~\"5..\"' to parse JSON and filter by field; \
         'sum by (app) (count_over_time({job=\"system_logs\"}[5m]))' for aggregations. \
         Returns log lines prefixed with their timestamps, or aggregated metric values.",
    )
    .with_parameters(serde_json::json!({
        "type": "object",
        "properties": {
            "logql": {
                "type": "string",
                "description": "The LogQL query string"
            },
            "start": {
                "type": "string",
                "description": "Window start: RFC 3339 timestamp, epoch, or relative like '1h ago'. Default: 1 hour ago"
            },
            "end": {
                "type": "string",
                "description": "Window end, same forms as start. Default: now"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of log lines to return. Default: 100"
            }
        },
        "required": ["logql"]
    }))
}

/// Arguments the model supplies for one tool invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryArgs {
    pub logql: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl QueryArgs {
    pub fn into_request(self) -> QueryRequest {
        let mut request = QueryRequest::new(self.logql);
        if let Some(start) = self.start {
            request = request.with_start(start);
        }
        if let Some(end) = self.end {
            request = request.with_end(end);
        }
        if let Some(limit) = self.limit {
            request = request.with_limit(limit);
        }
        request
    }
}

/// Run one tool call against the query executor and render the result.
pub async fn dispatch(client: &LokiClient, call: &ToolCall) -> Result<String> {
    if call.name != TOOL_NAME {
        return Err(Error::invalid_argument(format!("unknown tool '{}'", call.name))
            .with_operation("tool::dispatch"));
    }

    let args: QueryArgs = call.parse_arguments().map_err(|e| {
        Error::completion_failed(format!("malformed tool arguments: {}", e))
            .with_operation("tool::dispatch")
            .with_context("arguments", &call.arguments)
    })?;

    tracing::debug!(logql = %args.logql, "dispatching tool call");
    let outcome = client.query(&args.into_request()).await?;
    Ok(outcome.render())
}
