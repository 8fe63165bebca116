//! # lokql-core
//!
//! The working parts of lokql: configuration, time-range parsing, the Loki
//! query executor, and the LLM provider layer.
//!
//! ## Core Concepts
//! - **Config**: one explicit struct built from the environment at startup
//! - **LokiClient**: a single range-query request per invocation, rendered
//!   deterministically
//! - **Provider**: trait-based LLM communication (OpenAI-compatible, Azure)
//! - **Tool**: the one capability (`query_loki_logs`) exposed to the model

pub mod config;
pub mod loki;
pub mod provider;
pub mod timerange;
pub mod tool;

pub use config::{Config, LokiConfig, ProviderConfig, ProviderType};
pub use loki::{
    Direction, LogEntry, LokiClient, MetricSample, MetricSeries, QueryOutcome, QueryRequest,
    DEFAULT_INTERVAL, DEFAULT_LIMIT, MAX_LIMIT, NO_RESULTS_TEXT,
};
pub use provider::{
    AzureProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAiProvider, Provider, Role, ToolCall, ToolDefinition, Usage,
};
pub use timerange::TimeWindow;
