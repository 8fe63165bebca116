//! Agent implementation - orchestrates the LLM <-> query-tool loop

use lokql_core::config::Config;
use lokql_core::loki::LokiClient;
use lokql_core::provider::{ChatMessage, CompletionRequest, Provider};
use lokql_core::tool;
use lokql_error::{Error, Result};

/// System prompt steering the model toward valid LogQL and honest summaries.
pub const SYSTEM_PROMPT: &str = "You are an expert log analyst connected to Grafana Loki. \
Understand the user's question about their logs, translate it into an accurate LogQL query, \
and call the 'query_loki_logs' tool to fetch results. \
Always include relevant stream selectors in your queries (e.g. {job=\"nginx\"} or {namespace=\"prod\"}). \
The default time window is the last hour; pass explicit start/end values when the user asks for a \
different range. For counts, rates, or top-N questions, use Loki aggregation functions such as \
count_over_time, rate, or sum by. If a query returns too many results, refine it with more specific \
labels or filters. Present results clearly and summarize key findings; if no logs are found, say so \
plainly. Respond in Markdown.";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Print tool activity to stdout as it happens
    pub verbose: bool,
    /// Upper bound on tool rounds within one user turn
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_tool_rounds: 8,
        }
    }
}

/// The agent orchestrator - owns the provider, the query executor, and the
/// conversation transcript. Strictly sequential: one turn at a time.
pub struct Agent {
    provider: Provider,
    loki: LokiClient,
    transcript: Vec<ChatMessage>,
    config: AgentConfig,
}

impl Agent {
    /// Create an agent from process configuration with default settings
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_config(config, AgentConfig::default())
    }

    /// Create an agent with custom settings
    pub fn with_config(config: &Config, agent_config: AgentConfig) -> Result<Self> {
        Ok(Self {
            provider: Provider::from_config(&config.llm)?,
            loki: LokiClient::new(&config.loki),
            transcript: vec![ChatMessage::system(SYSTEM_PROMPT)],
            config: agent_config,
        })
    }

    /// Name of the configured provider ("ollama", "openai", "azure")
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Number of messages accumulated in the transcript
    pub fn transcript_len(&self) -> usize {
        self.transcript.len()
    }

    /// Run one user turn to completion.
    ///
    /// The model may invoke the query tool any number of times up to
    /// `max_tool_rounds`; query failures are fed back as tool-result text so
    /// the model can explain them, while provider failures propagate to the
    /// caller.
    pub async fn ask(&mut self, input: &str) -> Result<String> {
        self.transcript.push(ChatMessage::user(input));

        for round in 0..self.config.max_tool_rounds {
            let request = CompletionRequest::new(self.transcript.clone())
                .with_tools(vec![tool::definition()]);

            let response = self.provider.complete(request).await?;

            if response.tool_calls.is_empty() {
                let content = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| {
                        Error::completion_failed("model returned an empty answer")
                            .with_operation("agent::ask")
                    })?;
                self.transcript.push(ChatMessage::assistant(&content));
                return Ok(content);
            }

            tracing::debug!(round, calls = response.tool_calls.len(), "handling tool calls");
            self.transcript.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                if self.config.verbose {
                    println!("   tool_call: {}({})", call.name, call.arguments);
                }

                let result_text = match tool::dispatch(&self.loki, call).await {
                    Ok(text) => text,
                    // The model sees the failure and explains it to the user.
                    Err(e) => format!("Tool error: {}", e),
                };

                if self.config.verbose {
                    println!("   -> {} chars", result_text.len());
                }
                self.transcript.push(ChatMessage::tool_result(&call.id, result_text));
            }
        }

        Err(Error::completion_failed(format!(
            "no final answer after {} tool rounds",
            self.config.max_tool_rounds
        ))
        .with_operation("agent::ask"))
    }
}
