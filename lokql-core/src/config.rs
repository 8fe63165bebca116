//! Process configuration, read once at startup.
//!
//! Nothing outside this module touches the environment. `Config::from_env`
//! builds the whole configuration up front; components receive it by
//! reference and treat it as immutable for the process lifetime.

use lokql_error::{Error, Result};

/// Default Loki endpoint, matching a local single-binary install.
pub const DEFAULT_LOKI_URL: &str = "http://localhost:3100";

/// Default timeout for the Loki range-query call, in seconds.
pub const DEFAULT_LOKI_TIMEOUT_SECS: u64 = 30;

/// Log backend endpoint configuration.
#[derive(Debug, Clone)]
pub struct LokiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Which LLM backend to talk to.
///
/// This is an explicit, validated choice (`LOKQL_PROVIDER`); it is never
/// inferred from which credentials happen to be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Local Ollama, which speaks the OpenAI-compatible API
    Ollama,
    /// Hosted OpenAI (or any OpenAI-compatible endpoint with Bearer auth)
    OpenAi,
    /// Azure OpenAI deployment
    Azure,
}

/// Configuration for creating a provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Azure deployment name
    pub deployment: Option<String>,
    /// Azure API version
    pub api_version: Option<String>,
    pub temperature: f32,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn ollama() -> Self {
        Self {
            provider_type: ProviderType::Ollama,
            api_key: None,
            base_url: Some("http://localhost:11434/v1".into()),
            model: Some("llama3.2".into()),
            deployment: None,
            api_version: None,
            temperature: 0.0,
            timeout_secs: Some(120),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAi,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            model: Some("gpt-4o".into()),
            deployment: None,
            api_version: None,
            temperature: 0.0,
            timeout_secs: Some(120),
        }
    }

    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            provider_type: ProviderType::Azure,
            api_key: Some(api_key.into()),
            base_url: Some(endpoint.into()),
            model: None,
            deployment: Some(deployment.into()),
            api_version: Some("2024-06-01".into()),
            temperature: 0.0,
            timeout_secs: Some(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Top-level configuration for one lokql process.
#[derive(Debug, Clone)]
pub struct Config {
    pub loki: LokiConfig,
    pub llm: ProviderConfig,
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary lookup function.
    ///
    /// Kept separate from `from_env` so tests never mutate process-global
    /// state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let loki = LokiConfig {
            base_url: get("LOKI_URL")
                .unwrap_or_else(|| DEFAULT_LOKI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: match get("LOKI_TIMEOUT_SECS") {
                Some(raw) => raw.parse().map_err(|_| {
                    Error::config_invalid(format!("LOKI_TIMEOUT_SECS must be an integer, got '{}'", raw))
                })?,
                None => DEFAULT_LOKI_TIMEOUT_SECS,
            },
        };

        let choice = get("LOKQL_PROVIDER").ok_or_else(|| {
            Error::config_missing("LOKQL_PROVIDER")
                .with_operation("config::from_env")
                .with_context("expected", "one of: ollama, openai, azure")
        })?;

        let mut llm = match choice.to_ascii_lowercase().as_str() {
            "ollama" => {
                let mut cfg = ProviderConfig::ollama();
                if let Some(url) = get("OLLAMA_BASE_URL") {
                    cfg = cfg.with_base_url(url);
                }
                cfg
            }
            "openai" => {
                let api_key = get("OPENAI_API_KEY")
                    .ok_or_else(|| Error::config_missing("OPENAI_API_KEY"))?;
                let mut cfg = ProviderConfig::openai(api_key);
                if let Some(url) = get("OPENAI_BASE_URL") {
                    cfg = cfg.with_base_url(url);
                }
                cfg
            }
            "azure" => {
                let endpoint = get("AZURE_OPENAI_ENDPOINT")
                    .ok_or_else(|| Error::config_missing("AZURE_OPENAI_ENDPOINT"))?;
                let api_key = get("AZURE_OPENAI_API_KEY")
                    .ok_or_else(|| Error::config_missing("AZURE_OPENAI_API_KEY"))?;
                let deployment = get("AZURE_OPENAI_DEPLOYMENT_NAME")
                    .ok_or_else(|| Error::config_missing("AZURE_OPENAI_DEPLOYMENT_NAME"))?;
                let mut cfg = ProviderConfig::azure(endpoint, api_key, deployment);
                if let Some(version) = get("AZURE_OPENAI_API_VERSION") {
                    cfg.api_version = Some(version);
                }
                cfg
            }
            other => {
                return Err(Error::config_invalid(format!(
                    "LOKQL_PROVIDER must be one of ollama, openai, azure; got '{}'",
                    other
                ))
                .with_operation("config::from_env"));
            }
        };

        if let Some(model) = get("LOKQL_MODEL") {
            llm = llm.with_model(model);
        }
        if let Some(raw) = get("LOKQL_TEMPERATURE") {
            let temperature: f32 = raw.parse().map_err(|_| {
                Error::config_invalid(format!("LOKQL_TEMPERATURE must be a number, got '{}'", raw))
            })?;
            llm = llm.with_temperature(temperature);
        }

        Ok(Config { loki, llm })
    }
}
