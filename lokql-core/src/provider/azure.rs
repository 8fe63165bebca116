//! Azure OpenAI provider implementation
//!
//! Azure speaks the same chat-completions wire format as OpenAI, but the
//! request goes to a deployment-scoped URL with an `api-version` query
//! parameter and authenticates with an `api-key` header instead of a
//! Bearer token.

use lokql_error::{Error, Result};
use reqwest::Client;

use super::openai::{from_wire_response, to_wire_request, WireResponse};
use super::{api_error, CompletionRequest, CompletionResponse, LlmProvider};
use crate::config::ProviderConfig;

/// Azure OpenAI provider, addressing a single deployment
#[derive(Debug)]
pub struct AzureProvider {
    client: Client,
    config: ProviderConfig,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl AzureProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let endpoint = config
            .base_url
            .as_deref()
            .ok_or_else(|| Error::config_missing("AZURE_OPENAI_ENDPOINT"))?
            .trim_end_matches('/')
            .to_string();
        let deployment = config
            .deployment
            .clone()
            .ok_or_else(|| Error::config_missing("AZURE_OPENAI_DEPLOYMENT_NAME"))?;
        let api_version = config
            .api_version
            .clone()
            .unwrap_or_else(|| "2024-06-01".to_string());

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.unwrap_or(120)))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            config,
            endpoint,
            deployment,
            api_version,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

impl LlmProvider for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn default_model(&self) -> &str {
        // Azure routes by deployment name; the model field is informational.
        self.config.model.as_deref().unwrap_or(&self.deployment)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.as_deref().unwrap_or(self.default_model());
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let api_request = to_wire_request(model, temperature, &request);

        let url = self.completions_url();
        let mut req = self
            .client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            req = req.header("api-key", api_key);
        }

        let response = req.send().await.map_err(|e| {
            Error::provider_unavailable(e.to_string())
                .with_operation("provider::complete")
                .with_context("url", &url)
                .set_source(e)
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, text).with_operation("provider::complete"));
        }

        let api_response: WireResponse = response.json().await.map_err(|e| {
            Error::parse_failed(format!("invalid completion body: {}", e))
                .with_operation("provider::complete")
                .set_source(e)
        })?;

        from_wire_response(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_url() {
        let config = ProviderConfig::azure("https://example.openai.azure.com/", "key", "gpt-4o");
        let provider = AzureProvider::new(config).unwrap();
        assert_eq!(
            provider.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions"
        );
        assert_eq!(provider.default_model(), "gpt-4o");
    }

    #[test]
    fn test_missing_deployment_rejected() {
        let mut config = ProviderConfig::azure("https://example.openai.azure.com", "key", "gpt-4o");
        config.deployment = None;
        let err = AzureProvider::new(config).unwrap_err();
        assert_eq!(err.kind(), lokql_error::ErrorKind::ConfigMissing);
    }
}
