use super::content_provider::ContentProvider;
use super::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API implementation
pub struct AnthropicContentProvider {
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl AnthropicContentProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            http_client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ContentProvider for AnthropicContentProvider {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u16,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let payload = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "system": system,
            "messages": [
                {"role": "user", "content": user}
            ],
        });

        let response = self
            .http_client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model = %self.model, error = %e, "Anthropic request failed");
                ProviderError::Api(format!("Anthropic request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api(format!(
                "Anthropic error {}: {}",
                status, error_text
            )));
        }

        let body: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Anthropic response: {}", e))
        })?;

        body.content
            .first()
            .map(|block| block.text.clone())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("message contained no text content".to_string())
            })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
