use super::ProviderError;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Port for LLM chat-completion vendors. One call, one completion; retries
/// and fallback live in the content service.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u16,
        temperature: f32,
    ) -> Result<String, ProviderError>;

    fn model(&self) -> &str;
}

/// OpenAI chat completions implementation
pub struct OpenAiContentProvider {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiContentProvider {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl ContentProvider for OpenAiContentProvider {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u16,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(max_tokens)
            .temperature(temperature)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| ProviderError::Api(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| ProviderError::Api(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!(model = %self.model, error = %e, "OpenAI chat completion failed");
            ProviderError::Api(format!("OpenAI error: {}", e))
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("completion contained no content".to_string())
            })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
