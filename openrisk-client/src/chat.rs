//! Chat-completions endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ProviderClient;
use crate::error::{ClientError, Result};

/// One prompt message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Anything that can turn prompt messages into generated text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Whether a credential is configured
    fn has_api_key(&self) -> bool;

    /// Returns the first choice's content, or an empty string if there is none
    async fn complete(&self, messages: Vec<ChatMessage>, temperature: f64) -> Result<String>;
}

#[async_trait]
impl CompletionProvider for ProviderClient {
    fn has_api_key(&self) -> bool {
        ProviderClient::has_api_key(self)
    }

    async fn complete(&self, messages: Vec<ChatMessage>, temperature: f64) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(ClientError::MissingApiKey)?;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Requesting completion from {} (model {}, {} message(s))",
            url,
            self.model,
            messages.len()
        );

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let body: ChatCompletionResponse = self.handle_response(response).await.inspect_err(|e| {
            warn!("Completion request failed: {}", e);
        })?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
