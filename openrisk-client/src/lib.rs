//! OpenRisk Provider Client
//!
//! A small, type-safe HTTP client for an OpenAI-compatible chat-completions
//! provider, used by the advisory and RAG endpoints.
//!
//! The client only forwards prompts and returns the generated text. It holds
//! no conversation state.
//!
//! # Example
//!
//! ```no_run
//! use openrisk_client::{ChatMessage, CompletionProvider, ProviderClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), openrisk_client::ClientError> {
//!     let client = ProviderClient::new(
//!         "https://dashscope.aliyuncs.com/compatible-mode/v1",
//!         Some("sk-...".to_string()),
//!         "qwen3-max",
//!     );
//!
//!     let answer = client
//!         .complete(vec![ChatMessage::user("Summarise this repo")], 0.2)
//!         .await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

mod chat;
pub mod error;

// Re-export commonly used types
pub use chat::{ChatMessage, CompletionProvider};
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the text-generation provider
#[derive(Debug, Clone)]
pub struct ProviderClient {
    /// Base URL of the provider (e.g., "https://api.example.com/v1")
    base_url: String,
    /// Bearer credential; `None` makes every call fail with `MissingApiKey`
    api_key: Option<String>,
    /// Model identifier sent with every request
    model: String,
    /// HTTP client instance
    client: Client,
}

impl ProviderClient {
    /// Create a new provider client
    ///
    /// # Arguments
    /// * `base_url` - Provider base URL, without the `/chat/completions` suffix
    /// * `api_key` - Bearer credential, if configured
    /// * `model` - Model identifier
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, model, Client::new())
    }

    /// Create a new provider client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            client,
        }
    }

    /// Get the base URL of the provider
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle a provider response and deserialize JSON
    ///
    /// Error statuses become [`ClientError::ApiError`] carrying the provider's
    /// own error message when it sent one.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(
                status.as_u16(),
                provider_error_message(&body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Extracts a readable message from a provider error body
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` or plain text;
/// falls back to `llm_failed`.
fn provider_error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| match json.get("error") {
            Some(serde_json::Value::String(msg)) => Some(msg.clone()),
            Some(serde_json::Value::Object(obj)) => obj
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        });

    match from_json {
        Some(msg) if !msg.is_empty() => msg,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => "llm_failed".to_string(),
    }
}
