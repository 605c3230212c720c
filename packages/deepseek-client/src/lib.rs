//! Pure DeepSeek REST API client
//!
//! A clean, minimal client for DeepSeek's OpenAI-compatible chat API with no
//! domain-specific logic. Supports chat completions, JSON mode, and function
//! calling (tool use).
//!
//! # Example
//!
//! ```rust,ignore
//! use deepseek_client::{DeepSeekClient, ChatRequest, Message};
//!
//! let client = DeepSeekClient::from_env()?;
//!
//! // Chat completion
//! let response = client.chat_completion(ChatRequest {
//!     model: "deepseek-chat".into(),
//!     messages: vec![Message::user("Hello!")],
//!     ..Default::default()
//! }).await?;
//!
//! // JSON mode
//! let json = client.chat_completion(
//!     ChatRequest::new("deepseek-chat")
//!         .message(Message::user("Return {\"ok\": true}"))
//!         .json_mode(),
//! ).await?;
//! ```
//!
//! # Tool Calling
//!
//! ```rust,ignore
//! use deepseek_client::ToolTurnRequest;
//!
//! let turn = client.tool_turn(ToolTurnRequest::new(
//!     "deepseek-chat",
//!     messages,
//!     serde_json::json!([search_def.to_api_format()]),
//! )).await?;
//!
//! for call in turn.tool_calls() {
//!     // dispatch, then push a {"role": "tool", ...} message
//! }
//! ```

pub mod error;
pub mod secret;
pub mod tool;
pub mod types;

pub use error::{DeepSeekError, Result};
pub use secret::SecretString;
pub use tool::{args_schema, ToolCall, ToolDefinition};
pub use types::*;

use reqwest::Client;
use tracing::{debug, warn};

/// Default API endpoint. DeepSeek serves the OpenAI wire format here.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Pure DeepSeek API client.
#[derive(Clone)]
pub struct DeepSeekClient {
    http_client: Client,
    api_key: SecretString,
    base_url: String,
}

impl DeepSeekClient {
    /// Create a new DeepSeek client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: SecretString::new(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `DEEPSEEK_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .map_err(|_| DeepSeekError::Config("DEEPSEEK_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies or compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a custom HTTP client (e.g., with timeouts configured).
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Send messages to the chat completion API and get a response.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "DeepSeek request failed");
                DeepSeekError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "DeepSeek API error");
            return Err(DeepSeekError::Api(format!(
                "DeepSeek API error: {}",
                error_text
            )));
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| DeepSeekError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DeepSeekError::Api("No response from DeepSeek".into()))?
            .message
            .content
            .unwrap_or_default();

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "DeepSeek chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: chat_response.usage,
        })
    }

    /// One turn of a tool-calling conversation.
    ///
    /// Sends the transcript with tool definitions and returns the raw
    /// assistant message; the caller decides how to dispatch tool calls
    /// and when to loop.
    pub async fn tool_turn(&self, request: ToolTurnRequest) -> Result<AssistantTurn> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "DeepSeek tool turn failed");
                DeepSeekError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "DeepSeek tools API error");
            return Err(DeepSeekError::Api(format!(
                "DeepSeek tools API error: {}",
                error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DeepSeekError::Parse(e.to_string()))?;

        let message = response_json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .cloned()
            .ok_or_else(|| DeepSeekError::Parse("No message in response".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "DeepSeek tool turn"
        );

        Ok(AssistantTurn { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = DeepSeekClient::new("sk-test").with_base_url("https://custom.api.com");

        assert_eq!(client.api_key.expose(), "sk-test");
        assert_eq!(client.base_url, "https://custom.api.com");
    }

    #[test]
    fn test_default_base_url() {
        let client = DeepSeekClient::new("sk-test");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }
}
