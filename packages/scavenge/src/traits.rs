// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE seams only - no discovery logic. The
// orchestrator, search adapter, and page fetcher are generic over these
// traits so tests can swap in scripted fakes without touching the network.

use async_trait::async_trait;
use deepseek_client::{AssistantTurn, ChatRequest, DeepSeekClient, Message, ToolTurnRequest};

use crate::error::{FetchResult, Result, ScavengeError};
use crate::types::SearchHit;

// =============================================================================
// Chat Model (LLM provider)
// =============================================================================

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a conversation in JSON mode (returns the raw JSON string).
    /// Parse with serde_json::from_str in calling code.
    async fn complete_json(&self, model: &str, messages: Vec<Message>) -> Result<String>;

    /// One turn of a tool-calling conversation.
    ///
    /// `tools` is the JSON array of tool definitions; pass `None` to
    /// withhold the tools and force a plain-text answer.
    async fn tool_turn(
        &self,
        model: &str,
        messages: Vec<serde_json::Value>,
        tools: Option<serde_json::Value>,
    ) -> Result<AssistantTurn>;
}

/// `DeepSeekClient` is the production chat model.
#[async_trait]
impl ChatModel for DeepSeekClient {
    async fn complete_json(&self, model: &str, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest::new(model).messages(messages).json_mode();
        let response = self
            .chat_completion(request)
            .await
            .map_err(|e| ScavengeError::Chat(Box::new(e)))?;
        Ok(response.content)
    }

    async fn tool_turn(
        &self,
        model: &str,
        messages: Vec<serde_json::Value>,
        tools: Option<serde_json::Value>,
    ) -> Result<AssistantTurn> {
        let request = match tools {
            Some(tools) => ToolTurnRequest::new(model, messages, tools),
            None => ToolTurnRequest::without_tools(model, messages),
        };
        // Inherent method on the client, not this trait method.
        DeepSeekClient::tool_turn(self, request)
            .await
            .map_err(|e| ScavengeError::Chat(Box::new(e)))
    }
}

// =============================================================================
// Web Searcher (search provider)
// =============================================================================

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run a web search and return raw hits in provider order.
    ///
    /// Implementations truncate to `max_results` and never score or
    /// filter; ranking belongs to the search adapter.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

// =============================================================================
// Page Transport (raw HTTP)
// =============================================================================

/// One raw HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpPage {
    /// URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,
}

impl HttpPage {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Issue a single GET for `url`.
    ///
    /// Any HTTP response comes back as `Ok(HttpPage)`, non-success
    /// statuses included; `Err` is reserved for transport-level failures
    /// (timeout, connect, invalid URL). Retry policy lives in the
    /// fetcher, not here.
    async fn get(&self, url: &str) -> FetchResult<HttpPage>;
}
