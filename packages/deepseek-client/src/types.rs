//! DeepSeek API request and response types.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

// =============================================================================
// Chat Completion
// =============================================================================

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "deepseek-chat", "deepseek-reasoner")
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens in completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Response format (set to JSON mode for structured answers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }
}

impl ChatRequest {
    /// Create a new chat request with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a message to the conversation.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set all messages at once.
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request a JSON object response (DeepSeek JSON mode).
    pub fn json_mode(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Response content
    pub content: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Raw chat response from the API (for internal parsing).
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

/// Response format selector.
///
/// DeepSeek supports plain text (default) and `json_object` mode, which
/// guarantees the reply is a single valid JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    /// JSON mode.
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

// =============================================================================
// Tool Calling
// =============================================================================

/// A single turn of a tool-calling conversation.
///
/// Messages are raw JSON values because the transcript mixes plain
/// messages, assistant messages carrying `tool_calls`, and `role: "tool"`
/// replies, and the API expects them echoed back verbatim.
#[derive(Debug, Serialize)]
pub struct ToolTurnRequest {
    /// Model to use
    pub model: String,

    /// Conversation messages
    pub messages: Vec<serde_json::Value>,

    /// Tool definitions (omitted to force a plain-text answer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,

    /// Tool choice strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

impl ToolTurnRequest {
    /// Create a new tool turn with auto tool choice.
    pub fn new(
        model: impl Into<String>,
        messages: Vec<serde_json::Value>,
        tools: serde_json::Value,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Some(tools),
            tool_choice: Some("auto".to_string()),
        }
    }

    /// Create a turn without tools, so the model must answer in text.
    pub fn without_tools(model: impl Into<String>, messages: Vec<serde_json::Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
        }
    }
}

/// The assistant message returned from a tool turn.
///
/// Holds the raw message value so it can be appended to the transcript
/// unchanged, plus typed accessors for the parts callers care about.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    /// Raw assistant message (append this to the conversation history)
    pub message: serde_json::Value,
}

impl AssistantTurn {
    /// Text content of the message, if any.
    pub fn content(&self) -> Option<&str> {
        self.message.get("content").and_then(|c| c.as_str())
    }

    /// Tool calls requested by the model. Empty when the model answered in text.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.message
            .get("tool_calls")
            .and_then(|tc| tc.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(ToolCall::from_message_value)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the model wants at least one tool executed.
    pub fn wants_tools(&self) -> bool {
        self.message
            .get("tool_calls")
            .and_then(|tc| tc.as_array())
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }
}

// =============================================================================
// Utilities
// =============================================================================

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Slice out the outermost `{...}` from a response that may carry prose
/// around the JSON. Returns `None` when no braces are present.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}
