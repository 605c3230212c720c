// Mock implementations for testing
//
// Scripted fakes for the three infrastructure seams. Each mock records
// its calls behind a Mutex and hands out queued responses, so tests can
// drive a whole discovery run without touching the network. Clones
// share state; keep a clone to assert on calls after the mock has been
// moved into the system under test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deepseek_client::{AssistantTurn, Message};
use serde_json::json;

use crate::error::{FetchError, FetchResult, Result, ScavengeError};
use crate::traits::{ChatModel, HttpPage, PageTransport, WebSearcher};
use crate::types::SearchHit;

// =============================================================================
// Mock Chat Model
// =============================================================================

/// One scripted assistant turn.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// JSON-mode reply (served to `complete_json`)
    Json(String),
    /// Plain-text answer, which ends the tool loop
    Content(String),
    /// Requested tool calls as (tool name, arguments JSON) pairs
    ToolCalls(Vec<(String, String)>),
    /// A failed chat call
    Fail(String),
}

/// Recorded chat call.
#[derive(Debug, Clone)]
pub enum ChatModelCall {
    CompleteJson { messages: Vec<Message> },
    ToolTurn { with_tools: bool, message_count: usize },
}

#[derive(Clone)]
pub struct MockChatModel {
    json_replies: Arc<Mutex<Vec<ScriptedTurn>>>,
    turns: Arc<Mutex<Vec<ScriptedTurn>>>,
    finales: Arc<Mutex<Vec<ScriptedTurn>>>,
    loop_last_turn: bool,
    calls: Arc<Mutex<Vec<ChatModelCall>>>,
    next_call_id: Arc<AtomicUsize>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            json_replies: Arc::new(Mutex::new(Vec::new())),
            turns: Arc::new(Mutex::new(Vec::new())),
            finales: Arc::new(Mutex::new(Vec::new())),
            loop_last_turn: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            next_call_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Queue a JSON-mode reply for `complete_json`.
    pub fn with_json(self, reply: impl Into<String>) -> Self {
        self.json_replies
            .lock()
            .unwrap()
            .push(ScriptedTurn::Json(reply.into()));
        self
    }

    /// Queue a failing `complete_json` call.
    pub fn with_json_failure(self, message: impl Into<String>) -> Self {
        self.json_replies
            .lock()
            .unwrap()
            .push(ScriptedTurn::Fail(message.into()));
        self
    }

    /// Queue a tool-loop turn.
    pub fn with_turn(self, turn: ScriptedTurn) -> Self {
        self.turns.lock().unwrap().push(turn);
        self
    }

    /// Queue a turn requesting a single tool call.
    pub fn with_tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        self.with_turn(ScriptedTurn::ToolCalls(vec![(
            name.to_string(),
            arguments.to_string(),
        )]))
    }

    /// Queue a plain-text turn, ending the tool loop.
    pub fn with_final_content(self, content: impl Into<String>) -> Self {
        self.with_turn(ScriptedTurn::Content(content.into()))
    }

    /// Queue a reply for a forced toolless call.
    pub fn with_finale(self, content: impl Into<String>) -> Self {
        self.finales
            .lock()
            .unwrap()
            .push(ScriptedTurn::Content(content.into()));
        self
    }

    /// Keep serving the last queued turn instead of consuming it.
    /// Budget-exhaustion tests script one `ToolCalls` turn and loop it.
    pub fn looping_last_turn(mut self) -> Self {
        self.loop_last_turn = true;
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ChatModelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Recorded tool-loop turns (toolless finale calls excluded).
    pub fn tool_turn_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, ChatModelCall::ToolTurn { with_tools: true, .. }))
            .count()
    }

    fn assistant_turn(&self, turn: ScriptedTurn) -> Result<AssistantTurn> {
        match turn {
            ScriptedTurn::Content(text) | ScriptedTurn::Json(text) => Ok(AssistantTurn {
                message: json!({"role": "assistant", "content": text}),
            }),
            ScriptedTurn::ToolCalls(calls) => {
                let tool_calls: Vec<serde_json::Value> = calls
                    .into_iter()
                    .map(|(name, arguments)| {
                        let id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
                        json!({
                            "id": format!("call_{id}"),
                            "type": "function",
                            "function": {"name": name, "arguments": arguments}
                        })
                    })
                    .collect();
                Ok(AssistantTurn {
                    message: json!({
                        "role": "assistant",
                        "content": null,
                        "tool_calls": tool_calls
                    }),
                })
            }
            ScriptedTurn::Fail(message) => Err(ScavengeError::Chat(message.into())),
        }
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete_json(&self, _model: &str, messages: Vec<Message>) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(ChatModelCall::CompleteJson { messages });

        let mut queue = self.json_replies.lock().unwrap();
        if queue.is_empty() {
            return Err(ScavengeError::Chat("no scripted JSON reply".into()));
        }
        match queue.remove(0) {
            ScriptedTurn::Json(s) | ScriptedTurn::Content(s) => Ok(s),
            ScriptedTurn::Fail(message) => Err(ScavengeError::Chat(message.into())),
            ScriptedTurn::ToolCalls(_) => {
                Err(ScavengeError::Chat("tool calls scripted for a JSON call".into()))
            }
        }
    }

    async fn tool_turn(
        &self,
        _model: &str,
        messages: Vec<serde_json::Value>,
        tools: Option<serde_json::Value>,
    ) -> Result<AssistantTurn> {
        self.calls.lock().unwrap().push(ChatModelCall::ToolTurn {
            with_tools: tools.is_some(),
            message_count: messages.len(),
        });

        let turn = if tools.is_some() {
            let mut queue = self.turns.lock().unwrap();
            if queue.is_empty() {
                return Err(ScavengeError::Chat("no scripted turn".into()));
            }
            if queue.len() == 1 && self.loop_last_turn {
                queue[0].clone()
            } else {
                queue.remove(0)
            }
        } else {
            let mut queue = self.finales.lock().unwrap();
            if queue.is_empty() {
                return Err(ScavengeError::Chat("no scripted finale".into()));
            }
            queue.remove(0)
        };

        self.assistant_turn(turn)
    }
}

// =============================================================================
// Mock Web Searcher
// =============================================================================

#[derive(Clone)]
pub struct MockWebSearcher {
    hits: Arc<Mutex<HashMap<String, Vec<SearchHit>>>>,
    failing: Arc<Mutex<Vec<String>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(Vec::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the hits for an exact query. Unknown queries get no hits.
    pub fn with_hits(self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.hits.lock().unwrap().insert(query.into(), hits);
        self
    }

    /// Make an exact query fail with a provider error.
    pub fn fail_query(self, query: impl Into<String>) -> Self {
        self.failing.lock().unwrap().push(query.into());
        self
    }

    /// All queries searched, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockWebSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());

        if self.failing.lock().unwrap().iter().any(|q| q == query) {
            return Err(ScavengeError::Search("scripted search failure".into()));
        }

        let hits = self
            .hits
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        Ok(hits.into_iter().take(max_results).collect())
    }
}

// =============================================================================
// Mock Page Transport
// =============================================================================

#[derive(Debug, Clone)]
enum ScriptedResponse {
    Page { status: u16, body: String },
    Timeout,
}

/// Scripted transport keyed by exact URL.
///
/// Each URL holds a response queue; the last entry repeats forever, so
/// `.with_status(u, 503).with_status(u, 503).with_page(u, body)` scripts
/// two failures and then a stable success. Unknown URLs answer 404.
#[derive(Clone)]
pub struct MockTransport {
    scripts: Arc<Mutex<HashMap<String, Vec<ScriptedResponse>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a 200 response with the given body.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.push(url, ScriptedResponse::Page {
            status: 200,
            body: body.into(),
        });
        self
    }

    /// Queue an empty response with the given status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.push(url, ScriptedResponse::Page {
            status,
            body: String::new(),
        });
        self
    }

    /// Queue a transport timeout.
    pub fn with_timeout(self, url: impl Into<String>) -> Self {
        self.push(url, ScriptedResponse::Timeout);
        self
    }

    fn push(&self, url: impl Into<String>, response: ScriptedResponse) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push(response);
    }

    /// All URLs fetched, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// How many times one URL was fetched.
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageTransport for MockTransport {
    async fn get(&self, url: &str) -> FetchResult<HttpPage> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(url) else {
            return Ok(HttpPage {
                final_url: url.to_string(),
                status: 404,
                body: String::new(),
            });
        };

        let response = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or(ScriptedResponse::Page {
                status: 404,
                body: String::new(),
            })
        };

        match response {
            ScriptedResponse::Page { status, body } => Ok(HttpPage {
                final_url: url.to_string(),
                status,
                body,
            }),
            ScriptedResponse::Timeout => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}
