//! Conversation loop driving one discovery run.
//!
//! `ContactFinder::find` is infallible by contract: chat outages, bad
//! JSON, and dead pages all degrade into notes and empty fields on the
//! sealed `ContactResult`. The model proposes values through its final
//! JSON answer; sealing keeps only emails and phones that were actually
//! seen on a fetched page.

use std::collections::HashSet;
use std::sync::Arc;

use deepseek_client::{
    args_schema, extract_json_object, strip_code_blocks, Message, ToolCall, ToolDefinition,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{DiscoveryConfig, LocaleKeywords};
use crate::extract::{collect_phones, filter_emails, same_root_domain};
use crate::fetch::{normalize_url, PageFetcher};
use crate::search::SearchAdapter;
use crate::traits::{ChatModel, PageTransport, WebSearcher};
use crate::types::{
    Confidence, ContactQuery, ContactResult, ContactSource, CorrectedIdentity, PageFetchResult,
    ScavengeReport, SourceKind,
};

/// Progress callback; receives short human-readable phase messages.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

const CORRECTION_PROMPT: &str = "You are a data expert. Given a company name (possibly \
    misspelled) and a country hint:\n\
    1. Correct and romanize the company name.\n\
    2. Identify the country and primary language.\n\
    3. Provide translations of 'Contact' and 'Address' in that language.\n\n\
    Output JSON ONLY:\n\
    {\"corrected_name\":\"...\",\"country\":\"...\",\"language_code\":\"en\",\
    \"contact_keywords\":[\"Contact\",\"\u{130}leti\u{15f}im\"],\
    \"address_keywords\":[\"Address\",\"Adres\"]}";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a company research assistant. Find and \
    return contact info for the given company in strict JSON:\n\
    {\"email\":[],\"website\":[],\"phone\":[],\"address\":[],\
    \"company_name_english\":\"\",\"country_english\":\"\",\"country_code\":\"\"}\n\
    Use the web_search and fetch_page tools to verify every value. Return valid JSON only.";

const STOP_MESSAGE: &str = "STOP SEARCHING. Return the JSON object immediately with \
    whatever data you found. If fields are missing, use null or empty arrays.";

const REPAIR_MESSAGE: &str =
    "Your previous reply was not valid JSON. Return ONLY the JSON object, no prose, no \
    code fences.";

#[derive(Debug, Deserialize, JsonSchema)]
struct WebSearchArgs {
    /// Search query
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FetchPageArgs {
    /// URL to fetch
    url: String,
}

/// Evidence gathered while serving tool calls. Sealing trusts only what
/// is in here.
#[derive(Default)]
struct RunState {
    sources: Vec<ContactSource>,
    seen_urls: HashSet<String>,
    verified_emails: HashSet<String>,
    verified_phones: HashSet<String>,
    notes: Vec<String>,
}

impl RunState {
    /// Fold one fetch into the evidence log. Failed fetches contribute
    /// no source entry; their error rides back to the model in the tool
    /// reply instead.
    fn record(&mut self, kind: SourceKind, fetch: &PageFetchResult) {
        for email in &fetch.emails {
            self.verified_emails.insert(email.to_lowercase());
        }
        for phone in &fetch.phones {
            self.verified_phones.insert(phone.clone());
        }
        if fetch.error.is_some() {
            return;
        }
        if self.seen_urls.insert(fetch.final_url.clone()) {
            self.sources.push(ContactSource::from_fetch(kind, fetch));
        }
    }
}

/// Model's final answer, loosely parsed. Tolerates missing keys, null,
/// and a bare string where an array belongs.
#[derive(Debug, Default)]
struct RawContactAnswer {
    emails: Vec<String>,
    phones: Vec<String>,
    websites: Vec<String>,
    addresses: Vec<String>,
    company_name: Option<String>,
    country: Option<String>,
}

impl RawContactAnswer {
    fn from_value(value: &Value) -> Self {
        Self {
            emails: string_list(value, "email"),
            phones: string_list(value, "phone"),
            websites: string_list(value, "website"),
            addresses: string_list(value, "address"),
            company_name: string_field(value, "company_name_english"),
            country: string_field(value, "country_english"),
        }
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => vec![],
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Slice the JSON object out of a model reply that may carry code
/// fences or prose around it.
fn parse_answer(content: &str) -> Option<Value> {
    let stripped = strip_code_blocks(content);
    let candidate = extract_json_object(stripped)?;
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// Drives one discovery run: name correction, the tool loop, and
/// sealing. Generic over the chat, search, and transport seams.
pub struct ContactFinder<C, S, T>
where
    C: ChatModel,
    S: WebSearcher,
    T: PageTransport,
{
    chat: C,
    searcher: S,
    fetcher: PageFetcher<T>,
    config: DiscoveryConfig,
    system_prompt: Option<String>,
    progress: Option<ProgressFn>,
}

impl<C, S, T> ContactFinder<C, S, T>
where
    C: ChatModel,
    S: WebSearcher,
    T: PageTransport,
{
    pub fn new(chat: C, searcher: S, transport: T, config: DiscoveryConfig) -> Self {
        let fetcher = PageFetcher::new(Arc::new(transport), &config);
        Self {
            chat,
            searcher,
            fetcher,
            config,
            system_prompt: None,
            progress: None,
        }
    }

    /// Replace the default system prompt for the tool loop.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Register a progress callback for phase messages.
    pub fn on_progress(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// The run's shared page fetcher (and its cache).
    pub fn fetcher(&self) -> &PageFetcher<T> {
        &self.fetcher
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run one discovery. Never fails; the worst outcome is an empty
    /// low-confidence result with a note saying why.
    pub async fn find(&self, query: &ContactQuery) -> ScavengeReport {
        if query.is_empty() {
            debug!("empty company name, nothing to search");
            return ScavengeReport {
                result: ContactResult::empty("", query.country_hint.clone())
                    .with_note("empty company name, nothing to search"),
                turns_used: 0,
            };
        }

        self.progress(&format!("Analyzing company name '{}'", query.company_name));
        let identity = self.correct_identity(query).await;
        let keywords = self.config.keywords.merged_with(&identity);

        self.progress(&format!("Searching for '{}'", identity.company_name));
        let mut state = RunState::default();
        let (answer, turns_used) = self
            .run_conversation(query, &identity, &keywords, &mut state)
            .await;
        if answer.is_none() {
            state
                .notes
                .push("model did not produce a parseable final answer".to_string());
        }

        self.progress("Finalizing result");
        let raw = answer.map(|value| RawContactAnswer::from_value(&value));
        let result = self.seal(raw, &identity, state);
        debug!(confidence = ?result.confidence, turns_used, "run sealed");
        ScavengeReport { result, turns_used }
    }

    fn progress(&self, message: &str) {
        if let Some(callback) = &self.progress {
            callback(message);
        }
    }

    /// One JSON-mode call to correct the name and localize keywords.
    /// Every failure falls back to the raw input.
    async fn correct_identity(&self, query: &ContactQuery) -> CorrectedIdentity {
        let country_hint = if query.country_hint.is_empty() {
            "Unknown"
        } else {
            &query.country_hint
        };
        let messages = vec![
            Message::system(CORRECTION_PROMPT),
            Message::user(format!(
                "Company: '{}'. Country hint: {}",
                query.company_name, country_hint
            )),
        ];

        let reply = match self.chat.complete_json(&self.config.model, messages).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "name correction call failed, using raw input");
                return CorrectedIdentity::fallback(query);
            }
        };

        let stripped = strip_code_blocks(&reply);
        let candidate = extract_json_object(stripped).unwrap_or(stripped);
        match serde_json::from_str::<CorrectedIdentity>(candidate) {
            Ok(identity) if !identity.company_name.trim().is_empty() => {
                debug!(
                    corrected = %identity.company_name,
                    country = %identity.country,
                    "company name corrected"
                );
                self.progress(&format!("Corrected name: '{}'", identity.company_name));
                identity
            }
            Ok(_) => {
                warn!("name correction returned an empty name, using raw input");
                CorrectedIdentity::fallback(query)
            }
            Err(err) => {
                warn!(error = %err, "name correction reply unparseable, using raw input");
                CorrectedIdentity::fallback(query)
            }
        }
    }

    /// The tool loop plus forced termination and answer coercion.
    /// Returns the parsed final answer and the assistant turns consumed
    /// (the forced finale is not counted).
    async fn run_conversation(
        &self,
        query: &ContactQuery,
        identity: &CorrectedIdentity,
        keywords: &LocaleKeywords,
        state: &mut RunState,
    ) -> (Option<Value>, usize) {
        let system = self
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let mut transcript = vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": task_message(query, identity)}),
        ];
        let tools = tool_definitions();

        let mut turns_used = 0;
        for turn in 1..=self.config.turn_budget {
            let assistant = match self
                .chat
                .tool_turn(&self.config.model, transcript.clone(), Some(tools.clone()))
                .await
            {
                Ok(assistant) => assistant,
                Err(err) => {
                    warn!(turn, error = %err, "chat call failed, aborting tool loop");
                    state.notes.push(format!("chat call failed on turn {turn}: {err}"));
                    return (None, turns_used);
                }
            };
            turns_used = turn;

            if !assistant.wants_tools() {
                let content = assistant.content().unwrap_or_default().to_string();
                debug!(turn, "model answered without tools");
                let answer = self.coerce_answer(&content, &mut transcript).await;
                return (answer, turns_used);
            }

            transcript.push(assistant.message.clone());
            for call in assistant.tool_calls() {
                let reply = self.dispatch(&call, turn, identity, keywords, state).await;
                transcript.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": reply.to_string(),
                }));
            }
        }

        debug!(budget = self.config.turn_budget, "turn budget exhausted, forcing final answer");
        self.progress("Turn budget exhausted, forcing a final answer");
        transcript.push(json!({"role": "user", "content": STOP_MESSAGE}));
        match self
            .chat
            .tool_turn(&self.config.model, transcript.clone(), None)
            .await
        {
            Ok(finale) => {
                let content = finale.content().unwrap_or_default().to_string();
                let answer = self.coerce_answer(&content, &mut transcript).await;
                (answer, turns_used)
            }
            Err(err) => {
                warn!(error = %err, "forced final call failed");
                state.notes.push(format!("forced final call failed: {err}"));
                (None, turns_used)
            }
        }
    }

    /// Parse the final answer; on garbage, ask once for plain JSON.
    async fn coerce_answer(&self, content: &str, transcript: &mut Vec<Value>) -> Option<Value> {
        if let Some(answer) = parse_answer(content) {
            return Some(answer);
        }

        debug!("final answer was not valid JSON, asking for a repair");
        transcript.push(json!({"role": "assistant", "content": content}));
        transcript.push(json!({"role": "user", "content": REPAIR_MESSAGE}));
        match self
            .chat
            .tool_turn(&self.config.model, transcript.clone(), None)
            .await
        {
            Ok(repair) => repair.content().and_then(parse_answer),
            Err(err) => {
                warn!(error = %err, "repair call failed");
                None
            }
        }
    }

    /// Execute one tool call. Always yields a JSON value for the
    /// transcript; errors become `{"error": ...}` payloads.
    async fn dispatch(
        &self,
        call: &ToolCall,
        turn: usize,
        identity: &CorrectedIdentity,
        keywords: &LocaleKeywords,
        state: &mut RunState,
    ) -> Value {
        match call.name.as_str() {
            "web_search" => {
                let args: WebSearchArgs = match call.parse_args() {
                    Ok(args) => args,
                    Err(err) => return json!({"error": format!("invalid web_search arguments: {err}")}),
                };
                debug!(turn, query = %args.query, "dispatching web_search");
                self.progress(&format!("Turn {turn}: searching '{}'", args.query));
                let adapter = SearchAdapter::new(
                    &self.searcher,
                    &self.fetcher,
                    &self.config.search,
                    &self.config.extract,
                );
                let reply = adapter.run_search(&args.query, identity, keywords).await;
                for fetch in &reply.fetches {
                    state.record(fetch.kind, &fetch.result);
                }
                reply.reply
            }
            "fetch_page" => {
                let args: FetchPageArgs = match call.parse_args() {
                    Ok(args) => args,
                    Err(err) => return json!({"error": format!("invalid fetch_page arguments: {err}")}),
                };
                if self.config.search.is_blocklisted_url(&args.url) {
                    debug!(turn, url = %args.url, "refusing to fetch blocklisted url");
                    return json!({"error": "Domain is blocklisted; use a different source."});
                }
                debug!(turn, url = %args.url, "dispatching fetch_page");
                self.progress(&format!("Turn {turn}: fetching '{}'", args.url));
                let result = self.fetcher.fetch(&args.url, keywords).await;
                state.record(SourceKind::Page, &result);
                serde_json::to_value(&result).unwrap_or_else(|err| {
                    json!({"error": format!("could not serialize fetch result: {err}")})
                })
            }
            other => {
                warn!(turn, tool = %other, "model requested an unknown tool");
                json!({"error": "Unknown tool"})
            }
        }
    }

    /// Seal the run: keep only verified emails/phones, enforce the
    /// contact-page root-domain rule, grade confidence from evidence.
    fn seal(
        &self,
        raw: Option<RawContactAnswer>,
        identity: &CorrectedIdentity,
        state: RunState,
    ) -> ContactResult {
        let extract = &self.config.extract;
        let mut notes = state.notes;
        let raw = raw.unwrap_or_default();

        let candidates = filter_emails(raw.emails, extract);
        let before = candidates.len();
        let emails: Vec<String> = candidates
            .into_iter()
            .filter(|email| state.verified_emails.contains(&email.to_lowercase()))
            .collect();
        let dropped = before - emails.len();
        if dropped > 0 {
            debug!(dropped, "dropped unverified emails from the final answer");
            notes.push(format!("dropped {dropped} unverified email(s)"));
        }

        let candidates = collect_phones(raw.phones, extract);
        let before = candidates.len();
        let phones: Vec<String> = candidates
            .into_iter()
            .filter(|phone| state.verified_phones.contains(phone))
            .collect();
        let dropped = before - phones.len();
        if dropped > 0 {
            debug!(dropped, "dropped unverified phones from the final answer");
            notes.push(format!("dropped {dropped} unverified phone(s)"));
        }

        let website = raw
            .websites
            .iter()
            .find_map(|candidate| normalize_url(candidate).ok())
            .or_else(|| {
                state
                    .sources
                    .iter()
                    .find(|source| source.kind == SourceKind::Website)
                    .and_then(|source| normalize_url(&source.url).ok())
            });

        let contact_candidate = state
            .sources
            .iter()
            .find(|source| source.kind == SourceKind::ContactPage)
            .and_then(|source| normalize_url(&source.url).ok());
        let contact_page = match (&website, contact_candidate) {
            (Some(site), Some(page)) if same_root_domain(site, &page) => Some(page),
            (_, Some(page)) => {
                debug!(page = %page, "contact page dropped, not on the website's root domain");
                None
            }
            _ => None,
        };

        let address = raw
            .addresses
            .iter()
            .map(|candidate| candidate.trim())
            .find(|candidate| !candidate.is_empty())
            .map(str::to_string)
            .or_else(|| {
                state
                    .sources
                    .iter()
                    .find_map(|source| source.address_snippet.clone())
            });

        let confidence =
            Confidence::grade(!emails.is_empty(), !phones.is_empty(), address.is_some());

        let company_name = raw
            .company_name
            .unwrap_or_else(|| identity.company_name.clone());
        let country = raw.country.unwrap_or_else(|| identity.country.clone());

        ContactResult {
            company_name,
            country,
            website,
            contact_page,
            emails,
            phones,
            address,
            sources: state.sources,
            confidence,
            notes: if notes.is_empty() {
                None
            } else {
                Some(notes.join("; "))
            },
        }
    }
}

/// The user message opening the tool loop.
fn task_message(query: &ContactQuery, identity: &CorrectedIdentity) -> String {
    let mut task = format!(
        "Find contact info for the company '{}'",
        identity.company_name
    );
    if identity.company_name != query.company_name {
        task.push_str(&format!(" (original name: '{}')", query.company_name));
    }
    if !identity.country.is_empty() {
        task.push_str(&format!(" located in '{}'", identity.country));
    }
    task.push('.');
    task
}

/// The two tools the model may call, in the chat API's wire format.
fn tool_definitions() -> Value {
    let web_search = ToolDefinition {
        name: "web_search".to_string(),
        description: "Search the internet for company contact details, websites, emails, phones."
            .to_string(),
        parameters: args_schema::<WebSearchArgs>(),
    };
    let fetch_page = ToolDefinition {
        name: "fetch_page".to_string(),
        description: "Fetch a webpage and extract contact info. Auto-follows contact page links."
            .to_string(),
        parameters: args_schema::<FetchPageArgs>(),
    };
    json!([web_search.to_api_format(), fetch_page.to_api_format()])
}
