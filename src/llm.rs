use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }
}

/// Anything that can answer a chat transcript.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> anyhow::Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice; a missing or null content reads as empty.
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

/// OpenAI-compatible chat-completions client.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    completions_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// `LLM_BASE_URL`, `LLM_MODEL`, and `LLM_API_KEY` (or `OPENAI_API_KEY`).
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = dotenv::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = dotenv::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = ["LLM_API_KEY", "OPENAI_API_KEY"]
            .into_iter()
            .find_map(|name| dotenv::var(name).ok().filter(|k| !k.trim().is_empty()));

        Self::new(base_url, model, api_key)
    }

    pub fn new(base_url: String, model: String, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building LLM HTTP client")?;

        Ok(Self {
            completions_url: completions_url(&base_url),
            http,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Accepts a bare host, a `/v1` base, or the full completions path.
fn completions_url(base_url: &str) -> String {
    const PATH: &str = "/chat/completions";
    let base = base_url.trim_end_matches('/');
    match base {
        b if b.ends_with(PATH) => b.to_string(),
        b if b.ends_with("/v1") => format!("{b}{PATH}"),
        b => format!("{b}/v1{PATH}"),
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, messages: &[Message]) -> anyhow::Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        let mut builder = self.http.post(&self.completions_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("sending chat request to {}", self.completions_url))?;
        let status = response.status();
        let body = response.text().await.context("reading chat response body")?;
        if !status.is_success() {
            anyhow::bail!("chat completion failed with {status}: {}", truncate(&body, 300));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).context("decoding chat completion")?;
        Ok(parsed.into_content())
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
