use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::llm::truncate;

const MAX_RESULTS: u32 = 5;
const SHOWN_RESULTS: usize = 3;
pub const NO_RESULTS: &str = "검색 결과를 찾을 수 없습니다.";

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

/// Tavily web search.
pub struct WebSearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WebSearchClient {
    /// `None` when `TAVILY_API_KEY` is unset.
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let Some(api_key) = dotenv::var("TAVILY_API_KEY").ok().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let base_url =
            dotenv::var("TAVILY_BASE_URL").unwrap_or_else(|_| "https://api.tavily.com".to_string());
        Ok(Some(Self::new(base_url, api_key)?))
    }

    pub fn new(base_url: String, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub async fn search(&self, query: &str) -> Result<String, ToolError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        debug!(url = %url, query = truncate(query, 200), "web search");

        let resp = self
            .client
            .post(&url)
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                search_depth: "advanced",
                max_results: MAX_RESULTS,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|e| ToolError::Decode(e.to_string()))?;
        Ok(format_hits(&parsed.results))
    }
}

fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }
    hits.iter()
        .take(SHOWN_RESULTS)
        .map(|h| format!("제목: {}\n내용: {}\n출처: {}\n", h.title, h.content, h.url))
        .collect::<Vec<_>>()
        .join("\n")
}
