use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::llm::truncate;

#[derive(Serialize)]
struct DataQueryRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct DataQueryResponse {
    #[serde(default)]
    answer: Option<String>,
}

/// Client for the structured financial-statement query service.
///
/// The service owns question-to-SQL translation; this side only ships the
/// question and reads back a textual answer.
pub struct DataQueryClient {
    client: reqwest::Client,
    url: String,
}

impl DataQueryClient {
    /// `None` when `DATA_QUERY_URL` is unset.
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        match dotenv::var("DATA_QUERY_URL").ok().filter(|u| !u.is_empty()) {
            Some(url) => Ok(Some(Self::new(url)?)),
            None => Ok(None),
        }
    }

    pub fn new(url: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, url })
    }

    pub async fn query(&self, question: &str) -> Result<String, ToolError> {
        debug!(url = %self.url, question = truncate(question, 200), "data query");
        let resp = self
            .client
            .post(&self.url)
            .json(&DataQueryRequest { question })
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
        parse_answer(&text)
    }
}

fn parse_answer(body: &str) -> Result<String, ToolError> {
    let parsed: DataQueryResponse =
        serde_json::from_str(body).map_err(|e| ToolError::Decode(e.to_string()))?;
    match parsed.answer {
        Some(answer) if !answer.trim().is_empty() => Ok(answer),
        _ => Err(ToolError::Decode(
            "data service returned no answer".to_string(),
        )),
    }
}
