//! Picks how much retrieval a question needs before any tool runs.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{truncate, ChatModel, Message};
use crate::rag::prompts;
use crate::tools::Capability;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer from model knowledge alone.
    NoRetrieval,
    /// One tool call answers it.
    SingleShot,
    /// Needs the iterative loop.
    Iterative,
}

impl Route {
    pub fn label(self) -> &'static str {
        match self {
            Route::NoRetrieval => "no_retrieval",
            Route::SingleShot => "single_shot_rag",
            Route::Iterative => "iterative_rag",
        }
    }

    /// Exact label match after trimming quotes and case; anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
            .to_lowercase();
        match cleaned.as_str() {
            "no_retrieval" => Some(Route::NoRetrieval),
            "single_shot_rag" => Some(Route::SingleShot),
            "iterative_rag" => Some(Route::Iterative),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const FINANCIAL_KEYWORDS: &[&str] = &[
    "매출", "영업이익", "순이익", "영업수익", "자산", "부채", "자본", "현금흐름",
    "재무상태표", "손익계산서", "현금흐름표", "자본변동표", "이익률", "수익률",
    "회사", "기업", "2023", "2024", "2025", "상반기", "하반기", "분기",
];

pub fn is_financial_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    FINANCIAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Capability for a single-shot question.
pub fn single_shot_capability(text: &str) -> Capability {
    if is_financial_query(text) {
        Capability::DataQuery
    } else {
        Capability::WebSearch
    }
}

pub struct QueryRouter {
    llm: Arc<dyn ChatModel>,
}

impl QueryRouter {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// Classify `question`. Model failures and unknown labels fall back to
    /// `SingleShot`.
    pub async fn route(&self, question: &str) -> Route {
        let messages = [
            Message::system(prompts::ROUTER_PROMPT),
            Message::user(format!("질문: \"{question}\"")),
        ];
        let response = match self.llm.chat(&messages).await {
            Ok(r) => r,
            Err(e) => {
                let error = format!("{e:#}");
                warn!(error = %error, "Routing call failed, using single_shot_rag");
                return Route::SingleShot;
            }
        };

        let first_line = response.lines().next().unwrap_or("");
        match Route::parse(first_line) {
            Some(route) => {
                debug!(route = %route, "Routed question");
                route
            }
            None => {
                warn!(
                    response = truncate(&response, 100),
                    "Unrecognised route, using single_shot_rag"
                );
                Route::SingleShot
            }
        }
    }
}
