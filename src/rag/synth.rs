use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SynthesisError;
use crate::llm::{ChatModel, Message};

use super::prompts;

/// Answer for a run that gathered nothing.
pub const NO_DATA_ANSWER: &str = "죄송합니다. 재무 데이터를 조회하지 못했습니다. \
    잠시 후 다시 질문해 주시면 데이터베이스에서 정확한 정보를 조회하여 답변드리겠습니다.";

/// Phrases that mark a refusal or non-answer from the model.
const UNUSABLE_ANSWER_PATTERNS: &[&str] = &[
    "i'm unable to",
    "i cannot",
    "i apologize",
    "as an ai",
    "답변을 생성할 수 없",
    "답변드릴 수 없",
];

#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, question: &str, results: &[String])
        -> Result<String, SynthesisError>;
}

/// Canned answer used whenever synthesis yields nothing usable. Mentions how
/// much was gathered so the user knows the answer is degraded.
pub fn fallback_answer(results: &[String]) -> String {
    if results.is_empty() {
        return NO_DATA_ANSWER.to_string();
    }
    format!(
        "죄송합니다. 수집된 정보({}건)만으로는 충분한 답변을 만들지 못했습니다. \
         일부 데이터만 조회되었을 수 있으니 질문을 조금 더 구체적으로 다시 해주세요.",
        results.len()
    )
}

pub fn is_unusable(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    answer.trim().is_empty() || UNUSABLE_ANSWER_PATTERNS.iter().any(|p| lower.contains(p))
}

pub struct LlmSynthesizer {
    llm: Arc<dyn ChatModel>,
}

impl LlmSynthesizer {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        results: &[String],
    ) -> Result<String, SynthesisError> {
        if results.is_empty() {
            debug!("No intermediate results, skipping synthesis call");
            return Ok(NO_DATA_ANSWER.to_string());
        }

        let messages = [
            Message::system(prompts::SYNTHESIS_SYSTEM_PROMPT),
            Message::user(prompts::synthesis_prompt(question, results)),
        ];
        let answer = self
            .llm
            .chat(&messages)
            .await
            .map_err(|e| SynthesisError::Llm(format!("{e:#}")))?;

        if is_unusable(&answer) {
            warn!(answer_len = answer.len(), "Synthesized answer rejected");
            return Err(SynthesisError::Empty);
        }
        Ok(answer.trim().to_string())
    }
}
