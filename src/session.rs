use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// In-memory conversation history keyed by session id. Writes to the map are
/// serialised by one lock; sessions never see each other's turns.
#[derive(Default)]
pub struct ConversationStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, session: &str, turn: Turn) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session.to_string()).or_default().push(turn);
    }

    pub async fn history(&self, session: &str) -> Vec<Turn> {
        let sessions = self.sessions.read().await;
        sessions.get(session).cloned().unwrap_or_default()
    }

    pub async fn clear(&self, session: &str) {
        self.sessions.write().await.remove(session);
    }
}

/// Fold recent history into the question so short follow-ups ("그럼 영업이익은?")
/// keep their subject.
///
/// `window` counts the current question, so at most `window - 1` prior turns
/// are included, each cut to `snippet_len` chars.
pub fn contextual_question(
    history: &[Turn],
    question: &str,
    window: usize,
    snippet_len: usize,
) -> String {
    let prior = window.saturating_sub(1);
    if history.is_empty() || prior == 0 {
        return question.to_string();
    }

    let start = history.len().saturating_sub(prior);
    let lines: Vec<String> = history[start..]
        .iter()
        .map(|t| {
            let speaker = match t.role {
                Role::User => "User",
                Role::Assistant => "Bot",
            };
            format!("{}: {}", speaker, crate::llm::truncate(&t.content, snippet_len))
        })
        .collect();

    format!(
        "대화 기록:\n{}\n\n현재 질문: {}",
        lines.join("\n"),
        question
    )
}
