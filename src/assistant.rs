use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::llm::{ChatModel, Message};
use crate::rag::controller::LlmController;
use crate::rag::prompts;
use crate::rag::synth::LlmSynthesizer;
use crate::rag::{IterativeRagEngine, RagOutcome};
use crate::router::{single_shot_capability, QueryRouter, Route};
use crate::session::{contextual_question, ConversationStore, Role, Turn};
use crate::state::RagConfig;
use crate::tools::ToolInvoker;

/// Shown when nothing else could be produced.
pub const GENERIC_FAILURE_ANSWER: &str =
    "죄송합니다. 지금은 답변을 준비하지 못했습니다. 잠시 후 다시 질문해 주세요.";

#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub answer: String,
    pub route: Route,
    /// Present only for questions that went through the iterative loop.
    pub outcome: Option<RagOutcome>,
}

/// Conversation front door: routes each question, runs the matching strategy
/// and keeps per-session history.
pub struct FinancialAssistant {
    llm: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolInvoker>,
    router: QueryRouter,
    engine: IterativeRagEngine,
    sessions: Arc<ConversationStore>,
    config: RagConfig,
}

impl FinancialAssistant {
    pub fn new(
        llm: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolInvoker>,
        sessions: Arc<ConversationStore>,
        config: RagConfig,
    ) -> Result<Self> {
        config.validate()?;
        let engine = IterativeRagEngine::new(
            Arc::new(LlmController::new(llm.clone())),
            tools.clone(),
            Arc::new(LlmSynthesizer::new(llm.clone())),
            config.max_iterations,
        )?;

        Ok(Self {
            router: QueryRouter::new(llm.clone()),
            llm,
            tools,
            engine,
            sessions,
            config,
        })
    }

    pub async fn ask(
        &self,
        session: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> AssistantReply {
        let history = self.sessions.history(session).await;
        let full_question = contextual_question(
            &history,
            question,
            self.config.history_window,
            self.config.history_snippet_len,
        );
        self.sessions
            .append(session, Turn::new(Role::User, question))
            .await;

        let route = self.router.route(&full_question).await;
        info!(session, route = %route, history_turns = history.len(), "Question routed");

        let (answer, outcome) = match route {
            Route::NoRetrieval => (self.direct_answer(&full_question).await, None),
            Route::SingleShot => (self.single_shot(&full_question).await, None),
            Route::Iterative => {
                let outcome = self.engine.run_with_cancel(&full_question, cancel).await;
                (outcome.final_answer.clone(), Some(outcome))
            }
        };

        let answer = if answer.trim().is_empty() {
            warn!(session, route = %route, "Empty answer, using fallback");
            GENERIC_FAILURE_ANSWER.to_string()
        } else {
            answer
        };

        self.sessions
            .append(session, Turn::new(Role::Assistant, answer.clone()))
            .await;

        AssistantReply {
            answer,
            route,
            outcome,
        }
    }

    pub async fn clear(&self, session: &str) {
        self.sessions.clear(session).await;
    }

    pub async fn history(&self, session: &str) -> Vec<Turn> {
        self.sessions.history(session).await
    }

    async fn direct_answer(&self, question: &str) -> String {
        let messages = [
            Message::system(prompts::DIRECT_ANSWER_PROMPT),
            Message::user(question),
        ];
        match self.llm.chat(&messages).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => GENERIC_FAILURE_ANSWER.to_string(),
            Err(e) => {
                let error = format!("{e:#}");
                warn!(error = %error, "Direct answer failed");
                GENERIC_FAILURE_ANSWER.to_string()
            }
        }
    }

    async fn single_shot(&self, question: &str) -> String {
        let capability = single_shot_capability(question);
        match self.tools.invoke(capability, question).await {
            Ok(text) => text,
            Err(e) => {
                warn!(action = %capability, error = %e, "Single-shot tool call failed");
                format!("정보를 조회하는 중 오류가 발생했습니다: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ToolError;
    use crate::rag::Termination;
    use crate::tools::Capability;

    struct ScriptedModel {
        responses: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, messages: &[Message]) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct EchoTools {
        calls: Mutex<Vec<Capability>>,
        fail: bool,
    }

    #[async_trait]
    impl ToolInvoker for EchoTools {
        async fn invoke(
            &self,
            capability: Capability,
            argument: &str,
        ) -> std::result::Result<String, ToolError> {
            self.calls.lock().unwrap().push(capability);
            if self.fail {
                return Err(ToolError::NotConfigured("DATA_QUERY_URL"));
            }
            Ok(format!("{capability} -> {argument}"))
        }
    }

    fn assistant(model: Arc<ScriptedModel>, tools: Arc<EchoTools>) -> FinancialAssistant {
        FinancialAssistant::new(
            model,
            tools,
            Arc::new(ConversationStore::new()),
            RagConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn iterative_route_runs_the_loop() {
        let model = ScriptedModel::new(&[
            "iterative_rag",
            "DATA_QUERY(삼성전자 매출액)",
            "DATA_QUERY(SK하이닉스 매출액)",
            "FINAL",
            "삼성전자 매출액이 더 큽니다.",
        ]);
        let tools = Arc::new(EchoTools::default());
        let bot = assistant(model, tools.clone());

        let reply = bot
            .ask("s1", "삼성전자와 SK하이닉스 매출 비교", &CancellationToken::new())
            .await;

        assert_eq!(reply.route, Route::Iterative);
        assert_eq!(reply.answer, "삼성전자 매출액이 더 큽니다.");
        let outcome = reply.outcome.unwrap();
        assert_eq!(outcome.iteration_count, 2);
        assert_eq!(outcome.termination, Termination::Voluntary);
        assert_eq!(tools.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn single_shot_uses_data_query_for_financial_questions() {
        let model = ScriptedModel::new(&["single_shot_rag"]);
        let tools = Arc::new(EchoTools::default());
        let bot = assistant(model, tools.clone());

        let reply = bot
            .ask("s1", "삼성전자 2025년 매출액", &CancellationToken::new())
            .await;

        assert_eq!(reply.route, Route::SingleShot);
        assert!(reply.answer.starts_with("data_query -> "));
        assert!(reply.outcome.is_none());
        assert_eq!(*tools.calls.lock().unwrap(), vec![Capability::DataQuery]);
    }

    #[tokio::test]
    async fn single_shot_failure_still_answers() {
        let model = ScriptedModel::new(&["single_shot_rag"]);
        let tools = Arc::new(EchoTools {
            fail: true,
            ..Default::default()
        });
        let bot = assistant(model, tools);

        let reply = bot.ask("s1", "최근 AI 트렌드", &CancellationToken::new()).await;
        assert!(reply.answer.contains("오류"));
    }

    #[tokio::test]
    async fn no_retrieval_answers_directly() {
        let model = ScriptedModel::new(&["no_retrieval", "재무제표는 기업의 재무 상태를 보여주는 보고서입니다."]);
        let tools = Arc::new(EchoTools::default());
        let bot = assistant(model, tools.clone());

        let reply = bot.ask("s1", "재무제표가 뭐야?", &CancellationToken::new()).await;

        assert_eq!(reply.route, Route::NoRetrieval);
        assert!(reply.answer.contains("재무제표"));
        assert!(tools.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_model_output_never_reaches_the_user() {
        let model = ScriptedModel::new(&["no_retrieval", ""]);
        let bot = assistant(model, Arc::new(EchoTools::default()));

        let reply = bot.ask("s1", "재무제표가 뭐야?", &CancellationToken::new()).await;
        assert_eq!(reply.answer, GENERIC_FAILURE_ANSWER);
    }

    #[tokio::test]
    async fn follow_up_questions_carry_history() {
        let model = ScriptedModel::new(&[
            "single_shot_rag",
            "single_shot_rag",
        ]);
        let tools = Arc::new(EchoTools::default());
        let bot = assistant(model.clone(), tools);

        bot.ask("s1", "삼성전자 매출액", &CancellationToken::new()).await;
        bot.ask("s1", "영업이익은?", &CancellationToken::new()).await;

        let seen = model.seen.lock().unwrap();
        let second_route_prompt = &seen[1][1].content;
        assert!(second_route_prompt.contains("User: 삼성전자 매출액"));
        assert!(second_route_prompt.contains("현재 질문: 영업이익은?"));
    }

    #[tokio::test]
    async fn clear_drops_history() {
        let model = ScriptedModel::new(&["single_shot_rag", "single_shot_rag"]);
        let bot = assistant(model.clone(), Arc::new(EchoTools::default()));

        bot.ask("s1", "삼성전자 매출액", &CancellationToken::new()).await;
        bot.clear("s1").await;
        bot.ask("s1", "영업이익은?", &CancellationToken::new()).await;

        let seen = model.seen.lock().unwrap();
        assert!(!seen[1][1].content.contains("대화 기록"));
    }

    #[test]
    fn zero_iterations_rejected_at_construction() {
        let result = FinancialAssistant::new(
            ScriptedModel::new(&[]),
            Arc::new(EchoTools::default()),
            Arc::new(ConversationStore::new()),
            RagConfig {
                max_iterations: 0,
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }
}
