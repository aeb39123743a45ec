use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ControllerError;
use crate::llm::{truncate, ChatModel, Message};

use super::directive::Directive;
use super::prompts;

/// Next step chosen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    DataQuery(String),
    WebSearch(String),
    Synthesize,
}

/// Read-only view of the loop handed to the controller.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub question: &'a str,
    pub results: &'a [String],
    pub iteration_count: u32,
    pub max_iterations: u32,
}

#[async_trait]
pub trait IterationController: Send + Sync {
    async fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Action, ControllerError>;
}

/// Outcome of one guarded decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Chosen(Action),
    /// Ceiling reached; the controller was not consulted.
    CeilingReached,
    /// The controller failed; synthesize with what exists.
    Fallback,
}

/// Ask `controller` for the next action, enforcing the ceiling before it is
/// consulted and turning any controller error into forced synthesis.
pub async fn decide(
    controller: &dyn IterationController,
    ctx: &DecisionContext<'_>,
) -> Decision {
    if ctx.iteration_count >= ctx.max_iterations {
        return Decision::CeilingReached;
    }
    match controller.decide(ctx).await {
        Ok(action) => Decision::Chosen(action),
        Err(e) => {
            warn!(
                iteration = ctx.iteration_count + 1,
                error = %e,
                "Controller could not decide, forcing synthesis"
            );
            Decision::Fallback
        }
    }
}

/// Controller backed by a chat model answering in directive form.
pub struct LlmController {
    llm: Arc<dyn ChatModel>,
}

impl LlmController {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IterationController for LlmController {
    async fn decide(&self, ctx: &DecisionContext<'_>) -> Result<Action, ControllerError> {
        let messages = [
            Message::system(prompts::CONTROLLER_SYSTEM_PROMPT),
            Message::user(prompts::controller_prompt(ctx)),
        ];
        let response = self
            .llm
            .chat(&messages)
            .await
            .map_err(|e| ControllerError::Llm(format!("{e:#}")))?;

        debug!(
            iteration = ctx.iteration_count + 1,
            response = truncate(&response, 200),
            "Controller response"
        );

        let directive = Directive::parse(&response)
            .ok_or_else(|| ControllerError::Ambiguous(truncate(&response, 200).to_string()))?;

        let or_question = |arg: String| {
            if arg.is_empty() {
                ctx.question.to_string()
            } else {
                arg
            }
        };

        Ok(match directive {
            Directive::DataQuery(arg) => Action::DataQuery(or_question(arg)),
            Directive::WebSearch(arg) => Action::WebSearch(or_question(arg)),
            // Never finalise before anything was retrieved.
            Directive::Final if ctx.results.is_empty() => {
                debug!("FINAL with no results, querying data instead");
                Action::DataQuery(ctx.question.to_string())
            }
            Directive::Final => Action::Synthesize,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    struct ScriptedModel {
        responses: Mutex<VecDeque<anyhow::Result<String>>>,
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<anyhow::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, messages: &[Message]) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    struct Never;

    #[async_trait]
    impl IterationController for Never {
        async fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<Action, ControllerError> {
            panic!("controller must not be consulted at the ceiling");
        }
    }

    struct Failing;

    #[async_trait]
    impl IterationController for Failing {
        async fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<Action, ControllerError> {
            Err(ControllerError::Ambiguous("???".to_string()))
        }
    }

    fn ctx<'a>(results: &'a [String], iteration_count: u32) -> DecisionContext<'a> {
        DecisionContext {
            question: "삼성전자와 SK하이닉스 매출 비교",
            results,
            iteration_count,
            max_iterations: 3,
        }
    }

    #[tokio::test]
    async fn ceiling_forces_synthesis_without_consulting() {
        let results = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(decide(&Never, &ctx(&results, 3)).await, Decision::CeilingReached);
        assert_eq!(decide(&Never, &ctx(&results, 7)).await, Decision::CeilingReached);
    }

    #[tokio::test]
    async fn controller_error_becomes_fallback() {
        assert_eq!(decide(&Failing, &ctx(&[], 0)).await, Decision::Fallback);
    }

    #[tokio::test]
    async fn llm_directive_maps_to_action() {
        let model = ScriptedModel::new(vec![Ok(
            "DATA_QUERY(삼성전자 매출액, 영업이익)".to_string()
        )]);
        let controller = LlmController::new(model.clone());

        let action = controller.decide(&ctx(&[], 0)).await.unwrap();
        assert_eq!(action, Action::DataQuery("삼성전자 매출액, 영업이익".to_string()));

        let prompts = model.prompts.lock().unwrap();
        let user = &prompts[0][1].content;
        assert!(user.contains("아직 결과 없음"));
        assert!(user.contains("현재 단계: 1/3"));
    }

    #[tokio::test]
    async fn prompt_includes_accumulated_results() {
        let model = ScriptedModel::new(vec![Ok("WEB_SEARCH(반도체 업황)".to_string())]);
        let controller = LlmController::new(model.clone());
        let results = vec!["[1] data_query: 매출액 100".to_string()];

        let action = controller.decide(&ctx(&results, 1)).await.unwrap();
        assert_eq!(action, Action::WebSearch("반도체 업황".to_string()));
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0][1].content.contains("[1] data_query: 매출액 100"));
        assert!(prompts[0][1].content.contains("현재 단계: 2/3"));
    }

    #[tokio::test]
    async fn final_with_results_synthesizes() {
        let model = ScriptedModel::new(vec![Ok("FINAL".to_string())]);
        let controller = LlmController::new(model);
        let results = vec!["r".to_string()];
        assert_eq!(
            controller.decide(&ctx(&results, 1)).await.unwrap(),
            Action::Synthesize
        );
    }

    #[tokio::test]
    async fn final_without_results_queries_question() {
        let model = ScriptedModel::new(vec![Ok("FINAL".to_string())]);
        let controller = LlmController::new(model);
        assert_eq!(
            controller.decide(&ctx(&[], 0)).await.unwrap(),
            Action::DataQuery("삼성전자와 SK하이닉스 매출 비교".to_string())
        );
    }

    #[tokio::test]
    async fn empty_argument_falls_back_to_question() {
        let model = ScriptedModel::new(vec![Ok("WEB_SEARCH()".to_string())]);
        let controller = LlmController::new(model);
        assert_eq!(
            controller.decide(&ctx(&[], 0)).await.unwrap(),
            Action::WebSearch("삼성전자와 SK하이닉스 매출 비교".to_string())
        );
    }

    #[tokio::test]
    async fn unparsable_response_is_ambiguous() {
        let model = ScriptedModel::new(vec![Ok("잘 모르겠습니다".to_string())]);
        let controller = LlmController::new(model);
        let err = controller.decide(&ctx(&[], 0)).await.unwrap_err();
        assert!(matches!(err, ControllerError::Ambiguous(_)));
    }

    #[tokio::test]
    async fn model_failure_is_reported() {
        let model = ScriptedModel::new(vec![Err(anyhow::anyhow!("connection refused"))]);
        let controller = LlmController::new(model);
        let err = controller.decide(&ctx(&[], 0)).await.unwrap_err();
        assert!(matches!(err, ControllerError::Llm(ref m) if m.contains("connection refused")));
    }
}
