pub mod controller;
pub mod directive;
pub mod policy;
pub mod prompts;
pub mod state;
pub mod synth;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RagError, Result};
use crate::llm::truncate;
use crate::tools::{Capability, ToolInvoker};

use controller::{Action, Decision, DecisionContext, IterationController};
use policy::{should_continue, Continuation};
use state::IterationState;
use synth::{fallback_answer, AnswerSynthesizer};

/// Why the loop stopped gathering and moved to synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The controller chose to answer.
    Voluntary,
    /// `max_iterations` data/search actions were taken.
    CeilingReached,
    /// The controller failed to decide.
    ControllerFallback,
    /// The caller cancelled the run.
    Cancelled,
}

/// Loop states. `Done` is absorbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Start,
    ActingDataQuery(String),
    ActingWebSearch(String),
    Synthesizing(Termination),
    Done,
}

#[derive(Debug, Clone)]
pub struct RagOutcome {
    pub final_answer: String,
    pub iteration_count: u32,
    pub intermediate_results: Vec<String>,
    pub termination: Termination,
}

impl RagOutcome {
    /// Loop passes taken: one per action plus the synthesis pass.
    pub fn passes(&self) -> u32 {
        self.iteration_count + 1
    }
}

/// Drives controller decisions, tool calls and final synthesis for one
/// question at a time. Runs share nothing mutable, so one engine can serve
/// concurrent questions.
pub struct IterativeRagEngine {
    controller: Arc<dyn IterationController>,
    tools: Arc<dyn ToolInvoker>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    max_iterations: u32,
}

impl IterativeRagEngine {
    pub fn new(
        controller: Arc<dyn IterationController>,
        tools: Arc<dyn ToolInvoker>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        max_iterations: u32,
    ) -> Result<Self> {
        if max_iterations < 1 {
            return Err(RagError::Configuration(format!(
                "max_iterations must be at least 1, got {max_iterations}"
            )));
        }
        Ok(Self {
            controller,
            tools,
            synthesizer,
            max_iterations,
        })
    }

    pub async fn run(&self, question: &str) -> RagOutcome {
        self.run_with_cancel(question, &CancellationToken::new())
            .await
    }

    /// Run the loop to completion. Always returns a non-empty answer; a
    /// cancelled run stops gathering and synthesizes from what it has.
    pub async fn run_with_cancel(&self, question: &str, cancel: &CancellationToken) -> RagOutcome {
        let mut state = IterationState::new(question);
        let mut phase = Phase::Start;
        let mut termination = Termination::Voluntary;

        info!(
            max_iterations = self.max_iterations,
            question = truncate(question, 200),
            "Starting iterative RAG"
        );

        loop {
            phase = match phase {
                Phase::Start => self.advance(&state, cancel).await,
                Phase::ActingDataQuery(argument) => {
                    self.act(&mut state, Capability::DataQuery, &argument).await;
                    self.advance(&state, cancel).await
                }
                Phase::ActingWebSearch(argument) => {
                    self.act(&mut state, Capability::WebSearch, &argument).await;
                    self.advance(&state, cancel).await
                }
                Phase::Synthesizing(reason) => {
                    termination = reason;
                    let answer = self.synthesize(&state).await;
                    state.finish(answer);
                    Phase::Done
                }
                Phase::Done => break,
            };
        }

        let final_answer = state
            .final_answer()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_answer(state.intermediate_results()));
        let (iteration_count, intermediate_results) = state.into_results();

        info!(
            iteration_count,
            result_count = intermediate_results.len(),
            termination = ?termination,
            answer_len = final_answer.len(),
            "Iterative RAG complete"
        );

        RagOutcome {
            final_answer,
            iteration_count,
            intermediate_results,
            termination,
        }
    }

    /// Gate re-entry with the continuation policy, then ask the controller.
    async fn advance(&self, state: &IterationState, cancel: &CancellationToken) -> Phase {
        if should_continue(state, self.max_iterations) == Continuation::Finish {
            debug!(
                iteration_count = state.iteration_count(),
                "Ceiling reached, forcing synthesis"
            );
            return Phase::Synthesizing(Termination::CeilingReached);
        }
        if cancel.is_cancelled() {
            warn!(
                iteration_count = state.iteration_count(),
                "Run cancelled, synthesizing from collected results"
            );
            return Phase::Synthesizing(Termination::Cancelled);
        }

        let ctx = DecisionContext {
            question: state.question(),
            results: state.intermediate_results(),
            iteration_count: state.iteration_count(),
            max_iterations: self.max_iterations,
        };
        let decision = controller::decide(self.controller.as_ref(), &ctx).await;
        debug!(iteration = state.iteration_count() + 1, decision = ?decision, "Controller decision");

        // A decision that arrives after cancellation must not start a tool call.
        if cancel.is_cancelled() {
            warn!(
                iteration_count = state.iteration_count(),
                "Run cancelled during decision, synthesizing from collected results"
            );
            return Phase::Synthesizing(Termination::Cancelled);
        }

        match decision {
            Decision::Chosen(Action::DataQuery(argument)) => Phase::ActingDataQuery(argument),
            Decision::Chosen(Action::WebSearch(argument)) => Phase::ActingWebSearch(argument),
            Decision::Chosen(Action::Synthesize) => Phase::Synthesizing(Termination::Voluntary),
            Decision::CeilingReached => Phase::Synthesizing(Termination::CeilingReached),
            Decision::Fallback => Phase::Synthesizing(Termination::ControllerFallback),
        }
    }

    async fn act(&self, state: &mut IterationState, capability: Capability, argument: &str) {
        let iteration = state.iteration_count() + 1;
        debug!(
            iteration,
            action = %capability,
            argument = truncate(argument, 200),
            "Invoking tool"
        );

        let outcome = self.tools.invoke(capability, argument).await;
        if let Err(e) = &outcome {
            warn!(iteration, action = %capability, error = %e, "Tool failed, recording failure note");
        }

        let entry = state.record(capability, outcome);
        debug!(iteration, entry = truncate(entry, 200), "Recorded intermediate result");
    }

    async fn synthesize(&self, state: &IterationState) -> String {
        let results = state.intermediate_results();
        match self.synthesizer.synthesize(state.question(), results).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!("Synthesizer returned an empty answer, using fallback");
                fallback_answer(results)
            }
            Err(e) => {
                warn!(error = %e, "Synthesis failed, using fallback");
                fallback_answer(results)
            }
        }
    }
}
