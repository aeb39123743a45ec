use crate::error::ToolError;
use crate::tools::Capability;

/// Per-question loop state. Created fresh for every question and owned by a
/// single engine run.
#[derive(Debug, Clone)]
pub struct IterationState {
    original_question: String,
    iteration_count: u32,
    intermediate_results: Vec<String>,
    final_answer: Option<String>,
}

impl IterationState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            original_question: question.into(),
            iteration_count: 0,
            intermediate_results: Vec::new(),
            final_answer: None,
        }
    }

    pub fn question(&self) -> &str {
        &self.original_question
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn intermediate_results(&self) -> &[String] {
        &self.intermediate_results
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub fn has_final_answer(&self) -> bool {
        self.final_answer
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }

    /// Append the outcome of one completed data/search action and advance the
    /// iteration counter. Failures become a readable note so synthesis can
    /// still mention them.
    pub fn record(&mut self, capability: Capability, outcome: Result<String, ToolError>) -> &str {
        self.iteration_count += 1;
        let entry = match outcome {
            Ok(text) => format!("[{}] {}: {}", self.iteration_count, capability, text),
            Err(e) => format!("[{}] {}: 오류 - {}", self.iteration_count, capability, e),
        };
        self.intermediate_results.push(entry);
        &self.intermediate_results[self.intermediate_results.len() - 1]
    }

    /// Set the terminal answer. Returns false, leaving the state untouched, if
    /// an answer was already set or `answer` is blank.
    pub fn finish(&mut self, answer: String) -> bool {
        if self.has_final_answer() || answer.trim().is_empty() {
            return false;
        }
        self.final_answer = Some(answer);
        true
    }

    pub(crate) fn into_results(self) -> (u32, Vec<String>) {
        (self.iteration_count, self.intermediate_results)
    }
}
