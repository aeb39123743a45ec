use super::state::IterationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Finish,
}

/// Whether the loop may take another data/search action.
///
/// Rules, first match wins: an answer already exists, the ceiling is reached,
/// otherwise continue. Pure so the transition table can be tested without a
/// controller.
pub fn should_continue(state: &IterationState, max_iterations: u32) -> Continuation {
    if state.has_final_answer() {
        return Continuation::Finish;
    }
    if state.iteration_count() >= max_iterations {
        return Continuation::Finish;
    }
    Continuation::Continue
}
