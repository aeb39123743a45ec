use tracing::info;

use crate::assistant::AssistantReply;
use crate::llm::truncate;
use crate::state::AppState;

/// Answer one question and print it to stdout.
pub async fn ask(
    state: &AppState,
    session: &str,
    question: &str,
    trace: bool,
) -> anyhow::Result<()> {
    info!(session, question = truncate(question, 200), "Question received");

    let (cancel, watcher) = super::cancel_on_ctrl_c();
    let reply = state.assistant.ask(session, question, &cancel).await;
    watcher.abort();

    println!("{}", render(question, &reply, trace));
    Ok(())
}

/// Plain-text rendering of a reply. With `trace`, appends loop metadata and
/// the collected results (each cut to 800 chars).
pub fn render(question: &str, reply: &AssistantReply, trace: bool) -> String {
    let mut out = format!("Q: {}\nRoute: {}", question, reply.route);
    if let Some(outcome) = &reply.outcome {
        out.push_str(&format!(" | Iterations: {}", outcome.iteration_count));
    }
    out.push_str(&format!("\n\nA: {}", reply.answer));

    if trace {
        if let Some(outcome) = &reply.outcome {
            out.push_str(&format!(
                "\n\n--- Trace: {} passes, termination {:?} ---",
                outcome.passes(),
                outcome.termination
            ));
            for result in &outcome.intermediate_results {
                let snippet = truncate(result, 800);
                out.push_str(&format!("\n{}", snippet));
                if snippet.len() < result.len() {
                    out.push_str(" ...");
                }
            }
        }
    }

    out
}
