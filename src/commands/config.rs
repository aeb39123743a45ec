use crate::state::AppState;
use crate::tools::Capability;

/// Print the effective configuration. Secrets are reported as set/unset only.
pub fn config(state: &AppState) -> anyhow::Result<()> {
    println!("{}", describe(state));
    Ok(())
}

fn describe(state: &AppState) -> String {
    let set = |b: bool| if b { "set" } else { "not set" };
    format!(
        "RAG configuration:\n\
         \x20 max_iterations: {}\n\
         \x20 history_window: {}\n\
         \x20 history_snippet_len: {}\n\
         LLM:\n\
         \x20 base_url: {}\n\
         \x20 model: {}\n\
         \x20 api_key: {}\n\
         Tools:\n\
         \x20 data_query (DATA_QUERY_URL): {}\n\
         \x20 web_search (TAVILY_API_KEY): {}",
        state.config.max_iterations,
        state.config.history_window,
        state.config.history_snippet_len,
        state.llm.base_url(),
        state.llm.model(),
        set(state.llm.has_api_key()),
        set(state.tools.is_configured(Capability::DataQuery)),
        set(state.tools.is_configured(Capability::WebSearch)),
    )
}
