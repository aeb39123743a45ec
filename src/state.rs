use std::sync::Arc;

use anyhow::Context as _;

use crate::assistant::FinancialAssistant;
use crate::error::{RagError, Result};
use crate::llm::LlmClient;
use crate::session::ConversationStore;
use crate::tools::{DataQueryClient, FinancialTools, WebSearchClient};

/// Tunable loop parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagConfig {
    /// Ceiling on data/search actions. Synthesis is an extra, uncounted pass.
    pub max_iterations: u32,
    /// Turns of conversation (current question included) folded into a question.
    pub history_window: usize,
    /// Chars kept from each prior turn.
    pub history_snippet_len: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            history_window: 3,
            history_snippet_len: 150,
        }
    }
}

impl RagConfig {
    /// Defaults overridden by `RAG_*` environment variables. Not validated
    /// here so CLI overrides can still apply.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `RAG_*` name.
    /// A present but unparsable value is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        fn parse_var<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
            target: &mut T,
        ) -> anyhow::Result<()>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            if let Some(raw) = lookup(name) {
                *target = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{name} is not a number: {raw}"))?;
            }
            Ok(())
        }

        let mut config = Self::default();
        parse_var(&lookup, "RAG_MAX_ITERATIONS", &mut config.max_iterations)?;
        parse_var(&lookup, "RAG_HISTORY_WINDOW", &mut config.history_window)?;
        parse_var(&lookup, "RAG_HISTORY_SNIPPET", &mut config.history_snippet_len)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations < 1 {
            return Err(RagError::Configuration(format!(
                "max_iterations must be at least 1, got {}",
                self.max_iterations
            )));
        }
        if self.history_window < 1 {
            return Err(RagError::Configuration(
                "history_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a command handler needs.
pub struct AppState {
    pub llm: Arc<LlmClient>,
    pub tools: Arc<FinancialTools>,
    pub assistant: Arc<FinancialAssistant>,
    pub config: RagConfig,
}

impl AppState {
    pub fn build(config: RagConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let llm = Arc::new(LlmClient::from_env()?);
        let tools = Arc::new(FinancialTools::new(
            DataQueryClient::from_env()?,
            WebSearchClient::from_env()?,
        ));
        let sessions = Arc::new(ConversationStore::new());
        let assistant = Arc::new(FinancialAssistant::new(
            llm.clone(),
            tools.clone(),
            sessions,
            config.clone(),
        )?);

        Ok(Self {
            llm,
            tools,
            assistant,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RagConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.history_window, 3);
        assert_eq!(config.history_snippet_len, 150);
        assert!(config.validate().is_ok());
    }

    fn lookup_from(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name: &str| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn env_overrides_replace_defaults() {
        let config = RagConfig::from_lookup(lookup_from(&[
            ("RAG_MAX_ITERATIONS", " 5 "),
            ("RAG_HISTORY_SNIPPET", "80"),
        ]))
        .unwrap();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.history_window, 3);
        assert_eq!(config.history_snippet_len, 80);
    }

    #[test]
    fn unparsable_env_value_is_an_error() {
        let err = RagConfig::from_lookup(lookup_from(&[("RAG_MAX_ITERATIONS", "abc")])).unwrap_err();
        assert!(err.to_string().contains("RAG_MAX_ITERATIONS"));

        assert!(RagConfig::from_lookup(lookup_from(&[("RAG_HISTORY_WINDOW", "-1")])).is_err());
    }

    #[test]
    fn zero_from_env_is_parsed_then_rejected_by_validate() {
        let config = RagConfig::from_lookup(lookup_from(&[("RAG_MAX_ITERATIONS", "0")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let config = RagConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn zero_history_window_is_rejected() {
        let config = RagConfig {
            history_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
