//! Error types for the retrieval loop and its collaborators.
//!
//! Only [`RagError`] is fatal. Every other variant is recovered inside the loop
//! so a run always ends with a non-empty answer.

use thiserror::Error;

/// A single capability invocation failed.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Other(String),
}

/// The controller could not turn its reasoning into an action.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    #[error("could not classify next action: {0}")]
    Ambiguous(String),

    #[error("controller model call failed: {0}")]
    Llm(String),
}

/// The synthesizer produced nothing usable.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("synthesizer returned an empty answer")]
    Empty,

    #[error("synthesis model call failed: {0}")]
    Llm(String),
}

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
