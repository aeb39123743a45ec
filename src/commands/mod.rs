mod ask;
mod chat;
mod config;

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// finrag - Korean financial-statement Q&A over an iterative retrieval loop
#[derive(Debug, Parser)]
#[command(name = "finrag", version, about)]
pub struct Cli {
    /// Ceiling on data/search actions per question (overrides RAG_MAX_ITERATIONS)
    #[arg(long, global = true)]
    pub max_iterations: Option<u32>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer a single question
    Ask {
        question: String,
        /// Print iteration count, termination and collected results
        #[arg(long)]
        trace: bool,
    },
    /// Interactive session on stdin
    Chat {
        /// Label for this chat's history in logs
        #[arg(long, default_value = DEFAULT_SESSION)]
        session: String,
        #[arg(long)]
        trace: bool,
    },
    /// Show the effective configuration
    Config,
}

/// Session used by one-shot `ask`, which has no prior turns.
const DEFAULT_SESSION: &str = "default";

pub async fn run(command: Command, state: &AppState) -> anyhow::Result<()> {
    match command {
        Command::Ask { question, trace } => ask::ask(state, DEFAULT_SESSION, &question, trace).await,
        Command::Chat { session, trace } => chat::chat(state, &session, trace).await,
        Command::Config => config::config(state),
    }
}

/// Token cancelled by Ctrl-C. Abort the handle once the question is answered.
fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let watcher = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });
    (token, watcher)
}
