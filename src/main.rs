use clap::Parser;
use tracing::{info, Level};

use finrag::commands::{self, Cli};
use finrag::state::{AppState, RagConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = RagConfig::from_env()?;
    if let Some(max_iterations) = cli.max_iterations {
        config.max_iterations = max_iterations;
    }

    let state = AppState::build(config)?;
    info!(
        max_iterations = state.config.max_iterations,
        model = state.llm.model(),
        "finrag initialized"
    );

    commands::run(cli.command, &state).await
}
