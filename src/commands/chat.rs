use std::future::Future;
use std::io::Write as _;

use anyhow::Context as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::info;

use crate::session::Role;
use crate::state::AppState;

/// Line-oriented chat over stdin. `/clear` resets history, `/history` shows
/// it. `/exit`, EOF or Ctrl-C at the prompt quits. Ctrl-C while a question is
/// running cancels only that question.
pub async fn chat(state: &AppState, session: &str, trace: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("재무제표 질의응답을 시작합니다. /clear, /history, /exit");

    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = match next_input(&mut lines, ctrl_c()).await? {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupted => {
                // Pending stdin read would block runtime shutdown until a newline.
                println!();
                info!(session, "Chat interrupted");
                std::process::exit(130);
            }
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                state.assistant.clear(session).await;
                println!("대화 기록을 지웠습니다.");
            }
            "/history" => {
                for turn in state.assistant.history(session).await {
                    let speaker = match turn.role {
                        Role::User => "User",
                        Role::Assistant => "Bot",
                    };
                    println!("[{}] {}: {}", turn.at.format("%H:%M:%S"), speaker, turn.content);
                }
            }
            question => {
                let (cancel, watcher) = super::cancel_on_ctrl_c();
                let reply = state.assistant.ask(session, question, &cancel).await;
                watcher.abort();
                println!("{}\n", super::ask::render(question, &reply, trace));
            }
        }
    }

    info!(session, "Chat session ended");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Next prompt line, or `Interrupted` if `interrupt` completes first.
async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(match line.context("Failed to read stdin")? {
            Some(line) => Input::Line(line),
            None => Input::Eof,
        }),
        _ = interrupt => Ok(Input::Interrupted),
    }
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
