//! Dedicated chunk server entry point: parses CLI flags, starts the server, and runs an
//! interactive console for shutting it down cleanly.

use chunk_common::collaborators::DeterministicMesher;
use chunk_server::config::{CliOptions, ServerSettings};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = CliOptions::parse();
    let settings = ServerSettings::resolve(&opts)?;
    let port = settings.chunk.server_port;

    let cancel = CancellationToken::new();

    let server_task = tokio::spawn(chunk_server::run(settings, DeterministicMesher::default(), cancel.clone()));

    let repl_cancel = cancel.clone();
    let repl_task = tokio::task::spawn_blocking(move || run_console(repl_cancel));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt signal received, shutting down");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }

    let _ = repl_task.await;
    server_task.await??;
    info!(port, "chunk server stopped");
    Ok(())
}

/// Reads admin commands from stdin until `quit`/`stop`/`exit`, EOF, or an interrupt, cancelling
/// `cancel` on the way out so the async side shuts down with it.
fn run_console(cancel: CancellationToken) {
    let Ok(mut rl) = DefaultEditor::new() else {
        return;
    };
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match rl.readline("chunk_server> ") {
            Ok(line) => {
                let cmd = line.split_whitespace().next().unwrap_or("");
                match cmd {
                    "" => continue,
                    "quit" | "stop" | "exit" => {
                        info!("shutdown requested from the console");
                        break;
                    }
                    _ => error!("unknown command {cmd}"),
                }
            }
            Err(ReadlineError::Eof) => {
                info!("stdin EOF reached");
                break;
            }
            Err(ReadlineError::Interrupted) => {
                info!("interrupt signal received at the console");
                break;
            }
            Err(ReadlineError::WindowResized) => continue,
            Err(e) => {
                error!("error reading commandline prompt: {e}");
                break;
            }
        }
    }
    cancel.cancel();
}
