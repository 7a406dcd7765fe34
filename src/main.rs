mod preferences;
mod session;
mod store;
mod summary;
mod transcript;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};
use preferences::Preferences;
use session::{Outcome, Session};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;
use types::{HookOutput, PreCompactInput, SessionStartInput, parse_payload, resolve_cwd};

/// Log filter, in `EnvFilter` syntax.
const LOG_ENV: &str = "DECISIONKEEPER_LOG";

/// Preserve design decisions across context compactions.
#[derive(Debug, Parser)]
#[command(name = "decisionkeeper", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize the transcript into a design-decisions document (default).
    PreCompact,
    /// Re-inject the saved document after a compaction.
    SessionStart,
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .try_init();
}

fn pre_compact(input: &str) -> Result<Option<HookOutput>> {
    let payload: PreCompactInput = parse_payload(input);
    let cwd = resolve_cwd(payload.cwd.as_deref());
    let prefs = Preferences::resolve();
    let session = Session::open(&cwd, &prefs)?;
    match session.handle_pre_compact(&payload, &prefs.summarizer())? {
        Outcome::Skipped(reason) => tracing::warn!("{reason}; skipping"),
        Outcome::Saved { path, mirror } => {
            tracing::info!("saved to {}", path.display());
            if let Some(local) = mirror {
                tracing::info!("also saved to {}", local.display());
            }
        }
    }
    Ok(None)
}

fn session_start(input: &str) -> Result<Option<HookOutput>> {
    let payload: SessionStartInput = parse_payload(input);
    let cwd = resolve_cwd(payload.cwd.as_deref());
    let prefs = Preferences::resolve();
    Session::open(&cwd, &prefs)?.handle_session_start(&payload)
}

fn main() {
    init_logging();

    // A hook must never fail its host: argument errors are reported, not fatal.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return;
        }
    };

    let input = read_stdin().unwrap_or_else(|e| {
        tracing::warn!("could not read stdin: {e}");
        String::new()
    });

    let result = match cli.command.unwrap_or(Command::PreCompact) {
        Command::PreCompact => pre_compact(&input),
        Command::SessionStart => session_start(&input),
    };

    match result {
        Ok(Some(output)) => match serde_json::to_string(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("could not serialize hook output: {e}"),
        },
        Ok(None) => {}
        Err(err) => tracing::error!("{err:#}"),
    }
}
