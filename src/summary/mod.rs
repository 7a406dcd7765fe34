use minijinja::{Environment, context};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Set on the summarizer subprocess so its own hooks (including this one)
/// do not fire recursively.
pub const SKIP_HOOKS_ENV: &str = "CLAUDE_SKIP_HOOKS";

pub const DEFAULT_CLAUDE_CMD: &str = "claude";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Maximum number of stderr characters carried in a failure.
const STDERR_EXCERPT_CHARS: usize = 500;

const PROMPT_TEMPLATE: &str = r#"You are preserving design context before a context window compaction event.

Project: {{ project }}

Conversation history:
===
{{ conversation }}
===

Produce a structured "Design Decisions & Anti-Regression Guide" document.
Be exhaustive on rejected approaches — this is the #1 cause of post-compaction regression.

Use exactly this structure:

## CURRENT APPROACH
What implementation approach has been chosen. Be specific.

## REJECTED APPROACHES — DO NOT SUGGEST THESE
List EVERY approach that was considered and rejected, with the reason.
Format each as: "- [REJECTED] <approach>: <why it was rejected>"
This section must be exhaustive. If something was tried and abandoned, list it here.

## KEY DESIGN DECISIONS
Numbered list of concrete decisions made, with rationale.

## HARD CONSTRAINTS
Technical requirements, non-negotiables, environment constraints.

## EXPLICIT DO-NOTs
Bulleted list of specific things NOT to do, derived from the above decisions.

## CURRENT STATE
What has been built/decided so far and what remains.

Keep each section concise but complete."#;

// ===================================================================
// Errors
// ===================================================================

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("could not render summary prompt: {0}")]
    Prompt(#[from] minijinja::Error),

    #[error("'{0}' CLI not found in PATH")]
    NotFound(String),

    #[error("summarizer timed out after {0}s")]
    TimedOut(u64),

    #[error("summarizer exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("summarizer produced no output")]
    EmptyOutput,

    #[error("summarizer I/O failure: {0}")]
    Io(#[source] io::Error),
}

// ===================================================================
// Summarizer capability
// ===================================================================

/// Turns a reconstructed conversation into a design-decisions document.
pub trait Summarizer {
    fn summarize(&self, conversation: &str, project: &str) -> Result<String, SummaryError>;
}

/// Render the instructional prompt for a conversation.
pub fn render_prompt(conversation: &str, project: &str) -> Result<String, SummaryError> {
    let env = Environment::new();
    let tmpl = env.template_from_str(PROMPT_TEMPLATE)?;
    Ok(tmpl.render(context! { project, conversation })?)
}

/// Shells out to `claude -p <prompt> --output-format text`.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    pub command: String,
    pub timeout: Duration,
}

impl ClaudeCli {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    async fn run(&self, prompt: &str) -> Result<std::process::Output, SummaryError> {
        let child = Command::new(&self.command)
            .arg("-p")
            .arg(prompt)
            .args(["--output-format", "text"])
            .env(SKIP_HOOKS_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SummaryError::NotFound(self.command.clone()),
                _ => SummaryError::Io(e),
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(SummaryError::Io),
            Err(_) => Err(SummaryError::TimedOut(self.timeout.as_secs())),
        }
    }
}

impl Summarizer for ClaudeCli {
    fn summarize(&self, conversation: &str, project: &str) -> Result<String, SummaryError> {
        let prompt = render_prompt(conversation, project)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SummaryError::Io)?;
        let output = runtime.block_on(self.run(&prompt))?;
        interpret_output(&output)
    }
}

/// Map a finished process to a document or a failure.
fn interpret_output(output: &std::process::Output) -> Result<String, SummaryError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SummaryError::NonZeroExit {
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.chars().take(STDERR_EXCERPT_CHARS).collect(),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary = stdout.trim();
    if summary.is_empty() {
        return Err(SummaryError::EmptyOutput);
    }
    Ok(summary.to_string())
}
