use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::preferences::Preferences;
use crate::store::{self, DecisionStore, Header};
use crate::summary::{Summarizer, SummaryError};
use crate::transcript::{self, Conversation, Limits};
use crate::types::{
    HookOutput, HookSpecificOutput, PreCompactInput, SessionStartInput, SessionStartOutput,
};

// ===================================================================
// Outcome of a PreCompact run
// ===================================================================

/// Why a PreCompact run ended without writing anything.
#[derive(Debug)]
pub enum SkipReason {
    NoTranscriptPath,
    EmptyTranscript,
    NoConversation,
    SummaryFailed(SummaryError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoTranscriptPath => write!(f, "no transcript_path in payload"),
            SkipReason::EmptyTranscript => write!(f, "transcript is empty"),
            SkipReason::NoConversation => write!(f, "no extractable conversation text"),
            SkipReason::SummaryFailed(e) => write!(f, "summary generation failed: {e}"),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Skipped(SkipReason),
    Saved {
        path: PathBuf,
        /// The project-local copy, if the project has a `.claude` directory.
        mirror: Option<PathBuf>,
    },
}

// ===================================================================
// Session: one hook invocation for one project
// ===================================================================

pub struct Session {
    cwd: String,
    store: DecisionStore,
    limits: Limits,
    mirror_to_project: bool,
}

impl Session {
    /// Bind a project directory to the configured store.
    pub fn open(cwd: &str, prefs: &Preferences) -> Result<Self> {
        let dir = prefs
            .storage_dir()
            .context("no home directory to hold design decisions")?;
        Ok(Self {
            cwd: cwd.to_string(),
            store: DecisionStore::new(dir),
            limits: prefs.limits(),
            mirror_to_project: prefs.mirror_to_project,
        })
    }

    pub fn key(&self) -> String {
        store::project_key(&self.cwd)
    }

    // ---------------------------------------------------------------
    // Hook handlers
    // ---------------------------------------------------------------

    /// Summarize the transcript and persist the design-decisions document.
    ///
    /// Unmet preconditions return `Outcome::Skipped` without touching the
    /// filesystem; only write failures are errors.
    pub fn handle_pre_compact(
        &self,
        input: &PreCompactInput,
        summarizer: &dyn Summarizer,
    ) -> Result<Outcome> {
        tracing::info!(trigger = input.trigger(), cwd = %self.cwd, "pre-compact");

        let Some(transcript_path) = input.transcript_path() else {
            return Ok(Outcome::Skipped(SkipReason::NoTranscriptPath));
        };

        let records = transcript::load(Path::new(transcript_path));
        if records.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::EmptyTranscript));
        }
        tracing::info!("{} transcript entries found", records.len());

        let conversation = Conversation::build(&records, self.limits);
        if conversation.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NoConversation));
        }

        tracing::info!(
            turns = conversation.turns().len(),
            "generating design decisions summary"
        );
        let summary = match summarizer.summarize(&conversation.render(), &self.cwd) {
            Ok(summary) => summary,
            Err(e) => return Ok(Outcome::Skipped(SkipReason::SummaryFailed(e))),
        };

        let header = Header {
            generated: Local::now(),
            project: &self.cwd,
            session_id: input.session_id(),
            trigger: input.trigger(),
        };
        let document = header.document(&summary);

        let path = self.store.put(&self.key(), &document)?;
        let mirror = if self.mirror_to_project {
            store::mirror_to_project(Path::new(&self.cwd), &document)?
        } else {
            None
        };
        Ok(Outcome::Saved { path, mirror })
    }

    /// After a compaction, hand the stored document back to the assistant
    /// as additional context. Other session sources get nothing.
    pub fn handle_session_start(&self, input: &SessionStartInput) -> Result<Option<HookOutput>> {
        if !input.is_compact() {
            return Ok(None);
        }
        let Some(document) = self.store.get(&self.key())? else {
            tracing::info!(cwd = %self.cwd, "no saved design decisions for project");
            return Ok(None);
        };
        tracing::info!(cwd = %self.cwd, "restoring design decisions");
        Ok(Some(HookOutput {
            hook_specific_output: Some(HookSpecificOutput::SessionStart(SessionStartOutput {
                additional_context: Some(document),
            })),
        }))
    }
}
