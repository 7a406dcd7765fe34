use crate::store::{CONFIG_DIR, default_store_dir};
use crate::summary::{ClaudeCli, DEFAULT_CLAUDE_CMD, DEFAULT_TIMEOUT_SECS};
use crate::transcript::{DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_MAX_TURNS, Limits};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILENAME: &str = "decisionkeeper.toml";

/// Overrides `claude_cmd` when set.
pub const CLAUDE_CMD_ENV: &str = "CLAUDE_CMD";

/// User-facing preferences stored in `~/.claude/decisionkeeper.toml`.
///
/// ```toml
/// claude_cmd = "claude"
/// timeout_secs = 120
/// max_message_chars = 3000
/// max_turns = 80
/// mirror_to_project = true
/// # storage_dir = "/somewhere/else"
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct Preferences {
    /// Summarizer executable, resolved through `PATH`.
    #[serde(default = "default_claude_cmd")]
    pub claude_cmd: String,

    /// Wall-clock limit for one summarizer run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-message character ceiling before truncation.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// How many of the most recent turns are sent to the summarizer.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Where per-project documents live. Defaults to
    /// `~/.claude/design-decisions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Also write `<project>/.claude/design-decisions.md` when the project
    /// has a `.claude` directory.
    #[serde(default = "default_mirror_to_project")]
    pub mirror_to_project: bool,
}

fn default_claude_cmd() -> String {
    DEFAULT_CLAUDE_CMD.into()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_message_chars() -> usize {
    DEFAULT_MAX_MESSAGE_CHARS
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_mirror_to_project() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            claude_cmd: default_claude_cmd(),
            timeout_secs: default_timeout_secs(),
            max_message_chars: default_max_message_chars(),
            max_turns: default_max_turns(),
            storage_dir: None,
            mirror_to_project: default_mirror_to_project(),
        }
    }
}

impl Preferences {
    /// Load preferences from `<dir>/decisionkeeper.toml`.
    ///
    /// A missing file means defaults; it is not created. Missing keys in an
    /// existing file are filled in with defaults via serde.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(FILENAME);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let prefs: Preferences = toml::from_str(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?;
                Ok(prefs)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Load from the per-user config dir, apply environment overrides, and
    /// fall back to defaults (with a warning) if the file is unusable.
    pub fn resolve() -> Self {
        let mut prefs = match dirs::home_dir() {
            Some(home) => Self::load(&home.join(CONFIG_DIR)).unwrap_or_else(|e| {
                tracing::warn!("ignoring preferences: {e:#}");
                Self::default()
            }),
            None => Self::default(),
        };
        prefs.apply_env(std::env::var(CLAUDE_CMD_ENV).ok());
        prefs
    }

    fn apply_env(&mut self, claude_cmd: Option<String>) {
        if let Some(cmd) = claude_cmd.filter(|c| !c.is_empty()) {
            self.claude_cmd = cmd;
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_message_chars: self.max_message_chars,
            max_turns: self.max_turns,
        }
    }

    pub fn summarizer(&self) -> ClaudeCli {
        ClaudeCli::new(&self.claude_cmd, Duration::from_secs(self.timeout_secs))
    }

    /// The configured store directory, or `~/.claude/design-decisions`.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir.clone().or_else(default_store_dir)
    }
}
