use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use md5::{Digest, Md5};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Per-user and per-project configuration directory name.
pub const CONFIG_DIR: &str = ".claude";

/// Subdirectory of the per-user config dir holding one document per project.
pub const STORE_DIR: &str = "design-decisions";

/// Filename of the mirrored copy inside `<project>/.claude/`.
pub const PROJECT_FILENAME: &str = "design-decisions.md";

/// Stable 16-hex-char key for a project directory.
///
/// MD5 is used for bucketing only; it is not a security boundary.
pub fn project_key(cwd: &str) -> String {
    let digest = Md5::digest(cwd.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

/// Default store location, `~/.claude/design-decisions`.
pub fn default_store_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(STORE_DIR))
}

// ===================================================================
// Document: header + summary body
// ===================================================================

/// Provenance written above the summary body.
#[derive(Debug, Clone)]
pub struct Header<'a> {
    pub generated: DateTime<Local>,
    pub project: &'a str,
    pub session_id: &'a str,
    pub trigger: &'a str,
}

impl Header<'_> {
    pub fn render(&self) -> String {
        format!(
            "# Design Decisions & Anti-Regression Guide\n\
             **Generated:** {}\n\
             **Project:** {}\n\
             **Session:** {}\n\
             **Compaction trigger:** {}\n\n",
            self.generated.format("%Y-%m-%d %H:%M"),
            self.project,
            self.session_id,
            self.trigger,
        )
    }

    /// The full document: header immediately followed by `body`.
    pub fn document(&self, body: &str) -> String {
        let mut doc = self.render();
        doc.push_str(body);
        doc
    }
}

// ===================================================================
// DecisionStore: one document per project key
// ===================================================================

/// Directory-backed key-value store. Writes are plain last-write-wins
/// overwrites.
#[derive(Debug, Clone)]
pub struct DecisionStore {
    dir: PathBuf,
}

impl DecisionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.md"))
    }

    /// Write `document` under `key`, creating the store directory if needed.
    pub fn put(&self, key: &str, document: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Read the document stored under `key`, or `None` if there is none.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }
}

/// Copy `document` into `<cwd>/.claude/design-decisions.md` when the
/// project already has a `.claude` directory. Returns the written path.
pub fn mirror_to_project(cwd: &Path, document: &str) -> Result<Option<PathBuf>> {
    let project_dir = cwd.join(CONFIG_DIR);
    if !project_dir.is_dir() {
        return Ok(None);
    }
    let path = project_dir.join(PROJECT_FILENAME);
    fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}
