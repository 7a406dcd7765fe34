#![allow(dead_code)]

use md5::{Digest, Md5};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A scratch `$HOME` and a scratch project directory for one test.
/// Both `TempDir`s must be kept alive for the duration of the test.
pub struct Harness {
    pub home: tempfile::TempDir,
    pub project: tempfile::TempDir,
    claude: Option<PathBuf>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            project: tempfile::tempdir().unwrap(),
            claude: None,
        }
    }

    pub fn cwd(&self) -> &str {
        self.project.path().to_str().unwrap()
    }

    /// Install an executable shell script standing in for the `claude` CLI.
    pub fn stub_claude(&mut self, body: &str) -> PathBuf {
        let bin = self.home.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join("claude");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        self.claude = Some(path.clone());
        path
    }

    /// Write `~/.claude/decisionkeeper.toml`.
    pub fn write_config(&self, toml: &str) {
        let dir = self.home.path().join(".claude");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("decisionkeeper.toml"), toml).unwrap();
    }

    /// Write a JSONL transcript, one line per element.
    pub fn write_transcript(&self, lines: &[&str]) -> PathBuf {
        let path = self.home.path().join("transcript.jsonl");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    pub fn store_dir(&self) -> PathBuf {
        self.home.path().join(".claude").join("design-decisions")
    }

    /// Where the document for `cwd` is expected to land.
    pub fn stored_path(&self, cwd: &str) -> PathBuf {
        self.store_dir().join(format!("{}.md", project_key(cwd)))
    }

    pub fn stored_doc(&self, cwd: &str) -> Option<String> {
        fs::read_to_string(self.stored_path(cwd)).ok()
    }

    /// True if nothing was ever written to the store.
    pub fn store_is_empty(&self) -> bool {
        match fs::read_dir(self.store_dir()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    /// Run the binary with `args`, feeding `stdin_json`. Returns
    /// (exit_code, stdout, stderr).
    pub fn run(&self, args: &[&str], stdin_json: &str) -> (i32, String, String) {
        // Without a stub, point at a path that does not exist so a real
        // `claude` on the developer's PATH is never invoked.
        let claude = self
            .claude
            .clone()
            .unwrap_or_else(|| self.home.path().join("no-such-claude"));

        let mut child = Command::new(env!("CARGO_BIN_EXE_decisionkeeper"))
            .args(args)
            .env("HOME", self.home.path())
            .env("CLAUDE_CMD", &claude)
            .env_remove("DECISIONKEEPER_LOG")
            .env_remove("CLAUDE_SKIP_HOOKS")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn binary");

        child
            .stdin
            .as_mut()
            .unwrap()
            .write_all(stdin_json.as_bytes())
            .unwrap();

        let output = child.wait_with_output().unwrap();
        (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }

    pub fn pre_compact(&self, stdin_json: &str) -> (i32, String, String) {
        self.run(&[], stdin_json)
    }
}

/// Independent computation of the project key: first 16 hex chars of MD5.
pub fn project_key(cwd: &str) -> String {
    let digest = Md5::digest(cwd.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

pub fn payload(cwd: &str, transcript: &Path) -> String {
    serde_json::json!({
        "session_id": "test-session",
        "transcript_path": transcript.to_str().unwrap(),
        "cwd": cwd,
        "permission_mode": "default",
        "hook_event_name": "PreCompact",
        "trigger": "auto",
        "custom_instructions": ""
    })
    .to_string()
}

pub const USER_LINE: &str =
    r#"{"type":"user","uuid":"u1","sessionId":"s","message":{"role":"user","content":"let's store sessions in sqlite"}}"#;
pub const ASSISTANT_LINE: &str = r#"{"type":"assistant","uuid":"a1","parentUuid":"u1","sessionId":"s","message":{"role":"assistant","content":[{"type":"text","text":"Agreed, sqlite over postgres."}]}}"#;
