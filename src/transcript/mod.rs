use serde_json::Value;
use std::fs;
use std::path::Path;

/// Appended to a message body that exceeded the character ceiling.
pub const TRUNCATION_MARKER: &str = "\n[...truncated...]";

/// Separator placed between turns in the rendered conversation.
pub const TURN_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 3000;
pub const DEFAULT_MAX_TURNS: usize = 80;

// ===================================================================
// Loading: one JSON record per JSONL line
// ===================================================================

/// Parse JSONL contents into records, silently skipping blank lines and
/// lines that are not valid JSON. Lines are decoded independently, so a
/// torn or non-UTF-8 line costs only itself.
pub fn parse(contents: &[u8]) -> Vec<Value> {
    contents
        .split(|&b| b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_slice(line).ok())
        .collect()
}

/// Read a transcript file. A missing or unreadable file yields no records.
pub fn load(path: &Path) -> Vec<Value> {
    match fs::read(path) {
        Ok(contents) => parse(&contents),
        Err(e) => {
            tracing::warn!("could not read transcript {}: {e}", path.display());
            Vec::new()
        }
    }
}

// ===================================================================
// Role: who spoke a turn
// ===================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Map a transcript role string. Anything other than user/human and
    /// assistant (system, progress, tool records) is not a conversation turn.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "user" | "human" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }

    /// Resolve the role of a record: `type` wins when it is set, otherwise
    /// `role` is consulted.
    fn of_record(record: &Value) -> Option<Self> {
        let tag = [record.get("type"), record.get("role")]
            .into_iter()
            .flatten()
            .find(|v| is_truthy(v))?;
        tag.as_str().and_then(Self::from_tag)
    }
}

/// JSON "truthiness": null, false, 0, "", [] and {} count as unset.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ===================================================================
// Content: `message.content` is a string or an array of blocks
// ===================================================================

/// Structural view of a `content` field.
#[derive(Debug)]
pub enum Content<'a> {
    Text(&'a str),
    Blocks(&'a [Value]),
    Other,
}

impl<'a> Content<'a> {
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(s)) => Self::Text(s),
            Some(Value::Array(blocks)) => Self::Blocks(blocks),
            _ => Self::Other,
        }
    }

    /// Flatten to plain text. String blocks pass through, `text` blocks
    /// contribute their text, everything else (thinking, tool_use,
    /// tool_result) is dropped. Blocks are joined with newlines.
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.to_string(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj)
                        if obj.get("type").and_then(Value::as_str) == Some("text") =>
                    {
                        Some(obj.get("text").and_then(Value::as_str).unwrap_or(""))
                    }
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Other => String::new(),
        }
    }
}

/// Extract the trimmed text of a record, looking in `message` first and
/// falling back to the record itself for flat schemas.
pub fn record_text(record: &Value) -> String {
    let message = record
        .get("message")
        .filter(|m| is_truthy(m))
        .unwrap_or(record);
    let content = match message {
        Value::Object(obj) => Content::of(obj.get("content")),
        _ => Content::Other,
    };
    content.text().trim_matches(is_space).to_string()
}

/// Unicode whitespace plus the ASCII information separators (U+001C to
/// U+001F), which transcripts treat as blank.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Truncate to `max` characters, appending [`TRUNCATION_MARKER`] if
/// anything was cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
    }
}

// ===================================================================
// Conversation: labeled turns reconstructed from records
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    fn render(&self) -> String {
        format!("[{}]\n{}", self.role.label(), self.text)
    }
}

/// Per-message ceiling and window size applied while building.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_message_chars: usize,
    pub max_turns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// The most recent window of user/assistant turns, in transcript order.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn build(records: &[Value], limits: Limits) -> Self {
        let mut turns: Vec<Turn> = records
            .iter()
            .filter_map(|record| {
                let text = record_text(record);
                if text.is_empty() {
                    return None;
                }
                let role = Role::of_record(record)?;
                Some(Turn {
                    role,
                    text: truncate(&text, limits.max_message_chars),
                })
            })
            .collect();

        let excess = turns.len().saturating_sub(limits.max_turns);
        turns.drain(..excess);
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render as `[LABEL]\ntext` blocks separated by horizontal rules.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(Turn::render)
            .collect::<Vec<_>>()
            .join(TURN_SEPARATOR)
    }
}
