use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ===================================================================
// Lenient field decoding
// ===================================================================

/// Decode any JSON value, keeping it only if it is a string.
///
/// Hook payloads are best-effort: a field with the wrong type is treated as
/// absent rather than failing the whole payload.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(String::from))
}

/// Parse a hook payload, falling back to `T::default()` on empty or
/// malformed input. Only a JSON object is a payload; serde would otherwise
/// fill struct fields positionally from an array.
pub fn parse_payload<T>(input: &str) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    if input.trim().is_empty() {
        return T::default();
    }
    let value = match serde_json::from_str(input) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            tracing::warn!("hook payload is not a JSON object, using defaults");
            return T::default();
        }
        Err(e) => {
            tracing::warn!("could not parse hook payload, using defaults: {e}");
            return T::default();
        }
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!("could not decode hook payload, using defaults: {e}");
        T::default()
    })
}

// ===================================================================
// Hook Input Types (received via stdin, snake_case JSON)
// ===================================================================

/// Payload delivered to the PreCompact hook.
///
/// Every field is optional. Unknown fields (`hook_event_name`,
/// `permission_mode`, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PreCompactInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transcript_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trigger: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
}

impl PreCompactInput {
    /// The transcript path, if present and non-empty.
    pub fn transcript_path(&self) -> Option<&str> {
        self.transcript_path.as_deref().filter(|p| !p.is_empty())
    }

    /// `"manual"` or `"auto"`; defaults to `"auto"`.
    pub fn trigger(&self) -> &str {
        self.trigger.as_deref().unwrap_or("auto")
    }

    pub fn session_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or("unknown")
    }
}

/// Payload delivered to the SessionStart hook.
#[derive(Debug, Default, Deserialize)]
pub struct SessionStartInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub cwd: Option<String>,
    /// `startup`, `resume`, `clear` or `compact`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
}

impl SessionStartInput {
    pub fn is_compact(&self) -> bool {
        self.source.as_deref() == Some("compact")
    }
}

/// Resolve the project directory from a payload `cwd`, falling back to the
/// process working directory when it is absent or empty.
pub fn resolve_cwd(cwd: Option<&str>) -> String {
    match cwd.filter(|c| !c.is_empty()) {
        Some(c) => c.to_string(),
        None => std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| ".".into()),
    }
}

// ===================================================================
// Hook Output Types (written to stdout as JSON, camelCase)
// ===================================================================

/// Top-level hook output written to stdout on exit code 0.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Event-specific output fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

/// Event-specific output, tagged by `hookEventName`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    SessionStart(SessionStartOutput),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}
