//! Hook wire types.
//!
//! - `HookEvent`: the host events that invoke the coordination core
//! - `HookInput`: the JSON object read from stdin
//! - `HookResponse`: the JSON object written to stdout

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host lifecycle events that reach the coordination core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookEvent {
    /// Before a tool runs (authorization gate)
    PreToolUse,
    /// After a tool ran (transition detector)
    PostToolUse,
    /// Host session opened (session activation)
    SessionStart,
    /// A worker subagent finished (audit trail)
    SubagentStop,
}

impl HookEvent {
    pub fn all() -> &'static [HookEvent] {
        &[
            HookEvent::PreToolUse,
            HookEvent::PostToolUse,
            HookEvent::SessionStart,
            HookEvent::SubagentStop,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "pre-tool-use",
            HookEvent::PostToolUse => "post-tool-use",
            HookEvent::SessionStart => "session-start",
            HookEvent::SubagentStop => "subagent-stop",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HookEvent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "pre-tool-use" | "pretooluse" => Ok(HookEvent::PreToolUse),
            "post-tool-use" | "posttooluse" => Ok(HookEvent::PostToolUse),
            "session-start" | "sessionstart" => Ok(HookEvent::SessionStart),
            "subagent-stop" | "subagentstop" => Ok(HookEvent::SubagentStop),
            _ => anyhow::bail!(
                "Unknown hook event: {} (expected one of: pre-tool-use, post-tool-use, session-start, subagent-stop)",
                s
            ),
        }
    }
}

/// One hook invocation as sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    /// Result of an executed tool (post-tool-use only)
    #[serde(default)]
    pub output: Value,
}

impl HookInput {
    /// Parse stdin. Blank input is an empty invocation.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    /// The tool's textual result.
    ///
    /// Accepts a plain string or an object carrying `stdout`/`stderr`/`output`
    /// fields, which are joined in that order.
    pub fn output_text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            Value::Object(map) => ["stdout", "stderr", "output"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }
}

/// The decision printed back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResponse {
    #[serde(rename = "continue")]
    pub cont: bool,
    #[serde(
        rename = "hookSpecificOutput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<Value>,
}

impl HookResponse {
    /// Let the action through with nothing to report.
    pub fn pass() -> Self {
        Self {
            cont: true,
            output: None,
        }
    }

    /// Let the action through and attach event-specific output.
    pub fn proceed(output: Value) -> Self {
        Self {
            cont: true,
            output: Some(output),
        }
    }

    /// Stop the action.
    pub fn block(output: Value) -> Self {
        Self {
            cont: false,
            output: Some(output),
        }
    }

    pub fn should_continue(&self) -> bool {
        self.cont
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"continue":true}"#.to_string())
    }
}
