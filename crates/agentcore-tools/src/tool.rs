// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::Value;

use agentcore_model::{ToolResultBlock, ToolResultOutcome};

/// A single tool invocation requested by the model, already split out of
/// the assembled `tool_use` block by the Tool Manager.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    /// Schema-validated JSON arguments.
    pub args: Value,
}

/// Describes the shape of a tool's text output for context-aware truncation.
///
/// When a tool result exceeds the configured token cap, the caller uses this
/// category to pick the right extraction strategy. Each tool declares its
/// own category; callers never hard-code tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputCategory {
    /// Terminal / process output: keep the first 60 + last 40 lines so both
    /// the command preamble and the final result are visible.
    HeadTail,
    /// Ordered match list: keep the leading matches so the model sees the
    /// highest-relevance results first.
    MatchList,
    /// File content: keep a head and tail window with a separator so the
    /// model sees both the top of the file and the end.
    FileContent,
    /// Generic text: hard-truncate at the character boundary.
    #[default]
    Generic,
}

/// Trait every built-in tool implements.
///
/// Execution never returns a Rust `Err` for tool-local failure: per the
/// specification's error design, tool failures are preserved inline as
/// `tool_result { err }` and always surface through the `Ok` side of this
/// trait's return type. A Rust `Err` here means the call could not even be
/// attempted (e.g. malformed arguments past schema validation) and is turned
/// into an error outcome by the caller.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema (draft-07 style) for the tool's input object.
    fn parameters_schema(&self) -> Value;

    /// Read-only tools skip the `pending-user-action` state and the
    /// Permission Gate entirely (§4.3: "read-only tools skip to done").
    fn is_read_only(&self) -> bool {
        false
    }

    fn output_category(&self) -> OutputCategory {
        OutputCategory::Generic
    }

    async fn execute(&self, call: &ToolCall) -> ToolExecution;
}

/// What a tool invocation actually produced, before the Tool Manager wraps
/// it with the request id into a `ProviderToolResult`.
#[derive(Debug, Clone)]
pub enum ToolExecution {
    Ok(Vec<ToolResultBlock>),
    Err(String),
}

impl ToolExecution {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Ok(vec![ToolResultBlock::Text { text: text.into() }])
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self::Err(msg.into())
    }

    pub fn into_outcome(self) -> ToolResultOutcome {
        match self {
            Self::Ok(blocks) => ToolResultOutcome::Ok(blocks),
            Self::Err(msg) => ToolResultOutcome::Err(msg),
        }
    }

    /// The concatenated text of a single-text-block `Ok` result, if that's
    /// all it contains. Convenience for tests and simple callers.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Ok(blocks) => match blocks.as_slice() {
                [ToolResultBlock::Text { text }] => Some(text.clone()),
                _ => None,
            },
            Self::Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MinimalTool;

    #[async_trait]
    impl Tool for MinimalTool {
        fn name(&self) -> &str {
            "minimal"
        }
        fn description(&self) -> &str {
            "a minimal tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _call: &ToolCall) -> ToolExecution {
            ToolExecution::text("ok")
        }
    }

    #[test]
    fn default_output_category_is_generic() {
        assert_eq!(MinimalTool.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn default_is_read_only_is_false() {
        assert!(!MinimalTool.is_read_only());
    }

    #[test]
    fn tool_execution_err_converts_to_err_outcome() {
        let exec = ToolExecution::err("boom");
        match exec.into_outcome() {
            ToolResultOutcome::Err(msg) => assert_eq!(msg, "boom"),
            _ => panic!("expected err outcome"),
        }
    }
}
