// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tool::{Tool, ToolCall, ToolExecution};

/// `compact { summary, from?, to? }` (§4.3).
///
/// Registered so its schema reaches the provider's tool list, but it is
/// never actually dispatched through [`crate::registry::ToolRegistry`]: the
/// turn loop recognizes a `tool_use` named `compact` and routes it directly
/// to `Agent::compact` before the Tool Manager ever sees it. `execute` here
/// only exists to satisfy the `Tool` trait and should be unreachable in a
/// correctly wired turn loop.
pub struct CompactTool;

#[async_trait]
impl Tool for CompactTool {
    fn name(&self) -> &str {
        "compact"
    }

    fn description(&self) -> &str {
        "Summarize and prune conversation history. Intercepted by the turn \
         loop and routed to Agent::compact; never executed as an ordinary tool."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "from": { "type": "string", "description": "checkpoint id (optional)" },
                "to": { "type": "string", "description": "checkpoint id (optional)" }
            },
            "required": ["summary"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, _call: &ToolCall) -> ToolExecution {
        ToolExecution::err("compact must be intercepted by the turn loop, not executed directly")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_execution_is_rejected() {
        let call = ToolCall { name: "compact".into(), args: json!({"summary": "s"}) };
        let out = CompactTool.execute(&call).await;
        assert!(matches!(out, ToolExecution::Err(_)));
    }

    #[test]
    fn schema_requires_summary() {
        let schema = CompactTool.parameters_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "summary"));
    }
}
