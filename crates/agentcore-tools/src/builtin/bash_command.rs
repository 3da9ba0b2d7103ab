// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::tool::{OutputCategory, Tool, ToolCall, ToolExecution};

/// Hard ceiling (§4.3, §6): no config value can raise this, only lower the
/// effective per-call timeout below it.
const HARD_TIMEOUT: Duration = Duration::from_secs(60);

pub struct BashCommandTool;

#[async_trait]
impl Tool for BashCommandTool {
    fn name(&self) -> &str {
        "bash_command"
    }

    fn description(&self) -> &str {
        "Run a shell command and capture stdout/stderr/exit code. Subject to \
         the command allowlist. Hard 60s timeout — avoid interactive or \
         non-terminating commands (no foreground server processes, no prompts \
         awaiting stdin)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "cwd": { "type": "string" }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn output_category(&self) -> OutputCategory {
        OutputCategory::HeadTail
    }

    async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let command = match call.args.get("command").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolExecution::err("missing required parameter 'command'"),
        };
        let cwd = call.args.get("cwd").and_then(|v| v.as_str());

        debug!(command, "bash_command tool");

        let mut cmd = tokio::process::Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let result = tokio::time::timeout(HARD_TIMEOUT, cmd.output()).await;

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let code = output.status.code().unwrap_or(-1);
                ToolExecution::text(format!(
                    "exit code: {code}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}"
                ))
            }
            Ok(Err(e)) => ToolExecution::err(format!("failed to spawn command: {e}")),
            Err(_) => ToolExecution::err(format!(
                "command timed out after {}s",
                HARD_TIMEOUT.as_secs()
            )),
        }
    }
}
