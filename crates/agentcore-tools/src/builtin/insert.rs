// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use agentcore_model::ToolResultBlock;

use crate::builtin::editor_query::EditorCollaborator;
use crate::tool::{Tool, ToolCall, ToolExecution};

/// `insert { file_path, insert_after, content }` (§4.3).
///
/// Finds the first occurrence of `insert_after` and splices `content` in
/// right after it. `insert_after == ""` appends to the end of the file (or
/// creates it if missing). Writes are gated by the Permission Gate at the
/// Tool Manager, not here — this tool assumes it has already been approved.
///
/// When wired to an editor collaborator, unsaved changes for the target file
/// are flushed to disk first; a flush failure aborts the edit with `err`.
///
/// Before writing, the file's pre-edit bytes are snapshotted into a second
/// result block so a caller can diff against them later (§4.3).
#[derive(Default)]
pub struct InsertTool {
    pub editor: Option<Arc<dyn EditorCollaborator>>,
}

#[async_trait]
impl Tool for InsertTool {
    fn name(&self) -> &str {
        "insert"
    }

    fn description(&self) -> &str {
        "Insert content into a file immediately after the first occurrence of \
         `insert_after`. An empty `insert_after` appends to the file (creating \
         it if it doesn't exist)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "insert_after": {
                    "type": "string",
                    "description": "Substring to insert after; empty string appends/creates"
                },
                "content": { "type": "string" }
            },
            "required": ["file_path", "insert_after", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let file_path = match call.args.get("file_path").and_then(|v| v.as_str()) {
            Some(p) => p,
            None => return ToolExecution::err("missing required parameter 'file_path'"),
        };
        let insert_after = match call.args.get("insert_after").and_then(|v| v.as_str()) {
            Some(s) => s,
            None => return ToolExecution::err("missing required parameter 'insert_after'"),
        };
        let content = match call.args.get("content").and_then(|v| v.as_str()) {
            Some(s) => s,
            None => return ToolExecution::err("missing required parameter 'content'"),
        };

        debug!(file_path, "insert tool");

        if let Some(editor) = &self.editor {
            if let Err(e) = editor.flush(file_path).await {
                return ToolExecution::err(format!("failed to flush unsaved changes: {e}"));
            }
        }

        let existing = match tokio::fs::read_to_string(file_path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return ToolExecution::err(format!("read error: {e}")),
        };

        let snapshot = existing.clone();

        let new_text = if insert_after.is_empty() {
            format!("{existing}{content}")
        } else {
            match existing.find(insert_after) {
                Some(idx) => {
                    let split_at = idx + insert_after.len();
                    let (head, tail) = existing.split_at(split_at);
                    format!("{head}{content}{tail}")
                }
                None => {
                    return ToolExecution::err(format!(
                        "insert_after string not found in {file_path}"
                    ))
                }
            }
        };

        match tokio::fs::write(file_path, new_text).await {
            Ok(()) => ToolExecution::Ok(vec![
                ToolResultBlock::Text { text: format!("inserted into {file_path}") },
                ToolResultBlock::Text { text: snapshot },
            ]),
            Err(e) => ToolExecution::err(format!("write error: {e}")),
        }
    }
}
