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

/// `replace { file_path, find, replace }` (§4.3).
///
/// Finds the first occurrence of `find` and splices `replace` in its place.
/// `find == ""` replaces the whole file.
///
/// Before writing, the file's pre-edit bytes are snapshotted into a second
/// result block so a caller can diff against them later (§4.3).
#[derive(Default)]
pub struct ReplaceTool {
    pub editor: Option<Arc<dyn EditorCollaborator>>,
}

#[async_trait]
impl Tool for ReplaceTool {
    fn name(&self) -> &str {
        "replace"
    }

    fn description(&self) -> &str {
        "Replace the first occurrence of `find` in a file with `replace`. An \
         empty `find` replaces the whole file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "find": {
                    "type": "string",
                    "description": "Substring to replace; empty string replaces the whole file"
                },
                "replace": { "type": "string" }
            },
            "required": ["file_path", "find", "replace"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let file_path = match call.args.get("file_path").and_then(|v| v.as_str()) {
            Some(p) => p,
            None => return ToolExecution::err("missing required parameter 'file_path'"),
        };
        let find = match call.args.get("find").and_then(|v| v.as_str()) {
            Some(s) => s,
            None => return ToolExecution::err("missing required parameter 'find'"),
        };
        let replace = match call.args.get("replace").and_then(|v| v.as_str()) {
            Some(s) => s,
            None => return ToolExecution::err("missing required parameter 'replace'"),
        };

        debug!(file_path, "replace tool");

        if let Some(editor) = &self.editor {
            if let Err(e) = editor.flush(file_path).await {
                return ToolExecution::err(format!("failed to flush unsaved changes: {e}"));
            }
        }

        let existing = match tokio::fs::read_to_string(file_path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && find.is_empty() => String::new(),
            Err(e) => return ToolExecution::err(format!("read error: {e}")),
        };

        let new_text = if find.is_empty() {
            replace.to_string()
        } else {
            match existing.find(find) {
                Some(idx) => {
                    let mut out = String::with_capacity(existing.len() - find.len() + replace.len());
                    out.push_str(&existing[..idx]);
                    out.push_str(replace);
                    out.push_str(&existing[idx + find.len()..]);
                    out
                }
                None => {
                    return ToolExecution::err(format!("find string not found in {file_path}"))
                }
            }
        };

        match tokio::fs::write(file_path, new_text).await {
            Ok(()) => ToolExecution::Ok(vec![
                ToolResultBlock::Text { text: format!("replaced in {file_path}") },
                ToolResultBlock::Text { text: existing },
            ]),
            Err(e) => ToolExecution::err(format!("write error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        tokio::fs::write(&path, "foo foo").await.unwrap();
        let call = ToolCall {
            name: "replace".into(),
            args: json!({"file_path": path.to_str().unwrap(), "find": "foo", "replace": "bar"}),
        };
        let out = ReplaceTool::default().execute(&call).await;
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "bar foo");
        match out {
            ToolExecution::Ok(blocks) => match &blocks[1] {
                ToolResultBlock::Text { text } => assert_eq!(text, "foo foo"),
                _ => panic!("wrong variant"),
            },
            _ => panic!("expected ok"),
        }
    }

    #[tokio::test]
    async fn empty_find_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        tokio::fs::write(&path, "anything at all").await.unwrap();
        let call = ToolCall {
            name: "replace".into(),
            args: json!({"file_path": path.to_str().unwrap(), "find": "", "replace": "new contents"}),
        };
        ReplaceTool::default().execute(&call).await;
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "new contents");
    }

    #[tokio::test]
    async fn missing_find_returns_specific_err() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        tokio::fs::write(&path, "hello").await.unwrap();
        let call = ToolCall {
            name: "replace".into(),
            args: json!({"file_path": path.to_str().unwrap(), "find": "nope", "replace": "x"}),
        };
        let out = ReplaceTool::default().execute(&call).await;
        match out {
            ToolExecution::Err(msg) => assert!(msg.contains("not found")),
            _ => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn missing_file_for_nonempty_find_returns_err() {
        let call = ToolCall {
            name: "replace".into(),
            args: json!({"file_path": "/nonexistent/xyz", "find": "a", "replace": "b"}),
        };
        let out = ReplaceTool::default().execute(&call).await;
        assert!(matches!(out, ToolExecution::Err(_)));
    }
}
