// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Pure-query tools against the editor collaborator (§4.3): `find_references`,
//! `hover`, `diagnostics`, `list_buffers`, `quickfix`, `git-diff`, `staged-diff`.
//!
//! The editor integration itself — buffer state, diagnostics computation,
//! diff rendering — is an external collaborator whose internals are out of
//! scope (spec §1). This module only specifies the contract each tool needs
//! from it and adapts that contract into the `Tool` trait.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tool::{OutputCategory, Tool, ToolCall, ToolExecution};

/// The external collaborator these tools query. A production build wires in
/// an adapter that talks to the actual editor process; tests use a stub.
#[async_trait]
pub trait EditorCollaborator: Send + Sync {
    async fn find_references(&self, symbol: &str) -> Result<String, String>;
    async fn hover(&self, file_path: &str, line: u32, column: u32) -> Result<String, String>;
    async fn diagnostics(&self, file_path: Option<&str>) -> Result<String, String>;
    async fn list_buffers(&self) -> Result<String, String>;
    async fn quickfix(&self) -> Result<String, String>;
    async fn git_diff(&self) -> Result<String, String>;
    async fn staged_diff(&self) -> Result<String, String>;
    /// Flush unsaved changes for `file_path` to disk before a tool edits it
    /// out from under the editor. Called by `insert`/`replace`.
    async fn flush(&self, file_path: &str) -> Result<(), String>;
}

macro_rules! editor_query_tool {
    ($struct_name:ident, $tool_name:literal, $description:literal, $method:ident $(, $arg:ident : $arg_ty:ty)*) => {
        pub struct $struct_name<E: EditorCollaborator> {
            pub editor: std::sync::Arc<E>,
        }

        #[async_trait]
        impl<E: EditorCollaborator + 'static> Tool for $struct_name<E> {
            fn name(&self) -> &str {
                $tool_name
            }
            fn description(&self) -> &str {
                $description
            }
            fn parameters_schema(&self) -> Value {
                editor_query_tool!(@schema $($arg : $arg_ty),*)
            }
            fn is_read_only(&self) -> bool {
                true
            }
            fn output_category(&self) -> OutputCategory {
                OutputCategory::Generic
            }
            async fn execute(&self, call: &ToolCall) -> ToolExecution {
                editor_query_tool!(@call self, call, $method $(, $arg : $arg_ty)*)
            }
        }
    };
    (@schema) => {
        json!({ "type": "object", "properties": {}, "additionalProperties": false })
    };
    (@schema symbol: &str) => {
        json!({
            "type": "object",
            "properties": { "symbol": { "type": "string" } },
            "required": ["symbol"],
            "additionalProperties": false
        })
    };
    (@call $self:ident, $call:ident, $method:ident) => {
        match $self.editor.$method().await {
            Ok(text) => ToolExecution::text(text),
            Err(e) => ToolExecution::err(e),
        }
    };
    (@call $self:ident, $call:ident, $method:ident, symbol: &str) => {{
        match $call.args.get("symbol").and_then(|v| v.as_str()) {
            Some(symbol) => match $self.editor.$method(symbol).await {
                Ok(text) => ToolExecution::text(text),
                Err(e) => ToolExecution::err(e),
            },
            None => ToolExecution::err("missing required parameter 'symbol'"),
        }
    }};
}

editor_query_tool!(FindReferencesTool, "find_references", "Find references to a symbol across the workspace.", find_references, symbol: &str);
editor_query_tool!(ListBuffersTool, "list_buffers", "List currently open editor buffers.", list_buffers);
editor_query_tool!(QuickfixTool, "quickfix", "Return the editor's current quickfix list.", quickfix);
editor_query_tool!(GitDiffTool, "git-diff", "Return the unstaged git diff for the workspace.", git_diff);
editor_query_tool!(StagedDiffTool, "staged-diff", "Return the staged git diff for the workspace.", staged_diff);

pub struct HoverTool<E: EditorCollaborator> {
    pub editor: std::sync::Arc<E>,
}

#[async_trait]
impl<E: EditorCollaborator + 'static> Tool for HoverTool<E> {
    fn name(&self) -> &str {
        "hover"
    }
    fn description(&self) -> &str {
        "Show hover information (type, docs) at a file position."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "line": { "type": "integer" },
                "column": { "type": "integer" }
            },
            "required": ["file_path", "line", "column"],
            "additionalProperties": false
        })
    }
    fn is_read_only(&self) -> bool {
        true
    }
    async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let file_path = match call.args.get("file_path").and_then(|v| v.as_str()) {
            Some(p) => p,
            None => return ToolExecution::err("missing required parameter 'file_path'"),
        };
        let line = call.args.get("line").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let column = call.args.get("column").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        match self.editor.hover(file_path, line, column).await {
            Ok(text) => ToolExecution::text(text),
            Err(e) => ToolExecution::err(e),
        }
    }
}

pub struct DiagnosticsTool<E: EditorCollaborator> {
    pub editor: std::sync::Arc<E>,
}

#[async_trait]
impl<E: EditorCollaborator + 'static> Tool for DiagnosticsTool<E> {
    fn name(&self) -> &str {
        "diagnostics"
    }
    fn description(&self) -> &str {
        "Return editor diagnostics, optionally scoped to one file."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "file_path": { "type": "string" } },
            "additionalProperties": false
        })
    }
    fn is_read_only(&self) -> bool {
        true
    }
    async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let file_path = call.args.get("file_path").and_then(|v| v.as_str());
        match self.editor.diagnostics(file_path).await {
            Ok(text) => ToolExecution::text(text),
            Err(e) => ToolExecution::err(e),
        }
    }
}
