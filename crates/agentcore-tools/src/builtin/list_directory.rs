// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_recursion::async_recursion;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::tool::{OutputCategory, Tool, ToolCall, ToolExecution};

static EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules", ".svn", "__pycache__", ".mypy_cache"];

fn is_excluded(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List directory contents. depth: default 2, max 5. limit: 100 entries \
         by default. Excludes .git/ target/ node_modules/. Directories have a \
         trailing /."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "depth": { "type": "integer", "description": "Maximum recursion depth (default 2, max 5)" },
                "limit": { "type": "integer", "description": "Maximum number of entries to return (default 100)" }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn output_category(&self) -> OutputCategory {
        OutputCategory::MatchList
    }

    async fn execute(&self, call: &ToolCall) -> ToolExecution {
        let path = match call.args.get("path").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => return ToolExecution::err("missing required parameter 'path'"),
        };
        let depth = call.args.get("depth").and_then(|v| v.as_u64()).unwrap_or(2).min(5) as usize;
        let limit = call.args.get("limit").and_then(|v| v.as_u64()).unwrap_or(100) as usize;

        debug!(path, depth, limit, "list_directory tool");

        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return ToolExecution::err(format!("not a directory: {path}")),
            Err(e) => return ToolExecution::err(format!("cannot access {path}: {e}")),
        }

        let mut entries = Vec::new();
        let mut truncated = false;
        collect_entries(&path, &path, 0, depth, limit, &mut entries, &mut truncated).await;

        if entries.is_empty() {
            return ToolExecution::text("(empty directory)");
        }

        let mut output = entries.join("\n");
        if truncated {
            output.push_str(&format!("\n...[output truncated at {limit} entries]"));
        }
        ToolExecution::text(output)
    }
}

fn relative_path(base: &str, full: &str) -> String {
    full.strip_prefix(base)
        .map(|s| s.trim_start_matches('/').to_string())
        .unwrap_or_else(|| full.to_string())
}

#[async_recursion]
async fn collect_entries(
    base: &str,
    dir: &str,
    level: usize,
    max_depth: usize,
    limit: usize,
    out: &mut Vec<String>,
    truncated: &mut bool,
) {
    if out.len() >= limit {
        *truncated = true;
        return;
    }

    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(_) => return,
    };

    let mut children: Vec<(String, bool)> = Vec::new();
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_excluded(&name) {
            continue;
        }
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        children.push((entry.path().to_string_lossy().into_owned(), is_dir));
    }
    children.sort();

    for (full_path, is_dir) in children {
        if out.len() >= limit {
            *truncated = true;
            return;
        }
        let rel = relative_path(base, &full_path);
        if is_dir {
            out.push(format!("{rel}/"));
            if level + 1 < max_depth {
                collect_entries(base, &full_path, level + 1, max_depth, limit, out, truncated).await;
            }
        } else {
            out.push(rel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_and_dirs_with_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "x").await.unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        let call = ToolCall { name: "list_directory".into(), args: json!({"path": dir.path().to_str().unwrap()}) };
        let out = ListDirectoryTool.execute(&call).await;
        let text = out.as_text().unwrap();
        assert!(text.contains("a.txt"));
        assert!(text.contains("sub/"));
    }

    #[tokio::test]
    async fn excludes_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join(".git")).await.unwrap();
        let call = ToolCall { name: "list_directory".into(), args: json!({"path": dir.path().to_str().unwrap()}) };
        let out = ListDirectoryTool.execute(&call).await;
        assert!(!out.as_text().unwrap().contains(".git"));
    }

    #[tokio::test]
    async fn non_directory_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        tokio::fs::write(&file, "x").await.unwrap();
        let call = ToolCall { name: "list_directory".into(), args: json!({"path": file.to_str().unwrap()}) };
        let out = ListDirectoryTool.execute(&call).await;
        assert!(matches!(out, ToolExecution::Err(_)));
    }

    #[tokio::test]
    async fn respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            tokio::fs::write(dir.path().join(format!("f{i}.txt")), "x").await.unwrap();
        }
        let call = ToolCall {
            name: "list_directory".into(),
            args: json!({"path": dir.path().to_str().unwrap(), "limit": 2}),
        };
        let out = ListDirectoryTool.execute(&call).await;
        let text = out.as_text().unwrap();
        assert!(text.contains("truncated"));
    }
}
