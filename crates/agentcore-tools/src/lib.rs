// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod builtin;
pub mod instance;
pub mod manager;
pub mod permission;
pub mod registry;
pub mod tool;

pub use builtin::bash_command::BashCommandTool;
pub use builtin::compact::CompactTool;
pub use builtin::editor_query::{
    DiagnosticsTool, EditorCollaborator, FindReferencesTool, GitDiffTool, HoverTool,
    ListBuffersTool, QuickfixTool, StagedDiffTool,
};
pub use builtin::get_file::GetFileTool;
pub use builtin::insert::InsertTool;
pub use builtin::list_directory::ListDirectoryTool;
pub use builtin::replace::ReplaceTool;

pub use instance::{ToolInstance, ToolInstanceState};
pub use manager::{ProviderToolResult, ToolManager, ToolManagerError};
pub use permission::{glob_to_regex, PermissionDecision, PermissionGate};
pub use registry::ToolRegistry;
pub use tool::{OutputCategory, Tool, ToolCall, ToolExecution};
