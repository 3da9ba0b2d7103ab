// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::ids::{CheckpointId, ToolRequestId};

/// Supported raster image media types for [`ContentBlock::Image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageMediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Sniff from magic bytes. Returns `None` for unrecognized/unsupported formats.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }
}

/// A citation attached to a text block. The wire shape is intentionally
/// opaque JSON — providers disagree on citation structure and the agent
/// core only needs to carry it through, not interpret it.
pub type Citation = serde_json::Value;

/// Outcome of validating a `tool_use` block's accumulated JSON input against
/// the tool's schema at `block_stop` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolRequest {
    /// Parsed and schema-validated.
    Ok(serde_json::Value),
    /// Parsing or validation failed; the raw accumulated string is kept so
    /// nothing is silently dropped.
    Err { raw_input: String, error: String },
}

/// A single piece of content inside a `tool_result`'s `ok` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultBlock {
    Text { text: String },
    Image { media_type: ImageMediaType, base64: String },
    Document { base64: String, title: Option<String> },
}

/// Outcome of a tool invocation, carried in [`ContentBlock::ToolResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultOutcome {
    Ok(Vec<ToolResultBlock>),
    Err(String),
}

/// One block within a message's content array.
///
/// This is a closed tagged union: every variant below is the full set the
/// system understands. Unknown provider block types are normalized away at
/// the provider-adapter boundary, never represented here (Invariant: no raw
/// string content).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        citations: Option<Vec<Citation>>,
    },
    Thinking {
        thinking: String,
        signature: String,
    },
    RedactedThinking {
        data: String,
    },
    Image {
        media_type: ImageMediaType,
        base64: String,
    },
    Document {
        /// Always `"application/pdf"` — the only document type the system
        /// carries; kept as a field (not a unit type) so the wire shape
        /// matches providers that send it explicitly.
        media_type: String,
        base64: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    ToolUse {
        id: ToolRequestId,
        name: String,
        request: ToolRequest,
    },
    ToolResult {
        id: ToolRequestId,
        result: ToolResultOutcome,
    },
    ServerToolUse {
        id: ToolRequestId,
        name: String,
        input: serde_json::Value,
    },
    WebSearchToolResult {
        tool_use_id: ToolRequestId,
        content: serde_json::Value,
    },
    SystemReminder {
        text: String,
    },
    ContextUpdate {
        text: String,
    },
    Checkpoint {
        id: CheckpointId,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into(), citations: None }
    }

    pub fn checkpoint(id: CheckpointId) -> Self {
        Self::Checkpoint { id }
    }

    pub fn is_empty_text_or_thinking(&self) -> bool {
        match self {
            Self::Text { text, .. } => text.is_empty(),
            Self::Thinking { thinking, .. } => thinking.is_empty(),
            _ => false,
        }
    }

    /// True for blocks that carry provider "scratch work" that should not
    /// survive into a kept trailing message after compaction.
    pub fn is_ephemeral_context(&self) -> bool {
        matches!(
            self,
            Self::Thinking { .. }
                | Self::RedactedThinking { .. }
                | Self::SystemReminder { .. }
                | Self::ContextUpdate { .. }
        )
    }

    /// True for blocks that must never receive a prompt-cache hint (§6).
    pub fn is_thinking(&self) -> bool {
        matches!(self, Self::Thinking { .. } | Self::RedactedThinking { .. })
    }

    pub fn as_checkpoint(&self) -> Option<&CheckpointId> {
        match self {
            Self::Checkpoint { id } => Some(id),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<(&ToolRequestId, &str, &ToolRequest)> {
        match self {
            Self::ToolUse { id, name, request } => Some((id, name, request)),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<(&ToolRequestId, &ToolResultOutcome)> {
        match self {
            Self::ToolResult { id, result } => Some((id, result)),
            _ => None,
        }
    }

    pub fn as_server_tool_use(&self) -> Option<&ToolRequestId> {
        match self {
            Self::ServerToolUse { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Why a turn stopped. Only assistant messages carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    PauseTurn,
    StopSequence,
    Refusal,
    Content,
    Aborted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: u32,
    pub cache_write_tokens: u32,
}

/// A single message in the thread's append-only log.
///
/// Only assistant messages carry `stop_reason`/`usage` (Invariant: content
/// model §3). User messages leave both `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Message {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self { role: Role::User, content, stop_reason: None, usage: None }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self { role: Role::Assistant, content, stop_reason: None, usage: None }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The `tool_use` blocks in this message, in source order.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&ToolRequestId, &str, &ToolRequest)> {
        self.content.iter().filter_map(ContentBlock::as_tool_use)
    }

    /// The set of `tool_use` ids in this message that have no matching
    /// `tool_result` anywhere later in `tail` (used by Failure Cleanup / fork).
    pub fn unresolved_tool_use_ids<'a>(&'a self, tail: &[Message]) -> Vec<&'a ToolRequestId> {
        let resolved: std::collections::HashSet<&ToolRequestId> = tail
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(ContentBlock::as_tool_result)
            .map(|(id, _)| id)
            .collect();
        self.tool_uses()
            .map(|(id, _, _)| id)
            .filter(|id| !resolved.contains(id))
            .collect()
    }
}
