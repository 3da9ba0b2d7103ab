// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Stream Assembler (§4.1): folds a provider's event stream into a growing
//! assistant message. One assembler instance is used per streaming turn and
//! discarded once the turn's terminal event (`response_completed`,
//! `stream_error`, `aborted`) has been handled.

use serde_json::Value;

use agentcore_model::{
    BlockDelta, CheckpointId, ContentBlock, Message, StopReason, ToolRequest, ToolSchema, Usage,
};

use crate::error::AgentError;

/// Folds a single turn's provider events into an assistant [`Message`].
///
/// At most one block is ever "open" at a time (Invariant 3). The assistant
/// message itself is materialized lazily: it does not exist until the first
/// `block_stop` (Invariant 4).
#[derive(Debug, Default)]
pub struct Assembler {
    current_index: Option<usize>,
    current_block: Option<ContentBlock>,
    /// Raw JSON text accumulated for a `tool_use` block in progress; only
    /// meaningful while `current_block` is `Some(ContentBlock::ToolUse { .. })`.
    tool_json_buffer: String,
    message: Option<Message>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_block_start(&mut self, index: usize, block: ContentBlock) -> Result<(), AgentError> {
        if self.current_block.is_some() {
            return Err(AgentError::Protocol(format!(
                "block_start({index}) received while block {:?} is still open",
                self.current_index
            )));
        }
        self.tool_json_buffer.clear();
        self.current_index = Some(index);
        self.current_block = Some(block);
        Ok(())
    }

    pub fn on_block_delta(&mut self, index: usize, delta: BlockDelta) -> Result<(), AgentError> {
        if self.current_index != Some(index) {
            return Err(AgentError::Protocol(format!(
                "block_delta({index}) does not match open block {:?}",
                self.current_index
            )));
        }
        let block = self.current_block.as_mut().ok_or_else(|| {
            AgentError::Protocol(format!("block_delta({index}) received with no open block"))
        })?;

        match (block, delta) {
            (ContentBlock::Text { text, .. }, BlockDelta::TextDelta { text: d }) => {
                text.push_str(&d);
                Ok(())
            }
            (ContentBlock::Thinking { thinking, .. }, BlockDelta::ThinkingDelta { thinking: d }) => {
                thinking.push_str(&d);
                Ok(())
            }
            (ContentBlock::Thinking { signature, .. }, BlockDelta::SignatureDelta { signature: d }) => {
                signature.push_str(&d);
                Ok(())
            }
            (ContentBlock::ToolUse { .. }, BlockDelta::InputJsonDelta { partial_json }) => {
                self.tool_json_buffer.push_str(&partial_json);
                Ok(())
            }
            (ContentBlock::Text { citations, .. }, BlockDelta::CitationsDelta { citation }) => {
                citations.get_or_insert_with(Vec::new).push(citation);
                Ok(())
            }
            (block, delta) => Err(AgentError::Protocol(format!(
                "delta {delta:?} does not apply to block {block:?}"
            ))),
        }
    }

    pub fn on_block_stop(&mut self, index: usize, tools: &[ToolSchema]) -> Result<(), AgentError> {
        if self.current_index != Some(index) {
            return Err(AgentError::Protocol(format!(
                "block_stop({index}) does not match open block {:?}",
                self.current_index
            )));
        }
        let block = self
            .current_block
            .take()
            .ok_or_else(|| AgentError::Protocol(format!("block_stop({index}) with no open block")))?;
        self.current_index = None;

        let finalized = self.finalize_block(block, tools);
        self.message.get_or_insert_with(|| Message::assistant(Vec::new())).content.push(finalized);
        Ok(())
    }

    fn finalize_block(&mut self, block: ContentBlock, tools: &[ToolSchema]) -> ContentBlock {
        match block {
            ContentBlock::ToolUse { id, name, .. } => {
                let raw = std::mem::take(&mut self.tool_json_buffer);
                let request = match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => match tools.iter().find(|t| t.name == name) {
                        Some(schema) => match agentcore_model::schema::validate(&schema.parameters, &value) {
                            Ok(()) => ToolRequest::Ok(value),
                            Err(error) => ToolRequest::Err { raw_input: raw, error },
                        },
                        None => ToolRequest::Ok(value),
                    },
                    Err(e) => ToolRequest::Err { raw_input: raw, error: e.to_string() },
                };
                ContentBlock::ToolUse { id, name, request }
            }
            ContentBlock::Text { text, citations } => recognize_text_markers(text, citations),
            other => other,
        }
    }

    /// Replace the assembled content with the server's authoritative final
    /// view (§4.1 `response_completed`) and return the completed message.
    pub fn on_response_completed(
        &mut self,
        content: Vec<ContentBlock>,
        stop_reason: StopReason,
        usage: Usage,
    ) -> Message {
        self.current_index = None;
        self.current_block = None;
        self.tool_json_buffer.clear();
        let mut message = self.message.take().unwrap_or_else(|| Message::assistant(Vec::new()));
        message.content = content;
        message.stop_reason = Some(stop_reason);
        message.usage = Some(usage);
        message
    }

    /// Best-effort finalization used by Failure Cleanup: if a block is open,
    /// fold it in (without schema validation — the turn is ending abnormally
    /// anyway) and return whatever assistant message has been accumulated so
    /// far, if any.
    pub fn take_partial_message(&mut self) -> Option<Message> {
        if let Some(block) = self.current_block.take() {
            self.current_index = None;
            let finalized = self.finalize_block(block, &[]);
            self.message.get_or_insert_with(|| Message::assistant(Vec::new())).content.push(finalized);
        }
        self.message.take()
    }

    pub fn has_open_block(&self) -> bool {
        self.current_block.is_some()
    }
}

fn recognize_text_markers(text: String, citations: Option<Vec<serde_json::Value>>) -> ContentBlock {
    if let Some(id) = CheckpointId::parse_tag(&text) {
        return ContentBlock::Checkpoint { id };
    }
    if text == "<context_update>" {
        return ContentBlock::ContextUpdate { text: String::new() };
    }
    if text == "<system-reminder>" {
        return ContentBlock::SystemReminder { text: String::new() };
    }
    ContentBlock::Text { text, citations }
}
