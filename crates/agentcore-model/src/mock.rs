// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::content::{ContentBlock, StopReason, Usage};
use crate::ids::ToolRequestId;
use crate::provider::{CompletionRequest, ModelProvider, ProviderEvent, ProviderStream};

fn last_user_text(req: &CompletionRequest) -> String {
    req.messages
        .iter()
        .rev()
        .find(|m| m.role == crate::content::Role::User)
        .and_then(|m| {
            m.content.iter().find_map(|b| match b {
                ContentBlock::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
        })
        .unwrap_or_else(|| "[no input]".to_string())
}

/// Deterministic mock provider for tests. Echoes the last user message back
/// as a single-block assistant response, wrapped in the full block protocol
/// (`block_start` → `block_delta`* → `block_stop` → `response_completed`).
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ProviderStream> {
        let reply = format!("MOCK: {}", last_user_text(&req));
        let content = vec![ContentBlock::text(reply)];
        let events: Vec<anyhow::Result<ProviderEvent>> = vec![
            Ok(ProviderEvent::BlockStart { index: 0, block: content[0].clone() }),
            Ok(ProviderEvent::BlockStop { index: 0 }),
            Ok(ProviderEvent::ResponseCompleted {
                content,
                stop_reason: StopReason::EndTurn,
                usage: Usage { input_tokens: 10, output_tokens: 10, ..Default::default() },
            }),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// A pre-scripted mock provider. Each call to `complete` pops the next
/// response script (a full event sequence) from the front of the queue,
/// letting tests drive exact Stream Assembler scenarios without a network.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<Vec<Vec<ProviderEvent>>>>,
    name: String,
    pub last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl ScriptedMockProvider {
    pub fn new(scripts: Vec<Vec<ProviderEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            name: "scripted-mock".into(),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience: a single `block_start`/`block_stop`/`response_completed`
    /// turn that replies with plain text.
    pub fn always_text(reply: impl Into<String>) -> Self {
        let text = reply.into();
        let block = ContentBlock::text(text);
        Self::new(vec![vec![
            ProviderEvent::BlockStart { index: 0, block: block.clone() },
            ProviderEvent::BlockStop { index: 0 },
            ProviderEvent::ResponseCompleted {
                content: vec![block],
                stop_reason: StopReason::EndTurn,
                usage: Usage { input_tokens: 5, output_tokens: 5, ..Default::default() },
            },
        ]])
    }

    /// Convenience: a turn that emits one `tool_use` block then stops with
    /// `stop_reason: tool_use`.
    pub fn tool_call(tool_id: impl Into<String>, tool_name: impl Into<String>, input: serde_json::Value) -> Self {
        let id = ToolRequestId::new(tool_id.into());
        let block = ContentBlock::ToolUse { id, name: tool_name.into(), request: crate::content::ToolRequest::Ok(input) };
        Self::new(vec![vec![
            ProviderEvent::BlockStart { index: 0, block: block.clone() },
            ProviderEvent::BlockStop { index: 0 },
            ProviderEvent::ResponseCompleted {
                content: vec![block],
                stop_reason: StopReason::ToolUse,
                usage: Usage { input_tokens: 5, output_tokens: 5, ..Default::default() },
            },
        ]])
    }
}

#[async_trait]
impl ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        &self.name
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ProviderStream> {
        *self.last_request.lock().unwrap() = Some(req);
        let events = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                let block = ContentBlock::text("[no more scripts]");
                vec![
                    ProviderEvent::BlockStart { index: 0, block: block.clone() },
                    ProviderEvent::BlockStop { index: 0 },
                    ProviderEvent::ResponseCompleted {
                        content: vec![block],
                        stop_reason: StopReason::EndTurn,
                        usage: Usage::default(),
                    },
                ]
            } else {
                scripts.remove(0)
            }
        };
        let wrapped: Vec<anyhow::Result<ProviderEvent>> = events.into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(wrapped)))
    }
}
