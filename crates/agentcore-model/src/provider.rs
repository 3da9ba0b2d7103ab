// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::content::{ContentBlock, Message, StopReason, Usage};

/// A JSON Schema (draft-07 style) tool description sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoicePolicy {
    Auto,
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoicePolicyOrName {
    Policy(ToolChoicePolicy),
    Tool { name: String },
}

/// How the model should pick a tool on this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChoice {
    pub policy: ToolChoicePolicyOrName,
    /// When true, the provider is asked to emit at most one `tool_use`
    /// block per turn instead of running tools in parallel.
    #[serde(default)]
    pub disable_parallel: bool,
}

impl Default for ToolChoice {
    fn default() -> Self {
        Self { policy: ToolChoicePolicyOrName::Policy(ToolChoicePolicy::Auto), disable_parallel: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
    pub enabled: bool,
    pub budget_tokens: u32,
}

/// An outbound request to a model provider.
///
/// `system` is the system prompt as a block sequence rather than a single
/// string so an ephemeral cache hint can be attached to the last cacheable
/// block (see `agentcore_core::cache`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: Vec<ContentBlock>,
    pub tools: Vec<ToolSchema>,
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub thinking: Option<ThinkingConfig>,
}

/// An incremental update to the block currently being assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    InputJsonDelta { partial_json: String },
    CitationsDelta { citation: serde_json::Value },
}

/// Inbound wire event from a provider stream, consumed by the Stream
/// Assembler (§4.1 of the agent-core specification).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderEvent {
    BlockStart { index: usize, block: ContentBlock },
    BlockDelta { index: usize, delta: BlockDelta },
    BlockStop { index: usize },
    ResponseCompleted { content: Vec<ContentBlock>, stop_reason: StopReason, usage: Usage },
    StreamError { message: String },
    Aborted,
}

pub type ProviderStream = Pin<Box<dyn Stream<Item = anyhow::Result<ProviderEvent>> + Send>>;

/// Boundary trait to a streaming LLM provider.
///
/// Deliberately narrow: the physical HTTP client, auth refresh, and the
/// multi-provider driver registry the system integrates with in production
/// are out of scope here. Implementations own everything below "emit
/// provider wire events"; this crate ships only [`crate::mock::MockProvider`]
/// and [`crate::mock::ScriptedMockProvider`] as test doubles.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send a completion request and return a streaming response.
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ProviderStream>;
}
