// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The Agent (§4.2): owns one message log and drives it through a single
//! streaming turn at a time. Tool dispatch, checkpoint bookkeeping, and
//! compaction policy live one layer up in [`crate::thread::Thread`]; the
//! Agent only knows how to append messages, stream a completion, and clean
//! up after itself when a turn ends abnormally.

use std::sync::Arc;

use agentcore_model::{
    CompletionRequest, ContentBlock, Message, ModelProvider, ProviderEvent, Role, StopReason,
    ThinkingConfig, ToolChoice, ToolRequestId, ToolResultOutcome, ToolSchema, Usage,
};

use crate::assembler::Assembler;
use crate::compact::{compact as compact_messages, Replacement};
use crate::error::AgentError;
use crate::events::{AgentEvent, EventDispatcher, StopCause};

/// Where the Agent is in its lifecycle. Transitions are totally ordered
/// within one turn: `Idle -> Streaming -> (WaitingForToolResults | Stopped |
/// Failed)`, and back to `Idle` once the caller supplies what's needed to
/// continue (Testable Property: Ordering).
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// No turn in flight; ready to accept `append_user`/`continue_conversation`.
    Idle,
    /// A completion request is in flight.
    Streaming,
    /// The last assistant message ended with `stop_reason: tool_use` and at
    /// least one `tool_use` block has no matching `tool_result` yet.
    WaitingForToolResults,
    /// The turn ended normally.
    Stopped(StopReason),
    /// The turn ended because of an unrecoverable error (§7).
    Failed(String),
}

/// Everything needed to build the next [`CompletionRequest`].
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub tool_choice: Option<ToolChoice>,
    pub thinking: Option<ThinkingConfig>,
}

pub struct Agent {
    provider: Arc<dyn ModelProvider>,
    config: AgentConfig,
    system: Vec<ContentBlock>,
    tools: Vec<ToolSchema>,
    messages: Vec<Message>,
    status: Status,
    /// Usage of the most recently completed turn. Monotonic: never reset to
    /// `None` once set, including across `abort`/`Failed` (Testable
    /// Property: Usage preservation).
    latest_usage: Option<Usage>,
    dispatcher: EventDispatcher,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        config: AgentConfig,
        system: Vec<ContentBlock>,
        tools: Vec<ToolSchema>,
    ) -> (Self, tokio::sync::mpsc::UnboundedReceiver<AgentEvent>) {
        let (dispatcher, rx) = EventDispatcher::new();
        let agent = Self {
            provider,
            config,
            system,
            tools,
            messages: Vec::new(),
            status: Status::Idle,
            latest_usage: None,
            dispatcher,
        };
        (agent, rx)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn latest_usage(&self) -> Option<Usage> {
        self.latest_usage
    }

    /// Append a user-authored message. Valid from `Idle` only — a turn must
    /// finish (or be aborted) before a new one starts.
    pub fn append_user(&mut self, content: Vec<ContentBlock>) -> Result<(), AgentError> {
        self.require_idle("append_user")?;
        self.messages.push(Message::user(content));
        Ok(())
    }

    /// Supply the result of a tool invocation. Appends (or extends, if the
    /// previous message is already a bare tool_result carrier) a user
    /// message carrying a `tool_result` block and, once every outstanding
    /// `tool_use` has been answered, moves back to `Idle`.
    pub fn tool_result(&mut self, id: ToolRequestId, result: ToolResultOutcome) -> Result<(), AgentError> {
        if self.status != Status::WaitingForToolResults {
            return Err(AgentError::Protocol(format!(
                "tool_result called while status is {:?}, expected WaitingForToolResults",
                self.status
            )));
        }
        let block = ContentBlock::ToolResult { id, result };
        match self.messages.last_mut() {
            Some(m) if m.role == Role::User && m.content.iter().all(|b| b.as_tool_result().is_some()) => {
                m.content.push(block);
            }
            _ => self.messages.push(Message::user(vec![block])),
        }
        if self.all_tool_uses_resolved() {
            self.status = Status::Idle;
        }
        Ok(())
    }

    fn all_tool_uses_resolved(&self) -> bool {
        match self.messages.iter().rfind(|m| m.role == Role::Assistant) {
            Some(assistant_msg) => {
                let idx = self
                    .messages
                    .iter()
                    .position(|m| std::ptr::eq(m, assistant_msg))
                    .unwrap();
                let tail = &self.messages[idx + 1..];
                assistant_msg.unresolved_tool_use_ids(tail).is_empty()
            }
            None => true,
        }
    }

    /// Stream one completion from the provider, folding events through the
    /// [`Assembler`], dispatching [`AgentEvent`]s, and landing in
    /// `WaitingForToolResults`, `Stopped`, or `Failed`.
    pub async fn continue_conversation(&mut self) -> Result<(), AgentError> {
        self.require_idle("continue_conversation")?;
        self.status = Status::Streaming;

        let req = CompletionRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: self.system.clone(),
            tools: self.tools.clone(),
            tool_choice: self.config.tool_choice.clone(),
            messages: self.messages.clone(),
            thinking: self.config.thinking.clone(),
        };

        let mut stream = match self.provider.complete(req).await {
            Ok(s) => s,
            Err(e) => return self.fail(AgentError::Stream(e.to_string())),
        };

        let mut assembler = Assembler::new();
        use futures::StreamExt;
        loop {
            let event = match stream.next().await {
                Some(Ok(ev)) => ev,
                Some(Err(e)) => return self.fail(AgentError::Stream(e.to_string())),
                None => {
                    return self.fail(AgentError::Stream(
                        "provider stream ended without response_completed".into(),
                    ))
                }
            };

            match event {
                ProviderEvent::BlockStart { index, block } => {
                    if let Err(e) = assembler.on_block_start(index, block) {
                        return self.fail(e);
                    }
                    self.dispatcher.emit(AgentEvent::ContentUpdated);
                }
                ProviderEvent::BlockDelta { index, delta } => {
                    if let Err(e) = assembler.on_block_delta(index, delta) {
                        return self.fail(e);
                    }
                    self.dispatcher.emit(AgentEvent::ContentUpdated);
                }
                ProviderEvent::BlockStop { index } => {
                    if let Err(e) = assembler.on_block_stop(index, &self.tools) {
                        return self.fail(e);
                    }
                    self.dispatcher.emit(AgentEvent::ContentUpdated);
                }
                ProviderEvent::ResponseCompleted { content, stop_reason, usage } => {
                    let message = assembler.on_response_completed(content, stop_reason, usage);
                    self.latest_usage = Some(usage);
                    self.messages.push(message);
                    self.land_after_response(stop_reason);
                    return Ok(());
                }
                ProviderEvent::StreamError { message } => {
                    return self.fail_with_cleanup(&mut assembler, AgentError::Stream(message));
                }
                ProviderEvent::Aborted => {
                    return self.abort_with_assembler(&mut assembler);
                }
            }
        }
    }

    fn land_after_response(&mut self, stop_reason: StopReason) {
        let waiting_on_tools = stop_reason == StopReason::ToolUse && !self.all_tool_uses_resolved();
        self.status = if waiting_on_tools { Status::WaitingForToolResults } else { Status::Stopped(stop_reason) };
        let cause = match stop_reason {
            StopReason::ToolUse if waiting_on_tools => None,
            StopReason::ToolUse => Some(StopCause::ToolUse),
            StopReason::EndTurn => Some(StopCause::EndTurn),
            StopReason::MaxTokens => Some(StopCause::MaxTokens),
            StopReason::Aborted => Some(StopCause::Aborted),
            _ => Some(StopCause::EndTurn),
        };
        if let Some(reason) = cause {
            self.dispatcher.emit(AgentEvent::Stopped { reason });
        }
    }

    /// Cancel an in-flight turn. A no-op outside `Streaming`/
    /// `WaitingForToolResults` (there's nothing to cancel).
    ///
    /// Unlike [`Self::abort_with_assembler`] (used when the provider stream
    /// itself reports an abort mid-response), this has no `Assembler` to
    /// pull a partial message from — when called while
    /// `WaitingForToolResults`, the triggering assistant message already
    /// landed in `self.messages`, so unresolved `tool_use`s are synthesized
    /// directly against the log instead (Invariant: Pairing).
    pub fn abort(&mut self) -> Result<(), AgentError> {
        match self.status {
            Status::WaitingForToolResults => {
                self.synthesize_results_for_unresolved_tool_uses(
                    "The turn was interrupted before this tool could run (aborted).",
                );
                self.status = Status::Stopped(StopReason::Aborted);
                self.dispatcher.emit(AgentEvent::Stopped { reason: StopCause::Aborted });
                Ok(())
            }
            Status::Streaming => {
                self.status = Status::Stopped(StopReason::Aborted);
                self.dispatcher.emit(AgentEvent::Stopped { reason: StopCause::Aborted });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Append a synthetic `tool_result{err}` for every `tool_use` in the
    /// last assistant message that has no matching result yet.
    fn synthesize_results_for_unresolved_tool_uses(&mut self, err_text: &str) {
        let Some(assistant_idx) = self.messages.iter().rposition(|m| m.role == Role::Assistant) else {
            return;
        };
        let (head, tail) = self.messages.split_at(assistant_idx + 1);
        let unresolved: Vec<ToolRequestId> =
            head[assistant_idx].unresolved_tool_use_ids(tail).into_iter().cloned().collect();
        if unresolved.is_empty() {
            return;
        }
        let results: Vec<ContentBlock> = unresolved
            .into_iter()
            .map(|id| ContentBlock::ToolResult { id, result: ToolResultOutcome::Err(err_text.to_string()) })
            .collect();
        self.messages.push(Message::user(results));
    }

    fn abort_with_assembler(&mut self, assembler: &mut Assembler) -> Result<(), AgentError> {
        let partial = assembler.take_partial_message();
        self.apply_failure_cleanup(partial, "aborted");
        self.status = Status::Stopped(StopReason::Aborted);
        self.dispatcher.emit(AgentEvent::Stopped { reason: StopCause::Aborted });
        Ok(())
    }

    fn fail(&mut self, error: AgentError) -> Result<(), AgentError> {
        self.status = Status::Failed(error.to_string());
        self.dispatcher.emit(AgentEvent::Error { message: error.to_string() });
        Err(error)
    }

    fn fail_with_cleanup(&mut self, assembler: &mut Assembler, error: AgentError) -> Result<(), AgentError> {
        let partial = assembler.take_partial_message();
        self.apply_failure_cleanup(partial, &error.to_string());
        self.fail(error)
    }

    /// Failure Cleanup (§4.2): given whatever was assembled before the turn
    /// ended abnormally, decide what (if anything) to append to the log.
    ///
    /// 1. If the last block is `server_tool_use`, drop it — no result can
    ///    ever arrive for it.
    /// 2. Else, for every `tool_use` left unresolved, synthesize a
    ///    `tool_result{err}` in a trailing user message so the log never
    ///    carries a dangling tool_use (Invariant: Pairing).
    /// 3. Else, drop trailing empty `text`/`thinking` blocks — an
    ///    interruption mid-block leaves no useful content.
    fn apply_failure_cleanup(&mut self, partial: Option<Message>, reason: &str) {
        let Some(mut message) = partial else { return };
        if message.content.is_empty() {
            return;
        }

        if matches!(message.content.last(), Some(ContentBlock::ServerToolUse { .. })) {
            message.content.pop();
        }

        while matches!(message.content.last(), Some(b) if b.is_empty_text_or_thinking()) {
            message.content.pop();
        }

        let unresolved: Vec<ToolRequestId> =
            message.tool_uses().map(|(id, _, _)| id.clone()).collect();

        if message.content.is_empty() && unresolved.is_empty() {
            return;
        }
        message.stop_reason.get_or_insert(StopReason::Aborted);
        self.messages.push(message);

        if !unresolved.is_empty() {
            let err_text = format!("The turn was interrupted before this tool could run ({reason}).");
            let results: Vec<ContentBlock> = unresolved
                .into_iter()
                .map(|id| ContentBlock::ToolResult { id, result: ToolResultOutcome::Err(err_text.clone()) })
                .collect();
            self.messages.push(Message::user(results));
        }
    }

    /// Compact (§4.6 step 6): replace the resolved ranges with their
    /// summaries and land in `Stopped(EndTurn)` — a compaction always
    /// concludes the current turn outright rather than resuming it.
    /// `truncate_idx`, when given, backstops any replacement that didn't
    /// already set one of its own (the `@compact` command path sets it per
    /// replacement already; this lets a caller impose it uniformly instead).
    pub fn compact(&mut self, mut replacements: Vec<Replacement>, truncate_idx: Option<usize>) {
        if let Some(idx) = truncate_idx {
            for r in &mut replacements {
                r.truncate_idx.get_or_insert(idx);
            }
        }
        self.messages = compact_messages(&self.messages, &replacements);
        self.status = Status::Stopped(StopReason::EndTurn);
    }

    /// Drop every message from `index` onward. Used by the Compactor to
    /// rebuild the log after resolving replacements.
    pub fn truncate(&mut self, index: usize) {
        self.messages.truncate(index);
        self.status = Status::Idle;
    }

    /// Replace the whole log (used by the Compactor once it has computed the
    /// post-compaction message sequence).
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Clone Semantics (§4.7): deep-copy this agent into an independent
    /// fork. Fails if a turn is in flight — forking mid-stream has no
    /// well-defined assistant message to hand to the copy. Any unresolved
    /// `tool_use` in the copy is resolved with a synthetic
    /// `tool_result{err}` (the original tool execution, if any, keeps
    /// running against the original only) and status is forced to
    /// `Stopped(EndTurn)` with a fresh event dispatcher.
    pub fn fork(&self) -> Result<(Self, tokio::sync::mpsc::UnboundedReceiver<AgentEvent>), AgentError> {
        if self.status == Status::Streaming {
            return Err(AgentError::Protocol("cannot fork while streaming".into()));
        }

        let mut messages = self.messages.clone();
        if let Some(assistant_msg) = messages.iter().rposition(|m| m.role == Role::Assistant) {
            let (head, tail) = messages.split_at(assistant_msg + 1);
            let unresolved: Vec<ToolRequestId> =
                head[assistant_msg].unresolved_tool_use_ids(tail).into_iter().cloned().collect();
            if !unresolved.is_empty() {
                let results: Vec<ContentBlock> = unresolved
                    .into_iter()
                    .map(|id| {
                        ContentBlock::ToolResult {
                            id,
                            result: ToolResultOutcome::Err(
                                "The thread was forked before the tool could execute.".into(),
                            ),
                        }
                    })
                    .collect();
                messages.push(Message::user(results));
            }
        }

        let (dispatcher, rx) = EventDispatcher::new();
        let forked = Self {
            provider: Arc::clone(&self.provider),
            config: AgentConfig {
                model: self.config.model.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                tool_choice: self.config.tool_choice.clone(),
                thinking: self.config.thinking.clone(),
            },
            system: self.system.clone(),
            tools: self.tools.clone(),
            messages,
            status: Status::Stopped(StopReason::EndTurn),
            latest_usage: self.latest_usage,
            dispatcher,
        };
        Ok((forked, rx))
    }

    fn require_idle(&self, op: &str) -> Result<(), AgentError> {
        if self.status == Status::Idle {
            Ok(())
        } else {
            Err(AgentError::Protocol(format!("{op} called while status is {:?}, expected Idle", self.status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_model::{ContentBlock, ScriptedMockProvider};
    use serde_json::json;

    fn agent_with(provider: ScriptedMockProvider) -> (Agent, tokio::sync::mpsc::UnboundedReceiver<AgentEvent>) {
        let config = AgentConfig { model: "mock".into(), max_tokens: 100, temperature: None, tool_choice: None, thinking: None };
        Agent::new(Arc::new(provider), config, vec![], vec![])
    }

    #[tokio::test]
    async fn plain_text_turn_lands_in_stopped_end_turn() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::always_text("hi there"));
        agent.append_user(vec![ContentBlock::text("hello")]).unwrap();
        agent.continue_conversation().await.unwrap();
        assert_eq!(agent.status(), &Status::Stopped(StopReason::EndTurn));
        assert_eq!(agent.latest_usage().unwrap().input_tokens, 5);
    }

    #[tokio::test]
    async fn tool_use_turn_lands_in_waiting_for_tool_results() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::tool_call("t1", "get_file", json!({"path": "a"})));
        agent.append_user(vec![ContentBlock::text("read a")]).unwrap();
        agent.continue_conversation().await.unwrap();
        assert_eq!(agent.status(), &Status::WaitingForToolResults);
    }

    #[tokio::test]
    async fn tool_result_returns_agent_to_idle_once_all_resolved() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::tool_call("t1", "get_file", json!({"path": "a"})));
        agent.append_user(vec![ContentBlock::text("read a")]).unwrap();
        agent.continue_conversation().await.unwrap();
        agent
            .tool_result(ToolRequestId::new("t1"), ToolResultOutcome::Ok(vec![]))
            .unwrap();
        assert_eq!(agent.status(), &Status::Idle);
    }

    #[tokio::test]
    async fn append_user_while_streaming_is_rejected() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::always_text("hi"));
        agent.append_user(vec![ContentBlock::text("hello")]).unwrap();
        agent.status = Status::Streaming;
        let err = agent.append_user(vec![ContentBlock::text("again")]);
        assert!(matches!(err, Err(AgentError::Protocol(_))));
    }

    #[tokio::test]
    async fn abort_synthesizes_tool_result_err_for_unresolved_tool_use() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::tool_call("t1", "get_file", json!({"path": "a"})));
        agent.append_user(vec![ContentBlock::text("read a")]).unwrap();
        agent.continue_conversation().await.unwrap();
        agent.abort().unwrap();
        let last = agent.messages().last().unwrap();
        match &last.content[0] {
            ContentBlock::ToolResult { result: ToolResultOutcome::Err(msg), .. } => {
                assert!(msg.contains("interrupted"));
            }
            other => panic!("expected synthesized tool_result err, got {other:?}"),
        }
        assert_eq!(agent.status(), &Status::Stopped(StopReason::Aborted));
    }

    #[tokio::test]
    async fn fork_fails_while_streaming() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::always_text("hi"));
        agent.status = Status::Streaming;
        assert!(agent.fork().is_err());
    }

    #[tokio::test]
    async fn fork_resolves_unresolved_tool_use_and_lands_stopped() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::tool_call("t1", "get_file", json!({"path": "a"})));
        agent.append_user(vec![ContentBlock::text("read a")]).unwrap();
        agent.continue_conversation().await.unwrap();
        let (forked, _rx2) = agent.fork().unwrap();
        assert_eq!(forked.status(), &Status::Stopped(StopReason::EndTurn));
        let last = forked.messages().last().unwrap();
        assert!(matches!(last.content[0], ContentBlock::ToolResult { result: ToolResultOutcome::Err(_), .. }));
    }

    #[tokio::test]
    async fn fork_preserves_latest_usage() {
        let (mut agent, _rx) = agent_with(ScriptedMockProvider::always_text("hi"));
        agent.append_user(vec![ContentBlock::text("hello")]).unwrap();
        agent.continue_conversation().await.unwrap();
        let (forked, _rx2) = agent.fork().unwrap();
        assert_eq!(forked.latest_usage(), agent.latest_usage());
    }
}
