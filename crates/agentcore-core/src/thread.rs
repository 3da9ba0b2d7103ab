// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Thread (§4.5): orchestrates one conversation on top of an [`Agent`] — runs
//! the per-turn loop (stream a completion, dispatch any resulting
//! `tool_use`s, feed results back, repeat until the turn lands on a terminal
//! status), intercepts the `compact` tool and the `@compact` command, and
//! implements Fork.

use std::sync::Arc;

use agentcore_model::{
    ContentBlock, IdSource, MessageId, RandomIdSource, Role, ThreadId, ToolRequest, ToolRequestId,
    ToolResultOutcome,
};
use agentcore_tools::{PermissionGate, ToolManager, ToolRegistry};

use crate::agent::{Agent, Status};
use crate::compact::{compact_command_replacement, Replacement};
use crate::error::AgentError;
use crate::events::AgentEvent;

/// One unit of input to [`Thread::run_turn`].
pub enum Turn {
    /// Ordinary user message content.
    User(Vec<ContentBlock>),
    /// An already-generated `@compact` summary (§4.5). Generating the
    /// summary text itself is a side channel this crate doesn't own — by the
    /// time it reaches here, the summary already exists.
    Compact(String),
}

pub struct Thread {
    id: ThreadId,
    agent: Agent,
    tool_manager: ToolManager,
    // Kept alongside `tool_manager` (which doesn't expose them back out) so
    // `fork()` can build a fresh manager without reaching into the old one.
    registry: Arc<ToolRegistry>,
    gate: Arc<PermissionGate>,
    max_tool_rounds: u32,
    /// Mints the `checkpoint{id}` block prepended to every user turn (§4.5
    /// step 2) so the Compactor always has a checkpoint to address.
    id_source: Arc<dyn IdSource>,
}

impl Thread {
    pub fn new(agent: Agent, registry: Arc<ToolRegistry>, gate: Arc<PermissionGate>, max_tool_rounds: u32) -> Self {
        Self::with_id_source(agent, registry, gate, max_tool_rounds, Arc::new(RandomIdSource))
    }

    /// Same as [`Self::new`] but with an explicit [`IdSource`] — tests use a
    /// [`agentcore_model::SequentialIdSource`] for reproducible checkpoint ids.
    pub fn with_id_source(
        agent: Agent,
        registry: Arc<ToolRegistry>,
        gate: Arc<PermissionGate>,
        max_tool_rounds: u32,
        id_source: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            id: ThreadId::new(),
            agent,
            tool_manager: ToolManager::new(Arc::clone(&registry), Arc::clone(&gate)),
            registry,
            gate,
            max_tool_rounds,
            id_source,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn run_turn(&mut self, turn: Turn) -> Result<(), AgentError> {
        match turn {
            Turn::Compact(summary) => self.run_compact(summary),
            Turn::User(content) => self.run_user_turn(content).await,
        }
    }

    fn run_compact(&mut self, summary: String) -> Result<(), AgentError> {
        let truncate_idx = self.agent.messages().len();
        let replacement = compact_command_replacement(summary, truncate_idx);
        self.agent.compact(vec![replacement], None);
        Ok(())
    }

    async fn run_user_turn(&mut self, mut content: Vec<ContentBlock>) -> Result<(), AgentError> {
        content.insert(0, ContentBlock::checkpoint(self.id_source.next_checkpoint_id()));
        self.agent.append_user(content)?;
        let mut rounds = 0u32;
        loop {
            self.agent.continue_conversation().await?;
            if *self.agent.status() != Status::WaitingForToolResults {
                return Ok(());
            }
            rounds += 1;
            if rounds > self.max_tool_rounds {
                self.agent.abort()?;
                return Err(AgentError::Protocol(format!(
                    "exceeded max_tool_rounds ({})",
                    self.max_tool_rounds
                )));
            }
            if self.dispatch_pending_tools().await {
                return Ok(());
            }
        }
    }

    /// Gather every unresolved `tool_use` in the latest assistant message and
    /// resolve it: `compact` is routed straight to [`Agent::compact`] (§4.3,
    /// never reaches the Tool Manager or produces an ordinary `tool_result`)
    /// and, if it runs, ends the turn outright — returns `true` in that case
    /// so the caller stops looping. Malformed tool input (`ToolRequest::Err`)
    /// resolves immediately to a `tool_result{err}` without ever touching the
    /// registry; everything else is dispatched to the [`ToolManager`] and
    /// awaited together so results land in source order.
    async fn dispatch_pending_tools(&mut self) -> bool {
        let pending = self.collect_unresolved_tool_uses();

        let mut dispatched_ids = Vec::new();
        for (id, name, request) in pending {
            match request {
                ToolRequest::Err { error, .. } => {
                    let _ = self
                        .agent
                        .tool_result(id, ToolResultOutcome::Err(format!("invalid tool input: {error}")));
                }
                ToolRequest::Ok(args) if name == "compact" => {
                    if self.handle_compact_tool_use(id, &args) {
                        return true;
                    }
                }
                ToolRequest::Ok(args) => {
                    let _ = self.tool_manager.init(
                        id.clone(),
                        self.id,
                        MessageId::new(),
                        name,
                        args,
                        self.id,
                    );
                    dispatched_ids.push(id);
                }
            }
        }

        if !dispatched_ids.is_empty() {
            let results = self.tool_manager.await_completion(&dispatched_ids).await;
            for r in results {
                let _ = self.agent.tool_result(r.id, r.result);
            }
        }
        false
    }

    fn collect_unresolved_tool_uses(&self) -> Vec<(ToolRequestId, String, ToolRequest)> {
        let messages = self.agent.messages();
        let Some(idx) = messages.iter().rposition(|m| m.role == Role::Assistant) else {
            return Vec::new();
        };
        let (head, tail) = messages.split_at(idx + 1);
        let assistant = &head[idx];
        let unresolved: std::collections::HashSet<ToolRequestId> =
            assistant.unresolved_tool_use_ids(tail).into_iter().cloned().collect();
        assistant
            .tool_uses()
            .filter(|(id, _, _)| unresolved.contains(*id))
            .map(|(id, name, request)| (id.clone(), name.to_string(), request.clone()))
            .collect()
    }

    /// A `compact` tool_use carries `{summary, from?, to?}` (§4.3). The Tool
    /// Manager never sees this call: it's routed straight to
    /// [`Agent::compact`], which concludes the turn outright rather than
    /// producing an ordinary `tool_result` to resume on.
    ///
    /// Returns `true` if a compaction actually ran (the turn is over) or
    /// `false` if the call was malformed and was answered with an ordinary
    /// `tool_result{err}` instead (the turn continues as normal).
    fn handle_compact_tool_use(&mut self, id: ToolRequestId, args: &serde_json::Value) -> bool {
        let Some(summary) = args.get("summary").and_then(|v| v.as_str()) else {
            let _ = self
                .agent
                .tool_result(id, ToolResultOutcome::Err("compact requires a 'summary' field".into()));
            return false;
        };
        let from = args.get("from").and_then(|v| v.as_str()).and_then(parse_checkpoint);
        let to = args.get("to").and_then(|v| v.as_str()).and_then(parse_checkpoint);
        let replacement = Replacement { from, to, summary: summary.to_string(), truncate_idx: None };
        self.agent.compact(vec![replacement], None);
        self.strip_compact_tool_use(&id);
        true
    }

    /// Drop the triggering `compact` `tool_use` block from whatever message
    /// still carries it post-compaction — it only survives when the
    /// caller's `to` checkpoint left the triggering message in the kept
    /// tail (§4.6 step 2). Drops the message entirely if that empties it.
    fn strip_compact_tool_use(&mut self, id: &ToolRequestId) {
        let mut messages = self.agent.messages().to_vec();
        for message in &mut messages {
            message
                .content
                .retain(|b| !matches!(b, ContentBlock::ToolUse { id: block_id, .. } if block_id == id));
        }
        messages.retain(|m| !m.is_empty());
        self.agent.set_messages(messages);
    }

    /// Fork (§4.5, §4.7): the new thread gets its own id, its own Tool
    /// Manager (no in-flight tool instances carry over), and an
    /// independent, already-cloned Agent.
    pub fn fork(&self) -> Result<(Self, tokio::sync::mpsc::UnboundedReceiver<AgentEvent>), AgentError> {
        let (agent, rx) = self.agent.fork()?;
        let forked = Self {
            id: ThreadId::new(),
            agent,
            tool_manager: ToolManager::new(Arc::clone(&self.registry), Arc::clone(&self.gate)),
            registry: Arc::clone(&self.registry),
            gate: Arc::clone(&self.gate),
            max_tool_rounds: self.max_tool_rounds,
            id_source: Arc::clone(&self.id_source),
        };
        Ok((forked, rx))
    }
}

fn parse_checkpoint(s: &str) -> Option<agentcore_model::CheckpointId> {
    if agentcore_model::CheckpointId::is_valid(s) {
        Some(agentcore_model::CheckpointId::new(s))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::agent::AgentConfig;
    use agentcore_config::ToolsConfig;
    use agentcore_model::ScriptedMockProvider;
    use agentcore_tools::tool::{Tool, ToolCall, ToolExecution};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input back"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn is_read_only(&self) -> bool {
            true
        }
        async fn execute(&self, call: &ToolCall) -> ToolExecution {
            ToolExecution::text(call.args.to_string())
        }
    }

    fn thread_with(provider: ScriptedMockProvider, tool: Option<impl Tool + 'static>) -> Thread {
        let mut registry = ToolRegistry::new();
        if let Some(tool) = tool {
            registry.register(tool);
        }
        let gate = PermissionGate::from_config(&ToolsConfig::default(), vec![]);
        let config = AgentConfig { model: "mock".into(), max_tokens: 100, temperature: None, tool_choice: None, thinking: None };
        let (agent, _rx) = Agent::new(Arc::new(provider), config, vec![], registry.schemas());
        Thread::new(agent, Arc::new(registry), Arc::new(gate), 10)
    }

    #[tokio::test]
    async fn plain_user_turn_lands_stopped_with_assistant_reply() {
        let mut thread = thread_with(ScriptedMockProvider::always_text("hi there"), None::<EchoTool>);
        thread.run_turn(Turn::User(vec![ContentBlock::text("hello")])).await.unwrap();
        let last = thread.agent().messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(matches!(&last.content[0], ContentBlock::Text { text, .. } if text == "hi there"));
    }

    #[tokio::test]
    async fn tool_use_round_trips_through_registry_and_resumes_the_turn() {
        let provider = ScriptedMockProvider::new(vec![
            vec![
                agentcore_model::ProviderEvent::BlockStart {
                    index: 0,
                    block: ContentBlock::ToolUse {
                        id: ToolRequestId::new("t1"),
                        name: "echo".into(),
                        request: agentcore_model::ToolRequest::Ok(json!({"x": 1})),
                    },
                },
                agentcore_model::ProviderEvent::BlockStop { index: 0 },
                agentcore_model::ProviderEvent::ResponseCompleted {
                    content: vec![ContentBlock::ToolUse {
                        id: ToolRequestId::new("t1"),
                        name: "echo".into(),
                        request: agentcore_model::ToolRequest::Ok(json!({"x": 1})),
                    }],
                    stop_reason: agentcore_model::StopReason::ToolUse,
                    usage: agentcore_model::Usage::default(),
                },
            ],
            vec![
                agentcore_model::ProviderEvent::BlockStart { index: 0, block: ContentBlock::text("done") },
                agentcore_model::ProviderEvent::BlockStop { index: 0 },
                agentcore_model::ProviderEvent::ResponseCompleted {
                    content: vec![ContentBlock::text("done")],
                    stop_reason: agentcore_model::StopReason::EndTurn,
                    usage: agentcore_model::Usage::default(),
                },
            ],
        ]);
        let mut thread = thread_with(provider, Some(EchoTool));
        thread.run_turn(Turn::User(vec![ContentBlock::text("use echo")])).await.unwrap();

        let messages = thread.agent().messages();
        let has_tool_result = messages.iter().any(|m| {
            m.content.iter().any(|b| matches!(b, ContentBlock::ToolResult { result: ToolResultOutcome::Ok(_), .. }))
        });
        assert!(has_tool_result);
        let last = messages.last().unwrap();
        assert!(matches!(&last.content[0], ContentBlock::Text { text, .. } if text == "done"));
    }

    #[tokio::test]
    async fn compact_tool_use_is_routed_to_agent_compact_and_ends_the_turn() {
        let provider = ScriptedMockProvider::new(vec![vec![
            agentcore_model::ProviderEvent::BlockStart {
                index: 0,
                block: ContentBlock::ToolUse {
                    id: ToolRequestId::new("c1"),
                    name: "compact".into(),
                    request: agentcore_model::ToolRequest::Ok(json!({"summary": "S"})),
                },
            },
            agentcore_model::ProviderEvent::BlockStop { index: 0 },
            agentcore_model::ProviderEvent::ResponseCompleted {
                content: vec![ContentBlock::ToolUse {
                    id: ToolRequestId::new("c1"),
                    name: "compact".into(),
                    request: agentcore_model::ToolRequest::Ok(json!({"summary": "S"})),
                }],
                stop_reason: agentcore_model::StopReason::ToolUse,
                usage: agentcore_model::Usage::default(),
            },
        ]]);
        // No "compact" tool registered and only one scripted round: if
        // interception failed, dispatch would either hit the registry as an
        // unknown tool, or the loop would ask the exhausted script for more.
        let mut thread = thread_with(provider, None::<EchoTool>);
        thread.run_turn(Turn::User(vec![ContentBlock::text("summarize")])).await.unwrap();

        let messages = thread.agent().messages();
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0].content[0], ContentBlock::Text { text, .. } if text == "S"));
        assert_eq!(thread.agent().status(), &Status::Stopped(agentcore_model::StopReason::EndTurn));
    }

    #[tokio::test]
    async fn compact_tool_use_with_explicit_to_strips_trailing_tool_use_block() {
        let mut thread = thread_with(ScriptedMockProvider::always_text("unused"), None::<EchoTool>);
        let cp = agentcore_model::CheckpointId::new("pppppp");
        let tool_id = ToolRequestId::new("c9");
        thread.agent.set_messages(vec![
            agentcore_model::Message::user(vec![ContentBlock::text("one")]),
            agentcore_model::Message::assistant(vec![ContentBlock::text("two"), ContentBlock::checkpoint(cp.clone())]),
            agentcore_model::Message::user(vec![ContentBlock::text("three")]),
            agentcore_model::Message::assistant(vec![ContentBlock::ToolUse {
                id: tool_id.clone(),
                name: "compact".into(),
                request: agentcore_model::ToolRequest::Ok(json!({"summary": "S", "to": cp.as_str()})),
            }]),
        ]);

        let ended = thread.handle_compact_tool_use(tool_id, &json!({"summary": "S", "to": cp.as_str()}));
        assert!(ended);

        // "three" is kept (outside the compacted range); the trailing
        // message is dropped entirely since stripping its only block (the
        // triggering `compact` tool_use) leaves it empty.
        let messages = thread.agent().messages();
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0].content[0], ContentBlock::Text { text, .. } if text == "S"));
        assert!(matches!(&messages[1].content[0], ContentBlock::Text { text, .. } if text == "three"));
    }

    #[tokio::test]
    async fn exceeding_max_tool_rounds_aborts_and_errors() {
        let provider = ScriptedMockProvider::tool_call("t1", "echo", json!({}));
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let gate = PermissionGate::from_config(&ToolsConfig::default(), vec![]);
        let config = AgentConfig { model: "mock".into(), max_tokens: 100, temperature: None, tool_choice: None, thinking: None };
        let (agent, _rx) = Agent::new(Arc::new(provider), config, vec![], registry.schemas());
        let mut thread = Thread::new(agent, Arc::new(registry), Arc::new(gate), 0);

        let err = thread.run_turn(Turn::User(vec![ContentBlock::text("go")])).await;
        assert!(matches!(err, Err(AgentError::Protocol(_))));
        assert_eq!(thread.agent().status(), &Status::Stopped(agentcore_model::StopReason::Aborted));
    }

    #[tokio::test]
    async fn run_compact_collapses_the_whole_log_into_one_summary() {
        let mut thread = thread_with(ScriptedMockProvider::always_text("hi"), None::<EchoTool>);
        thread.run_turn(Turn::User(vec![ContentBlock::text("hello")])).await.unwrap();
        thread.run_turn(Turn::Compact("SUMMARY".into())).await.unwrap();

        let messages = thread.agent().messages();
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0].content[0], ContentBlock::Text { text, .. } if text == "SUMMARY"));
        assert_eq!(thread.agent().status(), &Status::Stopped(agentcore_model::StopReason::EndTurn));
    }

    #[tokio::test]
    async fn fork_produces_an_independent_thread_with_a_new_id() {
        let mut thread = thread_with(ScriptedMockProvider::always_text("hi"), None::<EchoTool>);
        thread.run_turn(Turn::User(vec![ContentBlock::text("hello")])).await.unwrap();
        let (forked, _rx) = thread.fork().unwrap();
        assert_ne!(forked.id(), thread.id());
        assert_eq!(forked.agent().messages().len(), thread.agent().messages().len());
    }
}
