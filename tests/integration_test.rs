// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! End-to-end tests exercising the full stack (config → tool registry →
//! permission gate → agent → thread) the way the binary wires it together,
//! as opposed to the unit tests living alongside each component.

use std::sync::Arc;

use agentcore_config::{Config, ToolsConfig};
use agentcore_core::{Agent, AgentConfig, Status, Thread, Turn};
use agentcore_model::{ContentBlock, MockProvider, Role, ScriptedMockProvider, StopReason};
use agentcore_tools::{BashCommandTool, CompactTool, GetFileTool, PermissionGate, ToolRegistry};

fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(BashCommandTool);
    registry.register(CompactTool);
    registry.register(GetFileTool);
    registry
}

fn agent_config() -> AgentConfig {
    AgentConfig { model: "mock-model".into(), max_tokens: 512, temperature: None, tool_choice: None, thinking: None }
}

#[tokio::test]
async fn config_defaults_build_a_working_mock_turn() {
    let config = Config::default();
    assert_eq!(config.model.provider, "mock");

    let registry = Arc::new(default_registry());
    let gate = Arc::new(PermissionGate::from_config(&config.tools, config.tools.write_roots.clone()));
    let (agent, _rx) = Agent::new(Arc::new(MockProvider), agent_config(), vec![], registry.schemas());
    let mut thread = Thread::new(agent, registry, gate, config.agent.max_tool_rounds);

    thread.run_turn(Turn::User(vec![ContentBlock::text("hello")])).await.unwrap();

    let messages = thread.agent().messages();
    assert_eq!(messages.len(), 2);
    let reply = &messages[1];
    assert_eq!(reply.role, Role::Assistant);
    assert!(matches!(&reply.content[0], ContentBlock::Text { text, .. } if text.contains("MOCK: hello")));
    assert_eq!(thread.agent().status(), &Status::Stopped(StopReason::EndTurn));
}

#[tokio::test]
async fn bash_command_denied_by_default_pattern_surfaces_as_tool_result_err() {
    let config = Config::default(); // denies "rm -rf /*"
    let registry = Arc::new(default_registry());
    let gate = Arc::new(PermissionGate::from_config(&config.tools, config.tools.write_roots.clone()));

    let provider = ScriptedMockProvider::new(vec![
        vec![
            agentcore_model::ProviderEvent::BlockStart {
                index: 0,
                block: ContentBlock::ToolUse {
                    id: agentcore_model::ToolRequestId::new("t1"),
                    name: "bash_command".into(),
                    request: agentcore_model::ToolRequest::Ok(serde_json::json!({"command": "rm -rf /*"})),
                },
            },
            agentcore_model::ProviderEvent::BlockStop { index: 0 },
            agentcore_model::ProviderEvent::ResponseCompleted {
                content: vec![ContentBlock::ToolUse {
                    id: agentcore_model::ToolRequestId::new("t1"),
                    name: "bash_command".into(),
                    request: agentcore_model::ToolRequest::Ok(serde_json::json!({"command": "rm -rf /*"})),
                }],
                stop_reason: StopReason::ToolUse,
                usage: agentcore_model::Usage::default(),
            },
        ],
        vec![
            agentcore_model::ProviderEvent::BlockStart { index: 0, block: ContentBlock::text("acknowledged") },
            agentcore_model::ProviderEvent::BlockStop { index: 0 },
            agentcore_model::ProviderEvent::ResponseCompleted {
                content: vec![ContentBlock::text("acknowledged")],
                stop_reason: StopReason::EndTurn,
                usage: agentcore_model::Usage::default(),
            },
        ],
    ]);

    let (agent, _rx) = Agent::new(Arc::new(provider), agent_config(), vec![], registry.schemas());
    let mut thread = Thread::new(agent, registry, gate, config.agent.max_tool_rounds);
    thread.run_turn(Turn::User(vec![ContentBlock::text("clean everything")])).await.unwrap();

    let messages = thread.agent().messages();
    let denied = messages.iter().any(|m| {
        m.content.iter().any(|b| {
            matches!(b, ContentBlock::ToolResult { result: agentcore_model::ToolResultOutcome::Err(msg), .. }
                if msg.contains("permission denied"))
        })
    });
    assert!(denied, "expected a permission-denied tool_result, got {messages:#?}");
}

#[tokio::test]
async fn abort_during_tool_use_streaming_synthesizes_err_result() {
    let provider = ScriptedMockProvider::new(vec![vec![
        agentcore_model::ProviderEvent::BlockStart {
            index: 0,
            block: ContentBlock::ToolUse {
                id: agentcore_model::ToolRequestId::new("t9"),
                name: "get_file".into(),
                request: agentcore_model::ToolRequest::Ok(serde_json::json!(null)),
            },
        },
        agentcore_model::ProviderEvent::BlockDelta {
            index: 0,
            delta: agentcore_model::BlockDelta::InputJsonDelta { partial_json: "{\"path\":\"x\"}".into() },
        },
        agentcore_model::ProviderEvent::Aborted,
    ]]);

    let registry = Arc::new(default_registry());
    let gate = Arc::new(PermissionGate::from_config(&ToolsConfig::default(), vec![]));
    let (mut agent, _rx) = Agent::new(Arc::new(provider), agent_config(), vec![], registry.schemas());
    agent.append_user(vec![ContentBlock::text("x")]).unwrap();
    agent.continue_conversation().await.unwrap();

    assert_eq!(agent.status(), &Status::Stopped(StopReason::Aborted));
    let messages = agent.messages();
    assert_eq!(messages.len(), 3);
    match &messages[2].content[0] {
        ContentBlock::ToolResult { result: agentcore_model::ToolResultOutcome::Err(msg), .. } => {
            assert!(msg.contains("aborted"));
        }
        other => panic!("expected synthesized tool_result err, got {other:?}"),
    }
}

#[tokio::test]
async fn at_compact_command_collapses_the_log_via_the_thread_layer() {
    let registry = Arc::new(default_registry());
    let gate = Arc::new(PermissionGate::from_config(&ToolsConfig::default(), vec![]));
    let (agent, _rx) = Agent::new(Arc::new(ScriptedMockProvider::always_text("hi")), agent_config(), vec![], registry.schemas());
    let mut thread = Thread::new(agent, registry, gate, 10);

    thread.run_turn(Turn::User(vec![ContentBlock::text("hello")])).await.unwrap();
    assert_eq!(thread.agent().messages().len(), 2);

    thread.run_turn(Turn::Compact("gist of the conversation".into())).await.unwrap();
    let messages = thread.agent().messages();
    assert_eq!(messages.len(), 1);
    assert!(matches!(&messages[0].content[0], ContentBlock::Text { text, .. } if text == "gist of the conversation"));
}

#[tokio::test]
async fn fork_while_waiting_for_tool_results_resolves_the_clone_independently() {
    let registry = Arc::new(default_registry());
    let gate = Arc::new(PermissionGate::from_config(&ToolsConfig::default(), vec![]));
    let provider = ScriptedMockProvider::tool_call("t42", "get_file", serde_json::json!({"path": "x"}));
    let (mut agent, _rx) = Agent::new(Arc::new(provider), agent_config(), vec![], registry.schemas());
    agent.append_user(vec![ContentBlock::text("read x")]).unwrap();
    agent.continue_conversation().await.unwrap();
    assert_eq!(agent.status(), &Status::WaitingForToolResults);

    let (forked, _rx2) = agent.fork().unwrap();
    assert_eq!(forked.status(), &Status::Stopped(StopReason::EndTurn));
    assert_eq!(agent.status(), &Status::WaitingForToolResults, "source must be unaffected by forking");

    let last = forked.messages().last().unwrap();
    assert!(matches!(
        &last.content[0],
        ContentBlock::ToolResult { result: agentcore_model::ToolResultOutcome::Err(msg), .. } if msg.contains("forked")
    ));
}

#[test]
fn permission_gate_boundary_empty_patterns_require_approval_by_default() {
    let gate = PermissionGate::from_config(&ToolsConfig::default(), vec![]);
    // Neither auto-approved nor denied: falls through to RequireApproval.
    assert_eq!(
        gate.can_run("curl https://example.com"),
        agentcore_tools::PermissionDecision::RequireApproval
    );
}
