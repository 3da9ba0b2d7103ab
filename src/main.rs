// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::io::Read as _;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use agentcore_config::Config;
use agentcore_core::{Agent, AgentConfig, AgentEvent, Thread, Turn};
use agentcore_model::{ContentBlock, ModelProvider, MockProvider, ScriptedMockProvider};
use agentcore_tools::{
    BashCommandTool, CompactTool, GetFileTool, InsertTool, ListDirectoryTool, PermissionGate,
    ReplaceTool, ToolRegistry,
};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(cmd) = &cli.command {
        let config = agentcore_config::load(cli.config.as_deref())?;
        return match cmd {
            Commands::ShowConfig => {
                println!("{}", toml::to_string_pretty(&config).unwrap_or_default());
                Ok(())
            }
            Commands::ListTools => {
                let registry = build_tool_registry();
                for schema in registry.schemas() {
                    println!("{:<16} {}", schema.name, schema.description);
                }
                Ok(())
            }
        };
    }

    let config = agentcore_config::load(cli.config.as_deref())?;

    let message = match cli.message {
        Some(m) => m,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading message from stdin")?;
            buf.trim().to_string()
        }
    };
    if message.is_empty() {
        anyhow::bail!("no message given (pass one as an argument or pipe it on stdin)");
    }

    run_turn(&config, &message).await
}

/// Build the [`ToolRegistry`] this binary ships with. Editor-query tools
/// (`hover`, `diagnostics`, `find_references`, ...) need a live
/// `EditorCollaborator` and are left out here — that collaborator is an
/// external integration out of this crate's scope (§1).
fn build_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(BashCommandTool);
    registry.register(CompactTool);
    registry.register(GetFileTool);
    registry.register(ListDirectoryTool);
    registry.register(InsertTool::default());
    registry.register(ReplaceTool::default());
    registry
}

/// Pick the configured [`ModelProvider`]. Only `mock` and `scripted-mock` are
/// available in this crate: the physical HTTP client that would drive a real
/// provider is an external collaborator outside this subsystem's scope (§1).
fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn ModelProvider>> {
    match config.model.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider)),
        "scripted-mock" => Ok(Arc::new(ScriptedMockProvider::always_text(
            "(scripted-mock has no script configured for the CLI)",
        ))),
        other => anyhow::bail!(
            "unknown model provider {other:?} — this crate only ships a mock provider; \
             a real HTTP-backed provider is wired in by an external collaborator"
        ),
    }
}

async fn run_turn(config: &Config, message: &str) -> anyhow::Result<()> {
    let provider = build_provider(config)?;
    let registry = Arc::new(build_tool_registry());
    let gate = Arc::new(PermissionGate::from_config(
        &config.tools,
        config.tools.write_roots.clone(),
    ));

    let mut system = Vec::new();
    if let Some(prefix) = &config.agent.system_prefix {
        system.push(ContentBlock::text(prefix.clone()));
    }
    if let Some(prompt) = &config.agent.system_prompt {
        system.push(ContentBlock::text(prompt.clone()));
    }

    let agent_config = AgentConfig {
        model: config.model.name.clone(),
        max_tokens: config.model.max_tokens.unwrap_or(4096),
        temperature: config.model.temperature,
        tool_choice: None,
        thinking: None,
    };

    let (agent, mut events) = Agent::new(provider, agent_config, system, registry.schemas());
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                AgentEvent::ContentUpdated => debug!("content updated"),
                AgentEvent::Stopped { reason } => info!(?reason, "turn stopped"),
                AgentEvent::Error { message } => warn!(message, "turn error"),
            }
        }
    });

    let mut thread = Thread::new(agent, registry, gate, config.agent.max_tool_rounds);

    let turn = match message.strip_prefix("@compact ") {
        Some(summary) => Turn::Compact(summary.to_string()),
        None => Turn::User(vec![ContentBlock::text(message.to_string())]),
    };

    thread.run_turn(turn).await.context("running turn")?;

    print_last_assistant_message(&thread);
    Ok(())
}

fn print_last_assistant_message(thread: &Thread) {
    let Some(last) = thread
        .agent()
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == agentcore_model::Role::Assistant)
    else {
        return;
    };
    for block in &last.content {
        match block {
            ContentBlock::Text { text, .. } => println!("{text}"),
            ContentBlock::ToolUse { name, .. } => println!("[tool_use: {name}]"),
            ContentBlock::Checkpoint { id } => println!("[checkpoint: {id:?}]"),
            _ => {}
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
