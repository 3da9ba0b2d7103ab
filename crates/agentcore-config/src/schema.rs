// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// Top-level configuration, merged from TOML files and environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Model provider selection and credentials.
///
/// Narrower than a full multi-provider driver config: this crate only needs
/// enough to pick a [`agentcore_model::ModelProvider`] implementation and
/// size its requests. Concrete provider wiring (HTTP client, auth refresh)
/// lives outside this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub name: String,
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Whether to attach an ephemeral prompt-cache hint to the last
    /// cacheable block in outbound requests (§6).
    #[serde(default = "default_true")]
    pub enable_prompt_cache: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "mock".into(),
            name: "mock-model".into(),
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
            enable_prompt_cache: true,
        }
    }
}

fn default_max_tool_rounds() -> u32 {
    200
}

fn default_tool_result_token_cap() -> usize {
    4000
}

/// Agent-level tuning. Most fields are safety valves (round/time limits) or
/// ambient knobs (system prompt, truncation cap); the turn loop itself is
/// driven entirely by the Agent/Thread state machines, not by this config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of autonomous tool-call rounds before a turn is
    /// forcibly stopped. Guards against runaway tool loops.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// System prompt override; `None` uses the built-in default.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Additional system-prompt prefix, injected ahead of `system_prompt`.
    ///
    /// Left fully configurable rather than a hidden constant: whether a
    /// particular auth mode requires a specific prefix is an external
    /// concern this crate does not resolve (see DESIGN.md open question 1).
    #[serde(default)]
    pub system_prefix: Option<String>,
    /// Maximum tokens allowed for a single tool result before it is
    /// deterministically truncated. Truncation is content-aware per tool
    /// (see `agentcore_tools::tool::OutputCategory`). `0` disables the cap.
    #[serde(default = "default_tool_result_token_cap")]
    pub tool_result_token_cap: usize,
    /// Per-step wall-clock timeout in seconds (0 = no limit).
    #[serde(default)]
    pub max_step_timeout_secs: u64,
    /// Total run wall-clock timeout in seconds (0 = no limit).
    #[serde(default)]
    pub max_run_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt: None,
            system_prefix: None,
            tool_result_token_cap: default_tool_result_token_cap(),
            max_step_timeout_secs: 0,
            max_run_timeout_secs: 0,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Permission Gate configuration (§4.8): glob patterns for auto-approval and
/// denial, plus the roots `insert`/`replace` are allowed to write under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub auto_approve_patterns: Vec<String>,
    pub deny_patterns: Vec<String>,
    /// Timeout in seconds for a single tool call (`bash_command` additionally
    /// enforces its own hard 60s ceiling regardless of this value).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directories `insert`/`replace` may write under. Empty means
    /// unrestricted by root (still subject to pattern matching).
    #[serde(default)]
    pub write_roots: Vec<std::path::PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            auto_approve_patterns: vec!["cat *".into(), "ls *".into(), "find *".into(), "rg *".into(), "grep *".into()],
            deny_patterns: vec!["rm -rf /*".into(), "dd if=*".into()],
            timeout_secs: default_timeout_secs(),
            write_roots: Vec::new(),
        }
    }
}
