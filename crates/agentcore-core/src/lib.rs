// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Agent Core: streaming response assembly, turn orchestration, tool
//! dispatch, and context compaction for a multi-turn LLM conversation.

mod agent;
mod assembler;
mod cache;
mod compact;
mod error;
mod events;
mod thread;

pub use agent::{Agent, AgentConfig, Status};
pub use assembler::Assembler;
pub use cache::{place_cache_hint, CachePlacement};
pub use compact::{compact, compact_command_replacement, Replacement};
pub use error::AgentError;
pub use events::{AgentEvent, EventDispatcher, StopCause};
pub use thread::{Thread, Turn};
