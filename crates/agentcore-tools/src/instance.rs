// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Tool Instances (§4.3): the per-invocation state machine every tool call
//! goes through — `pending` → `pending-user-action`? → `processing` → `done`.
//! Read-only tools skip straight to `done` without ever touching the
//! Permission Gate.

use agentcore_model::{ThreadId, ToolRequestId, ToolResultOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum ToolInstanceState {
    Pending,
    PendingUserAction,
    Processing,
    Done(ToolResultOutcome),
}

/// One tool invocation tracked by the Tool Manager.
///
/// Carries the owning thread and the assistant message that produced the
/// `tool_use` block, so that an instance can never be mistaken for one from
/// a different thread after a fork (§4.7).
#[derive(Debug, Clone)]
pub struct ToolInstance {
    pub id: ToolRequestId,
    pub thread_id: ThreadId,
    pub state: ToolInstanceState,
}

impl ToolInstance {
    pub fn new(id: ToolRequestId, thread_id: ThreadId) -> Self {
        Self { id, thread_id, state: ToolInstanceState::Pending }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ToolInstanceState::Done(_))
    }

    pub fn request_approval(&mut self) {
        if matches!(self.state, ToolInstanceState::Pending) {
            self.state = ToolInstanceState::PendingUserAction;
        }
    }

    pub fn approve(&mut self) {
        if matches!(self.state, ToolInstanceState::Pending | ToolInstanceState::PendingUserAction) {
            self.state = ToolInstanceState::Processing;
        }
    }

    pub fn start_processing(&mut self) {
        if matches!(self.state, ToolInstanceState::Pending) {
            self.state = ToolInstanceState::Processing;
        }
    }

    pub fn complete(&mut self, result: ToolResultOutcome) {
        self.state = ToolInstanceState::Done(result);
    }

    /// Abort contract (§4.3): a not-done tool resolves to `err("user aborted")`.
    pub fn abort(&mut self) {
        if !self.is_done() {
            self.state = ToolInstanceState::Done(ToolResultOutcome::Err("user aborted".into()));
        }
    }

    pub fn result(&self) -> Option<&ToolResultOutcome> {
        match &self.state {
            ToolInstanceState::Done(r) => Some(r),
            _ => None,
        }
    }
}
