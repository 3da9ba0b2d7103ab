// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Observer notifications (§4.2, §5). Dispatch is deferred by one scheduler
//! tick so an observer that itself calls back into the [`crate::agent::Agent`]
//! never re-enters synchronously with the call that produced the event.

use tokio::sync::mpsc;

/// What stopped the agent, for [`AgentEvent::Stopped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopCause {
    EndTurn,
    ToolUse,
    MaxTokens,
    Aborted,
    Error,
}

/// Events an [`crate::agent::Agent`] emits as a turn progresses.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The assembled assistant message gained new content (a delta folded
    /// in, or a block completed).
    ContentUpdated,
    /// The turn reached a terminal status.
    Stopped { reason: StopCause },
    /// An unrecoverable error ended the turn.
    Error { message: String },
}

/// Sink an [`Agent`](crate::agent::Agent) dispatches [`AgentEvent`]s to.
///
/// Dispatch always goes through [`EventDispatcher::emit`], which spawns a
/// task that yields once before sending — this is the "deferred by one
/// scheduler tick" requirement, not a synchronous callback.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: mpsc::UnboundedSender<AgentEvent>,
}

impl EventDispatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue `event` for delivery after the current scheduler tick. Never
    /// blocks the caller and never observes send failure (a dropped
    /// receiver just means nobody is listening anymore).
    pub fn emit(&self, event: AgentEvent) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = sender.send(event);
        });
    }
}
