// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Error taxonomy (§7). Each variant corresponds to one row of the
//! specification's error-kind table: trigger, and whether it's recoverable
//! within the current turn.

use thiserror::Error;

/// Errors raised while advancing an [`crate::agent::Agent`] through a turn.
///
/// Only [`AgentError::Protocol`] is unrecoverable within the turn: every
/// other variant is either folded into a `tool_result{err}` block and fed
/// back to the model, or resolved by the caller retrying/aborting.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider's event stream violated the streaming-frame contract
    /// (out-of-order index, delta for a block type it doesn't apply to,
    /// double `block_start`, delta/stop with no open block). Unrecoverable:
    /// the turn must be aborted.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A `tool_use` block's accumulated JSON failed to parse, or failed
    /// schema validation. Recovered by synthesizing a `tool_result{err}` so
    /// the model can retry.
    #[error("schema error: {0}")]
    Schema(String),

    /// The provider surfaced a `stream_error` event before completing the
    /// turn.
    #[error("stream error: {0}")]
    Stream(String),

    /// The turn was aborted by the caller (user cancel, timeout) while a
    /// response was in flight.
    #[error("aborted")]
    Aborted,

    /// A tool's `execute` returned `Err`. Recovered by synthesizing
    /// `tool_result{err}`.
    #[error("tool error: {0}")]
    Tool(String),

    /// The permission gate denied a write or run request.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A file-editing tool (`insert`/`replace`) could not flush unsaved
    /// editor state before editing on disk.
    #[error("file conflict: {0}")]
    FileConflict(String),
}

impl AgentError {
    /// True for errors that end the turn outright rather than being folded
    /// into an in-band `tool_result{err}`.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Aborted)
    }
}
