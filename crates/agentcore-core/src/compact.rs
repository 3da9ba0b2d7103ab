// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The Compactor (§4.6): replaces a checkpoint-bounded range of the message
//! log with a short summary message, in place of the range the caller
//! (`@compact`, or an explicit checkpoint-range request) identified.

use std::collections::HashMap;

use agentcore_model::{CheckpointId, ContentBlock, Message, Role};

/// One range of the log to collapse into a summary.
///
/// `from`/`to` name checkpoints already present in the log (`None` means
/// "start of log" / "end of log" respectively). `truncate_idx`, when set,
/// additionally drops everything from that message index to the end of the
/// log instead of keeping a trailing remainder — this is how `@compact`
/// expresses "summarize everything up to here and discard the rest of what
/// was said in this turn" (§4.5).
#[derive(Debug, Clone)]
pub struct Replacement {
    pub from: Option<CheckpointId>,
    pub to: Option<CheckpointId>,
    pub summary: String,
    pub truncate_idx: Option<usize>,
}

/// Position of a [`CheckpointId`] in the log, as `(message_index,
/// block_index)`.
type CheckpointMap = HashMap<CheckpointId, (usize, usize)>;

fn checkpoint_positions(messages: &[Message]) -> CheckpointMap {
    let mut map = CheckpointMap::new();
    for (mi, message) in messages.iter().enumerate() {
        for (bi, block) in message.content.iter().enumerate() {
            if let Some(id) = block.as_checkpoint() {
                map.insert(id.clone(), (mi, bi));
            }
        }
    }
    map
}

fn resolve_to_message_index(id: Option<&CheckpointId>, map: &CheckpointMap, default: usize) -> usize {
    match id {
        None => default,
        Some(id) => map.get(id).map(|(mi, _)| *mi).unwrap_or(default),
    }
}

/// Apply `replacements` to `messages`, returning the compacted log.
///
/// Steps (§4.6):
/// 1. Build the checkpoint position map over the *input* log.
/// 2. Resolve each replacement's `from`/`to` (and `truncate_idx`) to message
///    indices.
/// 3. Apply replacements in descending `to`-position order so splicing one
///    range never invalidates the indices already resolved for another.
/// 4. Per replacement: keep the head untouched, splice in one synthetic
///    assistant summary message, then either drop the tail entirely
///    (`truncate_idx`) or keep it with ephemeral context
///    (thinking/system-reminder/context-update) stripped from its first
///    message.
/// 5. Repair alternation: merge any now-adjacent same-role messages so the
///    log still strictly alternates user/assistant (Invariant 2).
pub fn compact(messages: &[Message], replacements: &[Replacement]) -> Vec<Message> {
    let checkpoints = checkpoint_positions(messages);
    let mut resolved: Vec<(usize, usize, &Replacement)> = replacements
        .iter()
        .map(|r| {
            let from = resolve_to_message_index(r.from.as_ref(), &checkpoints, 0);
            let to = r
                .truncate_idx
                .unwrap_or_else(|| resolve_to_message_index(r.to.as_ref(), &checkpoints, messages.len()));
            (from, to, r)
        })
        .collect();
    resolved.sort_by(|a, b| b.1.cmp(&a.1));

    let mut log = messages.to_vec();
    for (from, to, replacement) in resolved {
        let from = from.min(log.len());
        let to = to.min(log.len()).max(from);

        let summary_message = Message::assistant(vec![ContentBlock::text(replacement.summary.clone())]);

        if replacement.truncate_idx.is_some() {
            log.truncate(from);
            log.push(summary_message);
        } else {
            let mut tail: Vec<Message> = log.split_off(to);
            log.truncate(from);
            if let Some(first) = tail.first_mut() {
                first.content.retain(|b| !b.is_ephemeral_context());
            }
            log.push(summary_message);
            log.append(&mut tail);
        }
    }

    repair_alternation(log)
}

/// Merge adjacent same-role messages by concatenating their content arrays.
/// A compacted log carries no per-message stop info (§4.6 step 6): the
/// summary message didn't stop for any reason the caller dictated, and
/// whatever the merged messages used to carry no longer describes anything
/// that happened in this log, so `stop_reason`/`usage` are cleared rather
/// than inherited from either side of the merge.
fn repair_alternation(messages: Vec<Message>) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        match out.last_mut() {
            Some(prev) if prev.role == message.role => {
                prev.content.extend(message.content);
            }
            _ => out.push(message),
        }
    }
    for message in &mut out {
        message.stop_reason = None;
        message.usage = None;
    }
    out.retain(|m| !m.is_empty());
    out
}

/// Derive the single `@compact`-command replacement (§4.5): summarize
/// everything up to (and not including) the user message that issued the
/// command, discarding what came after.
pub fn compact_command_replacement(summary: String, truncate_idx: usize) -> Replacement {
    Replacement { from: None, to: None, summary, truncate_idx: Some(truncate_idx) }
}
