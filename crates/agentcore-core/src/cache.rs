// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Prompt-cache hint placement (§6).
//!
//! Several legacy heuristics for where to place a provider's ephemeral
//! cache-control hint (last N messages, last tool_result, last text block in
//! each role) are collapsed here into one rule: the last block in the whole
//! log that is not `thinking`/`redacted_thinking`. [`place_cache_hint`] is a
//! pure function — it only locates that block, it never mutates the log.
//! Attaching the hint to the outbound wire request is a
//! [`agentcore_model::ModelProvider`] implementation's job, not this crate's
//! (the same boundary that keeps wire serialization out of this crate
//! elsewhere — see `agentcore_model::provider`).

use agentcore_model::Message;

/// Position of the block eligible for a cache hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePlacement {
    pub message_index: usize,
    pub block_index: usize,
}

/// Walk `messages` tail-backward and return the position of the last block
/// that is not `thinking`/`redacted_thinking`. `None` if the log is empty or
/// every block is thinking (degenerate; shouldn't happen in practice since a
/// turn always ends on non-thinking content).
pub fn place_cache_hint(messages: &[Message]) -> Option<CachePlacement> {
    for (message_index, message) in messages.iter().enumerate().rev() {
        for (block_index, block) in message.content.iter().enumerate().rev() {
            if !block.is_thinking() {
                return Some(CachePlacement { message_index, block_index });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_model::ContentBlock;

    #[test]
    fn empty_log_has_no_placement() {
        assert_eq!(place_cache_hint(&[]), None);
    }

    #[test]
    fn skips_trailing_thinking_blocks() {
        let messages = vec![Message::assistant(vec![
            ContentBlock::text("answer"),
            ContentBlock::Thinking { thinking: "scratch".into(), signature: "sig".into() },
        ])];
        let placement = place_cache_hint(&messages).unwrap();
        assert_eq!(placement, CachePlacement { message_index: 0, block_index: 0 });
    }

    #[test]
    fn picks_last_eligible_block_across_messages() {
        let messages = vec![
            Message::user(vec![ContentBlock::text("first")]),
            Message::assistant(vec![ContentBlock::text("second")]),
        ];
        let placement = place_cache_hint(&messages).unwrap();
        assert_eq!(placement, CachePlacement { message_index: 1, block_index: 0 });
    }

    #[test]
    fn all_thinking_blocks_yields_none() {
        let messages = vec![Message::assistant(vec![ContentBlock::Thinking {
            thinking: "x".into(),
            signature: "y".into(),
        }])];
        assert_eq!(place_cache_hint(&messages), None);
    }
}
