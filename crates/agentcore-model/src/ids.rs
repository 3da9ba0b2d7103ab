// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a [`crate::Thread`](../agentcore_core/struct.Thread.html).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(Uuid);

/// Opaque identifier for a single message in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

/// Opaque identifier correlating a `tool_use` block with its `tool_result`.
///
/// Providers mint these; they are opaque strings on the wire, not UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolRequestId(String);

macro_rules! uuid_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(ThreadId);
uuid_id!(MessageId);

impl ToolRequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ToolRequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ToolRequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The 6-character alphanumeric id embedded in `<checkpoint:ID>` text and
/// carried by [`crate::ContentBlock::Checkpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(String);

/// `<checkpoint:abc123>` — exact six lowercase-alphanumeric characters, no more, no less.
pub const CHECKPOINT_PATTERN: &str = r"^<checkpoint:([a-z0-9]{6})>$";

impl CheckpointId {
    /// Construct from an already-validated 6-char alphanumeric string.
    ///
    /// Panics on malformed input; callers that parse untrusted text should
    /// use [`CheckpointId::parse`] instead.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        assert!(Self::is_valid(&id), "invalid checkpoint id: {id:?}");
        Self(id)
    }

    pub fn is_valid(s: &str) -> bool {
        s.len() == 6 && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    }

    /// Parse the full `<checkpoint:ID>` text form, returning the bare id.
    pub fn parse_tag(text: &str) -> Option<Self> {
        let inner = text.strip_prefix("<checkpoint:")?.strip_suffix('>')?;
        Self::is_valid(inner).then(|| Self(inner.to_string()))
    }

    /// Render the full `<checkpoint:ID>` text form.
    pub fn to_tag(&self) -> String {
        format!("<checkpoint:{}>", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates fresh [`CheckpointId`]s.
///
/// Production code uses [`RandomIdSource`] (6 random lowercase-alphanumeric
/// characters). Tests that need reproducible ids (e.g. the compaction
/// scenarios in the specification) use a sequential source instead.
pub trait IdSource: Send + Sync {
    fn next_checkpoint_id(&self) -> CheckpointId;
}

/// Draws 6 characters uniformly from `[a-z0-9]` using the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_checkpoint_id(&self) -> CheckpointId {
        use rand::Rng;
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        let s: String = (0..6)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        CheckpointId(s)
    }
}

/// Deterministic source for tests: `aaaaaa`, `aaaaab`, `aaaaac`, ...
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    next: std::sync::atomic::AtomicU64,
}

impl SequentialIdSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIdSource {
    fn next_checkpoint_id(&self) -> CheckpointId {
        let n = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let base = ALPHABET.len() as u64;
        let mut digits = [0u8; 6];
        let mut rem = n;
        for slot in digits.iter_mut().rev() {
            *slot = ALPHABET[(rem % base) as usize];
            rem /= base;
        }
        CheckpointId(String::from_utf8(digits.to_vec()).unwrap())
    }
}
