// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Permission Gate (§4.8): a pure allow / require-approval / deny decision
//! function over write paths and shell commands. Never performs I/O; a
//! caller that receives `RequireApproval` must transition the tool instance
//! to `pending-user-action` and wait for an explicit approval event before
//! proceeding.

use std::path::{Path, PathBuf};

use regex::Regex;

use agentcore_config::ToolsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    RequireApproval,
    Deny,
}

#[derive(Debug)]
pub struct PermissionGate {
    write_roots: Vec<PathBuf>,
    auto_approve_patterns: Vec<Regex>,
    deny_patterns: Vec<Regex>,
}

impl PermissionGate {
    pub fn from_config(cfg: &ToolsConfig, write_roots: Vec<PathBuf>) -> Self {
        let compile = |patterns: &[String]| -> Vec<Regex> {
            patterns.iter().filter_map(|p| glob_to_regex(p)).collect()
        };
        Self {
            write_roots,
            auto_approve_patterns: compile(&cfg.auto_approve_patterns),
            deny_patterns: compile(&cfg.deny_patterns),
        }
    }

    /// Decide whether a write to `path` may proceed. Paths outside every
    /// configured write root are denied outright; paths inside a root fall
    /// through to the same pattern matching `can_run` uses.
    pub fn can_write(&self, path: &Path) -> PermissionDecision {
        if !self.write_roots.is_empty() && !self.write_roots.iter().any(|root| path.starts_with(root)) {
            return PermissionDecision::Deny;
        }
        self.decide(&path.to_string_lossy())
    }

    /// Decide whether a shell command string may run.
    pub fn can_run(&self, command: &str) -> PermissionDecision {
        self.decide(command)
    }

    fn decide(&self, subject: &str) -> PermissionDecision {
        for re in &self.deny_patterns {
            if re.is_match(subject) {
                return PermissionDecision::Deny;
            }
        }
        for re in &self.auto_approve_patterns {
            if re.is_match(subject) {
                return PermissionDecision::Allow;
            }
        }
        PermissionDecision::RequireApproval
    }
}

/// Convert a simple shell glob pattern to a [`Regex`]. Only `*` (match
/// anything) and `?` (match one char) are supported.
pub fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => {
                for esc in regex::escape(&c.to_string()).chars() {
                    re.push(esc);
                }
            }
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}
