// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "agentcore",
    about = "Multi-turn LLM conversation engine: streaming assembly, tool orchestration, compaction",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// User message for the turn. Prefix with `@compact ` to run a compaction
    /// turn with the rest of the text as the summary instead of an ordinary
    /// user turn. If omitted, the message is read from stdin.
    #[arg(value_name = "MESSAGE")]
    pub message: Option<String>,

    /// Path to the TOML config file (overrides auto-discovery).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the effective configuration (defaults merged with any config
    /// files found) as TOML and exit.
    ShowConfig,
    /// List every built-in tool registered with the Tool Registry.
    ListTools,
}
