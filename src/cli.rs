// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

#[derive(Parser, Debug)]
#[command(
    name = "council",
    about = "AI governance council: multi-provider LLM review panel with finding validation",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Shared inputs to a council run, regardless of mode.
#[derive(clap::Args, Debug)]
pub struct ReviewArgs {
    /// Repository root. Config is read from `<repo>/.agent/etc/`, ADRs from
    /// `<repo>/.agent/adrs/`, journeys from `<repo>/.agent/cache/journeys/`.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Identifier for this change (used in the audit filename and as the
    /// `(Source: …)` anchor roles are asked to cite against).
    #[arg(long)]
    pub story_id: String,

    /// Path to a file with the story/ticket description. Omit for an empty
    /// story (useful for ad hoc diffs with no tracked story).
    #[arg(long, value_name = "PATH")]
    pub story: Option<PathBuf>,

    /// Path to a file with additional review rules/guidelines.
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Path to a file with free-form instructions appended to every role's
    /// prompt.
    #[arg(long, value_name = "PATH")]
    pub instructions: Option<PathBuf>,

    /// Unified diff to review. Defaults to `git diff HEAD` in `--repo` when
    /// omitted.
    #[arg(long, value_name = "PATH")]
    pub diff: Option<PathBuf>,

    /// Council identifier recorded on the audit record. Defaults to
    /// `--story-id` when omitted.
    #[arg(long)]
    pub council_id: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the council as a merge gate: exits 1 on overall BLOCK.
    ///
    /// Convenes every relevant role against the diff, validates their
    /// findings against the actual source, and writes a signed audit
    /// report under `<repo>/.agent/logs/`.
    Preflight {
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Run the council in consultative mode: always exits 0.
    ///
    /// Identical review pipeline to `preflight`, but the overall rollup is
    /// always ADVICE — each role's own verdict is still recorded in the
    /// audit report, just never escalated to a blocking exit code.
    Panel {
        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Print the effective agent/team/query configuration and exit.
    ShowConfig {
        /// Repository root to read `.agent/etc/` config from.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },

    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "council", &mut std::io::stdout());
}
