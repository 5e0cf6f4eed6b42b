// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands, ReviewArgs};
use council_team::{Mode, ReviewContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // reqwest's rustls-tls backend needs one process-wide crypto provider
    // installed before the first TLS connection; with more than one
    // provider reachable in the dependency graph, the default selection is
    // ambiguous and rustls panics instead of guessing.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("rustls crypto provider already installed");

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match &cli.command {
        Commands::Preflight { review } => run_review(review, Mode::Gatekeeper).await?,
        Commands::Panel { review } => run_review(review, Mode::Consultative).await?,
        Commands::ShowConfig { repo } => {
            show_config(repo)?;
            0
        }
        Commands::Completions { shell } => {
            cli::print_completions(*shell);
            0
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry().with(fmt::layer().with_target(true)).with(filter).try_init();
}

fn show_config(repo: &Path) -> anyhow::Result<()> {
    let agent = council_config::load_agent_config(repo)?;
    let team = council_config::load_team_config(repo)?;
    let query = council_config::load_query_config(repo)?;
    println!("# agent.yaml\n{}", serde_yaml::to_string(&agent)?);
    println!("# agents.yaml\n{}", serde_yaml::to_string(&team)?);
    println!("# query.yaml\n{}", serde_yaml::to_string(&query)?);
    Ok(())
}

fn read_or_default(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
        None => Ok(String::new()),
    }
}

/// Concatenates every ADR markdown file under `dir` for prompt context.
/// Missing directory yields an empty string — C4/C5 validation against the
/// same directory is unaffected, since validation checks for file
/// existence directly rather than relying on this concatenation.
fn read_adrs_content(dir: &Path) -> String {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return String::new();
    };
    let mut out = String::new();
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).filter(|p| p.extension().is_some_and(|e| e == "md")).collect();
    paths.sort();
    for path in paths {
        if let Ok(text) = std::fs::read_to_string(&path) {
            out.push_str(&text);
            out.push('\n');
        }
    }
    out
}

/// Returns `git diff HEAD` in `repo`, or an empty string outside a git
/// checkout (and the diff was not given explicitly) — an empty diff is a
/// well-defined boundary case, not an error.
async fn git_diff(repo: &Path) -> String {
    let output = tokio::process::Command::new("git")
        .args(["diff", "HEAD"])
        .current_dir(repo)
        .output()
        .await;
    match output {
        Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).to_string(),
        _ => String::new(),
    }
}

async fn run_review(review: &ReviewArgs, mode: Mode) -> anyhow::Result<i32> {
    let repo_root = review.repo.canonicalize().unwrap_or_else(|_| review.repo.clone());

    let agent_cfg = council_config::load_agent_config(&repo_root)?;
    let team_cfg = council_config::load_team_config(&repo_root)?;

    let diff = match &review.diff {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => git_diff(&repo_root).await,
    };

    let adrs_dir = repo_root.join(".agent/adrs");
    let journeys_dir = repo_root.join(".agent/cache/journeys");

    let ctx = ReviewContext {
        story_content: read_or_default(review.story.as_ref())?,
        rules_content: read_or_default(review.rules.as_ref())?,
        adrs_content: read_adrs_content(&adrs_dir),
        instructions_content: read_or_default(review.instructions.as_ref())?,
        diff,
        repo_root: repo_root.clone(),
        adrs_dir,
        journeys_dir,
    };

    let gh_available = council_model::GhProvider::is_available().await;
    let registry = Arc::new(council_model::build_registry(&agent_cfg, gh_available));

    let council_id = review.council_id.clone().unwrap_or_else(|| review.story_id.clone());

    let record = council_team::convene_council(
        council_id,
        review.story_id.clone(),
        &team_cfg.team,
        mode,
        &ctx,
        &agent_cfg,
        registry,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    if let Some(path) = &record.log_path {
        eprintln!("audit report: {path}");
    }

    Ok(match record.overall_verdict {
        council_team::Verdict::Pass | council_team::Verdict::Advice => 0,
        council_team::Verdict::Block => 1,
    })
}
