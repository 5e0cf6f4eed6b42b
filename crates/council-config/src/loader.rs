// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Loads the three independent configuration files under `<repo>/.agent/etc/`.
//!
//! Unlike a layered single-concern config, these are three separate files for
//! three separate concerns. Each is loaded on its own: a missing file falls
//! back to sane defaults, but a file that exists and fails to parse is a hard
//! error — callers should treat this as a `config_error` and abort before any
//! review starts.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{AgentConfig, QueryConfig, TeamConfig};

pub fn agent_config_path(repo: &Path) -> PathBuf {
    repo.join(".agent/etc/agent.yaml")
}

pub fn agents_config_path(repo: &Path) -> PathBuf {
    repo.join(".agent/etc/agents.yaml")
}

pub fn query_config_path(repo: &Path) -> PathBuf {
    repo.join(".agent/etc/query.yaml")
}

/// Read and parse a single YAML file into `T`, or return `T::default()` if
/// the file does not exist. A present-but-unparseable file is an error.
fn load_yaml_or_default<T: Default + serde::de::DeserializeOwned>(
    path: &Path,
) -> anyhow::Result<T> {
    if !path.is_file() {
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn load_agent_config(repo: &Path) -> anyhow::Result<AgentConfig> {
    load_yaml_or_default(&agent_config_path(repo))
}

/// Loads the council roster. A missing `agents.yaml` falls back to the
/// hardcoded default roster (not an empty team), matching the contract that
/// a council always has reviewers even with zero configuration.
pub fn load_team_config(repo: &Path) -> anyhow::Result<TeamConfig> {
    let path = agents_config_path(repo);
    if !path.is_file() {
        return Ok(TeamConfig::default_roster());
    }
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: TeamConfig =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

pub fn load_query_config(repo: &Path) -> anyhow::Result<QueryConfig> {
    load_yaml_or_default(&query_config_path(repo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_agent_config_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_agent_config(dir.path()).unwrap();
        assert_eq!(cfg.provider, "openai");
    }

    #[test]
    fn missing_agents_yaml_falls_back_to_default_roster() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_team_config(dir.path()).unwrap();
        assert_eq!(cfg.team.len(), 10);
    }

    #[test]
    fn present_agents_yaml_overrides_default_roster() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".agent/etc")).unwrap();
        let mut f = std::fs::File::create(agents_config_path(dir.path())).unwrap();
        writeln!(f, "team:\n  - role: architect\n    name: Architect\n    description: x").unwrap();
        let cfg = load_team_config(dir.path()).unwrap();
        assert_eq!(cfg.team.len(), 1);
    }

    #[test]
    fn malformed_agent_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".agent/etc")).unwrap();
        let mut f = std::fs::File::create(agent_config_path(dir.path())).unwrap();
        writeln!(f, "provider: [this is not a valid scalar map").unwrap();
        assert!(load_agent_config(dir.path()).is_err());
    }

    #[test]
    fn missing_query_yaml_returns_default_max_context_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_query_config(dir.path()).unwrap();
        assert_eq!(cfg.max_context_tokens, 8192);
    }
}
