// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Typed representations of the three configuration files read at startup:
//! `agent.yaml`, `agents.yaml`, and `query.yaml`, all under `<repo>/.agent/etc/`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `agent.panel.engine` — which orchestration engine runs the council.
///
/// `Adk` is accepted for configuration compatibility but always falls back
/// to [`Engine::Native`] at dispatch time: there is no external multi-agent
/// framework linked into this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Native,
    Adk,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_num_retries() -> u32 {
    3
}

/// `agent.panel.*` — council orchestration knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub engine: Engine,
    #[serde(default = "default_num_retries")]
    pub num_retries: u32,
    /// Enables AST-derived file-level context augmentation in the role
    /// prompt. Off by default to keep prompts bounded; the finding
    /// validator runs the same false-positive filtering regardless.
    pub thorough: bool,
    /// Passed through to the provider layer verbatim; not consumed here.
    pub mcp: Option<McpConfig>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            engine: Engine::default(),
            num_retries: default_num_retries(),
            thorough: false,
            mcp: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub servers: serde_json::Value,
}

/// `<repo>/.agent/etc/agent.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub panel: PanelConfig,
    /// Forced default provider; participates in fallback unless disabled
    /// per-call.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Per-provider default model, e.g. `{"openai": "gpt-4o", "anthropic": "claude-sonnet-4"}`.
    pub models: HashMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { panel: PanelConfig::default(), provider: default_provider(), models: HashMap::new() }
    }
}

/// One entry in `agents.yaml`'s `team:` roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub governance_checks: Vec<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

/// `<repo>/.agent/etc/agents.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team: Vec<RoleEntry>,
}

/// The hardcoded council roster used when `agents.yaml` is absent.
///
/// Mirrors the nine cross-cutting/platform roles used historically, plus
/// `Product` (always-relevant per the role filter's partition).
pub fn default_roster() -> Vec<RoleEntry> {
    let entries: &[(&str, &str, &str)] = &[
        ("architect", "Architect", "System design, ADR compliance, patterns, and dependency hygiene."),
        ("security", "Security (CISO)", "Chief Information Security Officer. Enforcer of technical security controls, vulnerabilities, and secure coding practices."),
        ("compliance", "Compliance (Lawyer)", "Legal & Compliance Officer. Enforcer of GDPR, SOC2, Licensing, and regulatory frameworks."),
        ("qa", "QA", "Test coverage, edge cases, and testability of the changes."),
        ("docs", "Docs", "Documentation updates, clarity, and user manual accuracy."),
        ("observability", "Observability", "Logging, metrics, tracing, and error handling."),
        ("product", "Product", "User value, scope fit, and product requirements coverage."),
        ("backend", "Backend", "API design, database schemas, and backend patterns."),
        ("mobile", "Mobile", "Mobile-specific UX, performance, and platform guidelines."),
        ("web", "Web", "Web accessibility, responsive design, and browser compatibility."),
    ];
    entries
        .iter()
        .map(|(role, name, description)| RoleEntry {
            role: role.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            responsibilities: Vec::new(),
            governance_checks: Vec::new(),
            instruction: None,
        })
        .collect()
}

impl TeamConfig {
    pub fn default_roster() -> Self {
        Self { team: default_roster() }
    }
}

fn default_max_context_tokens() -> u32 {
    8192
}

/// `<repo>/.agent/etc/query.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_context_tokens: default_max_context_tokens() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_config_default_has_native_engine_and_openai() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.panel.engine, Engine::Native);
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.panel.num_retries, 3);
    }

    #[test]
    fn agent_config_partial_yaml_fills_defaults() {
        let cfg: AgentConfig = serde_yaml::from_str("provider: anthropic\n").unwrap();
        assert_eq!(cfg.provider, "anthropic");
        assert_eq!(cfg.panel.num_retries, 3);
        assert_eq!(cfg.panel.engine, Engine::Native);
    }

    #[test]
    fn agent_config_round_trips_through_yaml() {
        let cfg = AgentConfig::default();
        let text = serde_yaml::to_string(&cfg).unwrap();
        let back: AgentConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.provider, cfg.provider);
    }

    #[test]
    fn engine_adk_deserializes_from_lowercase() {
        let cfg: AgentConfig = serde_yaml::from_str("panel:\n  engine: adk\n").unwrap();
        assert_eq!(cfg.panel.engine, Engine::Adk);
    }

    #[test]
    fn default_roster_includes_product_and_nine_others() {
        let roster = default_roster();
        assert_eq!(roster.len(), 10);
        assert!(roster.iter().any(|r| r.name == "Product"));
        assert!(roster.iter().any(|r| r.role == "security"));
    }

    #[test]
    fn team_config_empty_team_deserializes() {
        let cfg: TeamConfig = serde_yaml::from_str("team: []\n").unwrap();
        assert!(cfg.team.is_empty());
    }

    #[test]
    fn query_config_default_max_context_tokens_is_8192() {
        assert_eq!(QueryConfig::default().max_context_tokens, 8192);
    }

    #[test]
    fn query_config_partial_yaml_uses_default() {
        let cfg: QueryConfig = serde_yaml::from_str("{}\n").unwrap();
        assert_eq!(cfg.max_context_tokens, 8192);
    }
}
