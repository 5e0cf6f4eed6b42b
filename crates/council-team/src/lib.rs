// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Council data model, finding validation, reference resolution, and audit
//! persistence. [`convene_council`] is the entry point: it loads a prepared
//! [`orchestrator::ReviewContext`] and [`types::Council`] through the
//! configured engine and returns a signed [`types::AuditRecord`].

mod audit;
mod chunker;
mod error;
mod file_context;
mod orchestrator;
mod parse;
mod reference;
mod role_filter;
mod scrub;
mod types;
mod validator;

pub use audit::{log_dir, log_path, write_audit_report};
pub use chunker::{chunk_diff, chunk_label};
pub use error::GovernanceError;
pub use orchestrator::{aggregate_verdict, CouncilEngine, NativeEngine, ReviewContext};
pub use reference::{build_reference_set, extract_references, validate_references};
pub use role_filter::filter_relevant_roles;
pub use scrub::scrub;
pub use types::{AuditRecord, Council, FindingValidation, Mode, ReferenceSet, Role, RoleReview, Verdict};
pub use validator::validate_finding;

use std::sync::Arc;
use std::time::Instant;

use council_config::{AgentConfig, RoleEntry};
use council_model::ProviderRegistry;

fn role_from_entry(entry: &RoleEntry) -> Role {
    Role {
        role: entry.role.clone(),
        name: entry.name.clone(),
        focus: entry.description.clone(),
        instruction: entry.instruction.clone().unwrap_or_default(),
    }
}

/// Returns `true` if at least one provider the council might dispatch to is
/// configured. An empty registry means every role would immediately hit
/// `provider_terminal` with nothing to fall back to — that is a
/// configuration problem, not a per-role infrastructure hiccup, so it is
/// caught before any worker runs and no audit file is written for it.
fn any_provider_configured(registry: &ProviderRegistry) -> bool {
    council_model::FALLBACK_ORDER.iter().any(|id| registry.is_configured(id))
}

/// Convenes a council over one diff and returns the resulting audit record.
///
/// `registry` is built once per process (it owns pooled HTTP clients) and
/// passed in by the caller; `engine` dispatches `native` directly and falls
/// back to `native` for `adk` (no external multi-agent framework is linked
/// into this binary, so the fallback is unconditional rather than on
/// `ImportError`).
#[allow(clippy::too_many_arguments)]
pub async fn convene_council(
    council_id: String,
    story_id: String,
    roster: &[RoleEntry],
    mode: Mode,
    ctx: &ReviewContext,
    agent_cfg: &AgentConfig,
    registry: Arc<ProviderRegistry>,
) -> Result<AuditRecord, GovernanceError> {
    if ctx.diff.trim().is_empty() {
        let timestamp = chrono::Utc::now().timestamp();
        let mut record = AuditRecord {
            story_id,
            overall_verdict: Verdict::Pass,
            roles: Vec::new(),
            reference_metrics: ReferenceSet::default(),
            finding_validation: FindingValidation::default(),
            engine: format!("{:?}", agent_cfg.panel.engine).to_lowercase(),
            runtime_ms: 0,
            log_path: None,
            timestamp,
        };
        let path = write_audit_report(&ctx.repo_root, &record, timestamp)
            .map_err(|e| GovernanceError::AuditWrite(e.to_string()))?;
        record.log_path = Some(path.display().to_string());
        return Ok(record);
    }

    if !any_provider_configured(&registry) {
        return Err(GovernanceError::ProviderExhausted(
            "no LLM provider is configured; set an API key or GITHUB_TOKEN".to_string(),
        ));
    }

    let council =
        Council { roles: roster.iter().map(role_from_entry).collect(), mode, council_id: council_id.clone() };

    let started = Instant::now();
    let engine: Box<dyn CouncilEngine> = Box::new(NativeEngine);
    let (roles, mode) = engine.convene(&council, ctx, agent_cfg, registry).await?;
    let runtime_ms = started.elapsed().as_millis() as u64;

    let overall_verdict = aggregate_verdict(mode, &roles);
    let reference_metrics = orchestrator::sum_reference_metrics(&roles);
    let finding_validation = orchestrator::sum_finding_validation(&roles);
    let timestamp = chrono::Utc::now().timestamp();

    let mut record = AuditRecord {
        story_id,
        overall_verdict,
        roles,
        reference_metrics,
        finding_validation,
        engine: format!("{:?}", agent_cfg.panel.engine).to_lowercase(),
        runtime_ms,
        log_path: None,
        timestamp,
    };

    let path = write_audit_report(&ctx.repo_root, &record, timestamp)
        .map_err(|e| GovernanceError::AuditWrite(e.to_string()))?;
    record.log_path = Some(path.display().to_string());

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_from_entry_maps_description_to_focus() {
        let entry = RoleEntry {
            role: "security".into(),
            name: "Security".into(),
            description: "Finds vulnerabilities".into(),
            responsibilities: vec![],
            governance_checks: vec![],
            instruction: Some("be thorough".into()),
        };
        let role = role_from_entry(&entry);
        assert_eq!(role.focus, "Finds vulnerabilities");
        assert_eq!(role.instruction, "be thorough");
    }

    #[test]
    fn role_from_entry_defaults_missing_instruction_to_empty() {
        let entry = RoleEntry {
            role: "qa".into(),
            name: "QA".into(),
            description: "Tests".into(),
            responsibilities: vec![],
            governance_checks: vec![],
            instruction: None,
        };
        assert_eq!(role_from_entry(&entry).instruction, "");
    }

    #[tokio::test]
    async fn empty_diff_passes_with_no_roles_and_no_provider_required() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ReviewContext {
            story_content: String::new(),
            rules_content: String::new(),
            adrs_content: String::new(),
            instructions_content: String::new(),
            diff: "   \n".to_string(),
            repo_root: dir.path().to_path_buf(),
            adrs_dir: dir.path().join("adrs"),
            journeys_dir: dir.path().join("journeys"),
        };
        let agent_cfg = AgentConfig::default();
        let registry = Arc::new(council_model::build_registry(&agent_cfg, false));

        let record = convene_council(
            "council-1".to_string(),
            "story-1".to_string(),
            &[],
            Mode::Gatekeeper,
            &ctx,
            &agent_cfg,
            registry,
        )
        .await
        .unwrap();

        assert_eq!(record.overall_verdict, Verdict::Pass);
        assert!(record.roles.is_empty());
        assert!(record.log_path.is_some());
    }
}
