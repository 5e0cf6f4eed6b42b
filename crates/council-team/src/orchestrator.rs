// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Council Orchestrator (C8): fans out one worker per relevant role,
//! bounded by a semaphore, and aggregates the results into an AuditRecord.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use council_config::AgentConfig;
use council_model::{CompletionRequest, ProviderErrorKind, ProviderRegistry};
use tracing::{debug, warn};

use crate::chunker::{chunk_diff, chunk_label};
use crate::error::GovernanceError;
use crate::file_context::build_file_context;
use crate::parse::parse_review;
use crate::reference::build_reference_set;
use crate::role_filter::filter_relevant_roles;
use crate::scrub::scrub;
use crate::types::{Council, FindingValidation, Mode, ReferenceSet, Role, RoleReview, Verdict};
use crate::validator::validate_finding;

const DEFAULT_MAX_CONCURRENT_ROLES: usize = 3;
const WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything a council invocation needs besides the roster itself.
pub struct ReviewContext {
    pub story_content: String,
    pub rules_content: String,
    pub adrs_content: String,
    pub instructions_content: String,
    pub diff: String,
    pub repo_root: PathBuf,
    pub adrs_dir: PathBuf,
    pub journeys_dir: PathBuf,
}

/// Dispatch target for a council run. Only [`NativeEngine`] is shipped;
/// `adk` configuration is accepted but always resolved to this at runtime
/// (there is no external multi-agent framework linked into this binary).
#[async_trait::async_trait]
pub trait CouncilEngine: Send + Sync {
    async fn convene(
        &self,
        council: &Council,
        ctx: &ReviewContext,
        cfg: &AgentConfig,
        registry: Arc<ProviderRegistry>,
    ) -> Result<(Vec<RoleReview>, Mode), GovernanceError>;
}

pub struct NativeEngine;

#[async_trait::async_trait]
impl CouncilEngine for NativeEngine {
    async fn convene(
        &self,
        council: &Council,
        ctx: &ReviewContext,
        cfg: &AgentConfig,
        registry: Arc<ProviderRegistry>,
    ) -> Result<(Vec<RoleReview>, Mode), GovernanceError> {
        let relevant = filter_relevant_roles(&council.roles, &ctx.diff);
        let reviews = run_roles(&relevant, ctx, cfg, council.mode, registry).await?;
        Ok((reviews, council.mode))
    }
}

async fn run_roles(
    roles: &[Role],
    ctx: &ReviewContext,
    cfg: &AgentConfig,
    mode: Mode,
    registry: Arc<ProviderRegistry>,
) -> Result<Vec<RoleReview>, GovernanceError> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(DEFAULT_MAX_CONCURRENT_ROLES));
    let mut handles = Vec::with_capacity(roles.len());

    for role in roles {
        let role = role.clone();
        let permit_holder = semaphore.clone();
        let registry = registry.clone();
        let provider_id = cfg.provider.clone();
        let num_retries = cfg.panel.num_retries;
        let thorough = cfg.panel.thorough;
        let diff = ctx.diff.clone();
        let story = ctx.story_content.clone();
        let rules = ctx.rules_content.clone();
        let adrs = ctx.adrs_content.clone();
        let instructions = ctx.instructions_content.clone();
        let repo_root = ctx.repo_root.clone();
        let adrs_dir = ctx.adrs_dir.clone();
        let journeys_dir = ctx.journeys_dir.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit_holder.acquire_owned().await.expect("semaphore not closed");
            run_single_role(
                role, &story, &rules, &adrs, &instructions, &diff, &repo_root, &adrs_dir, &journeys_dir,
                &registry, &provider_id, num_retries, mode, thorough,
            )
            .await
        }));
    }

    let mut reviews = Vec::with_capacity(handles.len());
    let mut fatal: Option<GovernanceError> = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(review)) => reviews.push(review),
            Ok(Err(err)) => {
                fatal.get_or_insert(err);
            }
            Err(_join_err) => reviews.push(RoleReview {
                name: "unknown".to_string(),
                verdict: Verdict::Pass,
                summary: "worker panicked".to_string(),
                findings: vec![],
                required_changes: vec![],
                references: ReferenceSet::default(),
                finding_validation: FindingValidation::default(),
            }),
        };
    }
    if let Some(err) = fatal {
        return Err(err);
    }
    Ok(reviews)
}

#[allow(clippy::too_many_arguments)]
async fn run_single_role(
    role: Role,
    story: &str,
    rules: &str,
    adrs: &str,
    instructions: &str,
    diff: &str,
    repo_root: &Path,
    adrs_dir: &Path,
    journeys_dir: &Path,
    registry: &ProviderRegistry,
    forced_provider: &str,
    num_retries: u32,
    mode: Mode,
    thorough: bool,
) -> Result<RoleReview, GovernanceError> {
    let name = role.name.clone();
    let work = execute_role_chunks(
        &role, story, rules, adrs, instructions, diff, repo_root, adrs_dir, journeys_dir, registry, forced_provider,
        num_retries, mode, thorough,
    );

    match tokio::time::timeout(WORKER_TIMEOUT, work).await {
        Ok(review) => review,
        Err(_elapsed) => {
            warn!(role = %name, timeout_secs = WORKER_TIMEOUT.as_secs(), "role worker timed out, demoting to PASS");
            Ok(RoleReview {
                name,
                verdict: Verdict::Pass,
                summary: "timed out".to_string(),
                findings: vec![],
                required_changes: vec![],
                references: ReferenceSet::default(),
                finding_validation: FindingValidation::default(),
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_role_chunks(
    role: &Role,
    story: &str,
    rules: &str,
    adrs: &str,
    instructions: &str,
    diff: &str,
    repo_root: &Path,
    adrs_dir: &Path,
    journeys_dir: &Path,
    registry: &ProviderRegistry,
    forced_provider: &str,
    num_retries: u32,
    mode: Mode,
    thorough: bool,
) -> Result<RoleReview, GovernanceError> {
    let chunks = chunk_diff(diff, forced_provider);
    let total = chunks.len();

    let file_context = if thorough { build_file_context(repo_root, diff) } else { String::new() };
    let temperature = temperature_for(mode);

    let mut verdict = Verdict::Pass;
    let mut summaries = Vec::new();
    let mut all_findings = Vec::new();
    let mut all_changes = Vec::new();
    let mut all_cited = std::collections::BTreeSet::new();

    for (i, chunk) in chunks.iter().enumerate() {
        let prompt = if file_context.is_empty() {
            format!(
                "<story>{story}</story><rules>{rules}</rules><adrs>{adrs}</adrs><instructions>{instructions}</instructions><diff chunk=\"{}\">{chunk}</diff>",
                chunk_label(i, total),
            )
        } else {
            format!(
                "<story>{story}</story><rules>{rules}</rules><adrs>{adrs}</adrs><instructions>{instructions}</instructions><file_context>{file_context}</file_context><diff chunk=\"{}\">{chunk}</diff>",
                chunk_label(i, total),
            )
        };
        let scrubbed_prompt = scrub(&prompt);
        let system_prompt = scrub(&format!("You are {} on an AI governance council. {}", role.name, role.focus));

        let request = CompletionRequest {
            system_prompt,
            user_prompt: scrubbed_prompt,
            model: None,
            temperature,
        };

        let outcome =
            council_model::complete_with_fallback(registry, Some(forced_provider), false, &request, num_retries).await;

        match outcome {
            Ok((_provider_used, text)) => {
                let parsed = parse_review(&text);
                if matches!(parsed.verdict, Verdict::Block) {
                    verdict = Verdict::Block;
                } else if matches!(parsed.verdict, Verdict::Advice) && matches!(verdict, Verdict::Pass) {
                    verdict = Verdict::Advice;
                }
                if !parsed.summary.is_empty() {
                    summaries.push(parsed.summary);
                }
                all_findings.extend(parsed.findings);
                all_changes.extend(parsed.required_changes);
                all_cited.extend(parsed.cited_references);
            }
            Err(provider_err) if provider_err.kind == ProviderErrorKind::FatalTransport => {
                warn!(role = %role.name, error = %provider_err.message, "fatal transport error, aborting council run");
                return Err(GovernanceError::from(provider_err));
            }
            Err(provider_err) => {
                debug!(role = %role.name, error = %provider_err.message, "provider error absorbed into role PASS");
                summaries.push(format!("provider error: {provider_err}"));
            }
        }
    }

    let total_claims = all_findings.len() + all_changes.len();
    let mut filtered_findings = Vec::new();
    let mut filtered_changes = Vec::new();
    for f in all_findings {
        if validate_finding(repo_root, &f, diff) {
            filtered_findings.push(f);
        }
    }
    for c in all_changes {
        if validate_finding(repo_root, &c, diff) {
            filtered_changes.push(c);
        }
    }
    let validated_claims = filtered_findings.len() + filtered_changes.len();
    let finding_validation =
        FindingValidation { total: total_claims, validated: validated_claims, filtered: total_claims - validated_claims };

    let cited: Vec<String> = all_cited.into_iter().collect();
    let text_for_refs = cited.join(" ");
    let references = build_reference_set(&text_for_refs, adrs_dir, journeys_dir);

    if matches!(verdict, Verdict::Block) {
        let everything_filtered = total_claims > 0 && validated_claims == 0;
        let all_refs_invalid = !references.cited.is_empty() && references.valid.is_empty();
        if everything_filtered || all_refs_invalid {
            verdict = Verdict::Pass;
            summaries.push("demoted to PASS: every finding was filtered or every citation was invalid".to_string());
        }
    }

    Ok(RoleReview {
        name: role.name.clone(),
        verdict,
        summary: summaries.join(" "),
        findings: filtered_findings,
        required_changes: filtered_changes,
        references,
        finding_validation,
    })
}

/// Gatekeeper findings must be deterministic, so temperature is pinned to
/// 0; consultative mode lets the provider use its own default.
fn temperature_for(mode: Mode) -> Option<f32> {
    match mode {
        Mode::Gatekeeper => Some(0.0),
        Mode::Consultative => None,
    }
}

/// Rolls up per-role verdicts into an overall one: gatekeeper mode blocks
/// on any BLOCK, consultative mode always reports ADVICE.
pub fn aggregate_verdict(mode: Mode, reviews: &[RoleReview]) -> Verdict {
    match mode {
        Mode::Consultative => Verdict::Advice,
        Mode::Gatekeeper => {
            if reviews.iter().any(|r| matches!(r.verdict, Verdict::Block)) {
                Verdict::Block
            } else {
                Verdict::Pass
            }
        }
    }
}

pub fn sum_reference_metrics(reviews: &[RoleReview]) -> ReferenceSet {
    let mut cited = Vec::new();
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for r in reviews {
        cited.extend(r.references.cited.clone());
        valid.extend(r.references.valid.clone());
        invalid.extend(r.references.invalid.clone());
    }
    ReferenceSet { cited, valid, invalid }
}

pub fn sum_finding_validation(reviews: &[RoleReview]) -> FindingValidation {
    let mut total = FindingValidation::default();
    for r in reviews {
        total.add(&r.finding_validation);
    }
    total
}
