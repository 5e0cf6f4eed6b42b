// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Audit Writer (C9): renders an [`AuditRecord`] as a human-readable
//! markdown report and writes it atomically under `<repo>/.agent/logs/`.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::types::AuditRecord;

pub fn log_dir(repo: &Path) -> PathBuf {
    repo.join(".agent/logs")
}

pub fn log_path(repo: &Path, story_id: &str, unix_ts: i64) -> PathBuf {
    log_dir(repo).join(format!("governance-{story_id}-{unix_ts}.md"))
}

fn render(record: &AuditRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Governance report: {}", record.story_id);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Overall verdict: **{}**", record.overall_verdict);
    let _ = writeln!(out, "- Engine: {}", record.engine);
    let _ = writeln!(out, "- Runtime: {} ms", record.runtime_ms);
    let _ = writeln!(out, "- Timestamp: {}", record.timestamp);
    let _ = writeln!(out);

    for role in &record.roles {
        let _ = writeln!(out, "## {}", role.name);
        let _ = writeln!(out, "Verdict: {}", role.verdict);
        if !role.summary.is_empty() {
            let _ = writeln!(out, "Summary: {}", role.summary);
        }
        if role.findings.is_empty() {
            let _ = writeln!(out, "Findings: none");
        } else {
            let _ = writeln!(out, "Findings:");
            for f in &role.findings {
                let _ = writeln!(out, "- {f}");
            }
        }
        if !role.required_changes.is_empty() {
            let _ = writeln!(out, "Required changes:");
            for c in &role.required_changes {
                let _ = writeln!(out, "- {c}");
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Appendix: reference validation");
    let _ = writeln!(out, "| reference | status |");
    let _ = writeln!(out, "|---|---|");
    for r in &record.reference_metrics.valid {
        let _ = writeln!(out, "| {r} | valid |");
    }
    for r in &record.reference_metrics.invalid {
        let _ = writeln!(out, "| {r} | invalid |");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Appendix: finding validation");
    let _ = writeln!(out, "| total | validated | filtered |");
    let _ = writeln!(out, "|---|---|---|");
    let _ = writeln!(
        out,
        "| {} | {} | {} |",
        record.finding_validation.total, record.finding_validation.validated, record.finding_validation.filtered
    );

    out
}

/// Writes the markdown report and returns its path. The write is atomic
/// (temp file in the same directory, then rename) and never mutates an
/// existing path — the timestamp in the filename is the caller's uniqueness
/// guarantee, not something this function arbitrates.
pub fn write_audit_report(repo: &Path, record: &AuditRecord, unix_ts: i64) -> anyhow::Result<PathBuf> {
    let dir = log_dir(repo);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = log_path(repo, &record.story_id, unix_ts);
    let report = render(record);

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).context("creating temp audit file")?;
    tmp.write_all(report.as_bytes()).context("writing temp audit file")?;
    tmp.flush().context("flushing temp audit file")?;
    tmp.persist(&path).map_err(|e| e.error).with_context(|| format!("persisting {}", path.display()))?;

    Ok(path)
}
