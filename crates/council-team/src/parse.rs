// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Parses a role worker's free-form AI response into structured sections.
//! The format is not machine-generated, so the regexes tolerate case,
//! surrounding whitespace, and missing sections.

use std::sync::LazyLock;

use regex::Regex;

use crate::reference::extract_references;
use crate::types::Verdict;

static VERDICT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mi)^VERDICT:\s*(\w+)").unwrap());
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?mi)^SUMMARY:\s*(.+?)$").unwrap());
static FINDINGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mis)^FINDINGS:\s*\n(.*?)(?:^REQUIRED_CHANGES:|\z)").unwrap());
static CHANGES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mis)^REQUIRED_CHANGES:\s*\n(.*?)(?:^REFERENCES:|\z)").unwrap());

const SKIP_ITEMS: &[&str] = &["none", "n/a", "no issues", "no issues found"];

fn parse_bullet_list(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    for raw_line in text.trim().lines() {
        let line = raw_line.trim();
        let value = if let Some(rest) = line.strip_prefix("- ") {
            rest.trim()
        } else if let Some(rest) = line.strip_prefix("* ") {
            rest.trim()
        } else {
            line
        };
        if !value.is_empty() && !SKIP_ITEMS.contains(&value.to_lowercase().as_str()) {
            items.push(value.to_string());
        }
    }
    items
}

/// The unvalidated shape of a role worker's response, before C4/C5 run.
pub struct ParsedReview {
    pub verdict: Verdict,
    pub summary: String,
    pub findings: Vec<String>,
    pub required_changes: Vec<String>,
    pub cited_references: Vec<String>,
}

/// Extracts `VERDICT:`, `SUMMARY:`, `FINDINGS:`, `REQUIRED_CHANGES:`, and
/// `REFERENCES:` sections. An empty or unparseable response defaults to a
/// PASS with no findings — a role that returned garbage must never block a
/// merge on its own.
pub fn parse_review(text: &str) -> ParsedReview {
    let mut verdict = Verdict::Pass;
    let mut summary = String::new();
    let mut findings = Vec::new();
    let mut required_changes = Vec::new();

    if !text.trim().is_empty() {
        if let Some(caps) = VERDICT_RE.captures(text) {
            verdict = match caps[1].trim().to_uppercase().as_str() {
                "BLOCK" => Verdict::Block,
                "ADVICE" => Verdict::Advice,
                _ => Verdict::Pass,
            };
        }
        if let Some(caps) = SUMMARY_RE.captures(text) {
            summary = caps[1].trim().to_string();
        }
        if let Some(caps) = FINDINGS_RE.captures(text) {
            findings = parse_bullet_list(&caps[1]);
        }
        if let Some(caps) = CHANGES_RE.captures(text) {
            required_changes = parse_bullet_list(&caps[1]);
        }
    }

    let cited_references = extract_references(text);

    ParsedReview { verdict, summary, findings, required_changes, cited_references }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let text = "VERDICT: BLOCK\nSUMMARY: missing handling\nFINDINGS:\n- eval() used unsafely (Source: foo.py:10)\nREQUIRED_CHANGES:\n- remove eval\nREFERENCES:\nADR-001";
        let parsed = parse_review(text);
        assert_eq!(parsed.verdict, Verdict::Block);
        assert_eq!(parsed.summary, "missing handling");
        assert_eq!(parsed.findings, vec!["eval() used unsafely (Source: foo.py:10)"]);
        assert_eq!(parsed.required_changes, vec!["remove eval"]);
        assert_eq!(parsed.cited_references, vec!["ADR-001"]);
    }

    #[test]
    fn empty_response_defaults_to_pass() {
        let parsed = parse_review("");
        assert_eq!(parsed.verdict, Verdict::Pass);
        assert!(parsed.findings.is_empty());
    }

    #[test]
    fn bullet_list_skips_none_and_na_markers() {
        let text = "VERDICT: PASS\nFINDINGS:\n- None\n- N/A\nREQUIRED_CHANGES:\nNo issues found\n";
        let parsed = parse_review(text);
        assert!(parsed.findings.is_empty());
        assert!(parsed.required_changes.is_empty());
    }

    #[test]
    fn case_insensitive_and_tolerant_of_asterisk_bullets() {
        let text = "verdict: advice\nfindings:\n* consider renaming\n";
        let parsed = parse_review(text);
        assert_eq!(parsed.verdict, Verdict::Advice);
        assert_eq!(parsed.findings, vec!["consider renaming"]);
    }

    #[test]
    fn unknown_verdict_word_defaults_to_pass() {
        let text = "VERDICT: MAYBE\nSUMMARY: unclear\n";
        let parsed = parse_review(text);
        assert_eq!(parsed.verdict, Verdict::Pass);
    }
}
