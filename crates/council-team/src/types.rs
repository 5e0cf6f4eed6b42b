// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Data model: Role, Council, RoleReview, reference metrics, AuditRecord.

use serde::{Deserialize, Serialize};

/// `Council.mode` — gatekeeper treats any BLOCK as terminal; consultative
/// demotes BLOCK to ADVICE in the rollup (each role's own verdict is still
/// recorded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Gatekeeper,
    Consultative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Block,
    Advice,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "PASS",
            Verdict::Block => "BLOCK",
            Verdict::Advice => "ADVICE",
        };
        write!(f, "{s}")
    }
}

/// One council member: loaded once per invocation, immutable during a run.
/// Platform relevance (mobile/web/backend) is derived from `role`/`name`
/// against the changed files, not stored on the role itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub role: String,
    pub name: String,
    pub focus: String,
    pub instruction: String,
}

/// An ordered set of roles plus the run's mode and identifier.
#[derive(Debug, Clone)]
pub struct Council {
    pub roles: Vec<Role>,
    pub mode: Mode,
    pub council_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceSet {
    pub cited: Vec<String>,
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

impl ReferenceSet {
    pub fn citation_rate(&self) -> f64 {
        let total = self.valid.len() + self.invalid.len();
        if total == 0 {
            1.0
        } else {
            self.valid.len() as f64 / total as f64
        }
    }

    pub fn hallucination_rate(&self) -> f64 {
        let total = self.valid.len() + self.invalid.len();
        if total == 0 {
            0.0
        } else {
            self.invalid.len() as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingValidation {
    pub total: usize,
    pub validated: usize,
    pub filtered: usize,
}

impl FindingValidation {
    pub fn add(&mut self, other: &FindingValidation) {
        self.total += other.total;
        self.validated += other.validated;
        self.filtered += other.filtered;
    }
}

/// The structured result of one role's review. Immutable once returned by
/// its worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleReview {
    pub name: String,
    pub verdict: Verdict,
    pub summary: String,
    pub findings: Vec<String>,
    pub required_changes: Vec<String>,
    pub references: ReferenceSet,
    pub finding_validation: FindingValidation,
}

/// Written exactly once per council invocation, never mutated after write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub story_id: String,
    pub overall_verdict: Verdict,
    pub roles: Vec<RoleReview>,
    pub reference_metrics: ReferenceSet,
    pub finding_validation: FindingValidation,
    pub engine: String,
    pub runtime_ms: u64,
    pub log_path: Option<String>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_rate_is_one_when_no_references() {
        let refs = ReferenceSet::default();
        assert_eq!(refs.citation_rate(), 1.0);
        assert_eq!(refs.hallucination_rate(), 0.0);
    }

    #[test]
    fn hallucination_rate_is_one_when_all_invalid() {
        let refs = ReferenceSet { cited: vec!["ADR-999".into()], valid: vec![], invalid: vec!["ADR-999".into()] };
        assert_eq!(refs.hallucination_rate(), 1.0);
        assert_eq!(refs.citation_rate(), 0.0);
    }

    #[test]
    fn verdict_displays_as_uppercase_word() {
        assert_eq!(Verdict::Block.to_string(), "BLOCK");
    }
}
