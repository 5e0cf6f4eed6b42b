// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Reference Validator (C4): extracts `ADR-NNN`/`JRN-NNN`/`EXC-NNN`
//! citations from review text and checks them against the filesystem.
//! Read-only, no network access, and never follows symlinks (matched via
//! `symlink_metadata` rather than `metadata`/glob expansion that would
//! traverse them).

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::ReferenceSet;

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(ADR-\d+|JRN-\d+|EXC-\d+)\b").unwrap());

/// Scans `text` for reference tokens, returning a deduplicated, sorted list.
pub fn extract_references(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = REFERENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    set.into_iter().collect()
}

fn is_real_file(path: &Path) -> bool {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => meta.file_type().is_file(),
        Err(_) => false,
    }
}

fn matches_prefix(dir: &Path, prefix: &str, suffix: &str, recursive: bool) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else { return false };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            if recursive && !is_dir_symlink(&path) && matches_prefix(&path, prefix, suffix, recursive) {
                return true;
            }
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if name.starts_with(prefix) && name.ends_with(suffix) && is_real_file(&path) {
            return true;
        }
    }
    false
}

fn is_dir_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}

/// Validates each reference against `adrs_dir` (ADR/EXC, flat, `.md`) or
/// `journeys_dir` (JRN, recursive, `.yaml`). Returns `(valid, invalid)`.
pub fn validate_references(refs: &[String], adrs_dir: &Path, journeys_dir: &Path) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for r in refs {
        let prefix = r.split('-').next().unwrap_or("");
        let found = match prefix {
            "ADR" | "EXC" => adrs_dir.is_dir() && matches_prefix(adrs_dir, r, ".md", false),
            "JRN" => journeys_dir.is_dir() && matches_prefix(journeys_dir, r, ".yaml", true),
            _ => false,
        };
        if found {
            valid.push(r.clone());
        } else {
            invalid.push(r.clone());
        }
    }
    (valid, invalid)
}

/// Convenience wrapper producing a populated `ReferenceSet` in one call.
pub fn build_reference_set(text: &str, adrs_dir: &Path, journeys_dir: &Path) -> ReferenceSet {
    let cited = extract_references(text);
    let (valid, invalid) = validate_references(&cited, adrs_dir, journeys_dir);
    ReferenceSet { cited, valid, invalid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn extracts_and_dedupes_references() {
        let text = "See ADR-012 and JRN-003. Also ADR-012 again, plus EXC-1.";
        let refs = extract_references(text);
        assert_eq!(refs, vec!["ADR-012", "EXC-1", "JRN-003"]);
    }

    #[test]
    fn extract_ignores_near_miss_tokens() {
        let text = "ADRX-1 is not a reference, nor is adr-1 lowercase.";
        assert!(extract_references(text).is_empty());
    }

    #[test]
    fn validates_adr_against_filesystem() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ADR-012-use-rust.md"), "x").unwrap();
        let (valid, invalid) = validate_references(
            &["ADR-012".to_string(), "ADR-099".to_string()],
            dir.path(),
            dir.path(),
        );
        assert_eq!(valid, vec!["ADR-012"]);
        assert_eq!(invalid, vec!["ADR-099"]);
    }

    #[test]
    fn validates_journey_recursively() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("onboarding");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("JRN-003-signup.yaml"), "x").unwrap();
        let (valid, invalid) = validate_references(&["JRN-003".to_string()], dir.path(), dir.path());
        assert_eq!(valid, vec!["JRN-003"]);
        assert!(invalid.is_empty());
    }

    #[test]
    fn missing_directory_invalidates_everything() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let (valid, invalid) = validate_references(&["ADR-001".to_string()], &missing, &missing);
        assert!(valid.is_empty());
        assert_eq!(invalid, vec!["ADR-001"]);
    }

    #[test]
    fn reference_set_computes_rates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ADR-001-x.md"), "x").unwrap();
        let set = build_reference_set("ADR-001 and ADR-404", dir.path(), dir.path());
        assert_eq!(set.citation_rate(), 0.5);
        assert_eq!(set.hallucination_rate(), 0.5);
    }
}
