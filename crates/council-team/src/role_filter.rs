// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Role Filter (C6): prunes a council roster down to the roles relevant to
//! the files a diff actually touches. Cross-cutting roles always survive;
//! platform-specific roles survive only if a changed file matches their
//! pattern set; unrecognized roles default to included.

use std::collections::HashSet;

use crate::types::Role;

const ALWAYS_RELEVANT: &[&str] = &[
    "architect",
    "system architect",
    "security",
    "security (ciso)",
    "qa",
    "quality assurance",
    "compliance",
    "compliance (lawyer)",
    "observability",
    "sre / observability lead",
    "docs",
    "tech writer",
    "product",
    "product owner",
];

fn platform_patterns(platform: &str) -> &'static [&'static str] {
    match platform {
        "mobile" => &[".tsx", ".jsx", "mobile/", "expo/", "react-native/", "ios/", "android/"],
        "web" | "frontend" => {
            &[".tsx", ".jsx", ".css", ".html", ".scss", "web/", "pages/", "components/", "next.config"]
        }
        "backend" => &[".py", ".sql", ".yaml", ".yml", ".toml", "Dockerfile", "api/", "backend/"],
        _ => &[],
    }
}

const PLATFORMS: &[&str] = &["mobile", "web", "frontend", "backend"];

/// Parses `+++ b/path` and `--- a/path` headers out of a unified diff.
fn changed_files(diff: &str) -> HashSet<String> {
    let mut files = HashSet::new();
    for line in diff.lines() {
        let rest = if let Some(r) = line.strip_prefix("+++ b/") {
            Some(r)
        } else {
            line.strip_prefix("--- a/")
        };
        if let Some(path) = rest {
            if !path.is_empty() && path != "/dev/null" {
                files.insert(path.to_lowercase());
            }
        }
    }
    files
}

fn files_match_platform(files: &HashSet<String>, platform: &str) -> bool {
    let patterns = platform_patterns(platform);
    files.iter().any(|file| {
        patterns.iter().any(|pattern| {
            if let Some(ext) = pattern.strip_prefix('.') {
                file.ends_with(&format!(".{ext}"))
            } else {
                file.contains(pattern)
            }
        })
    })
}

/// Prunes `roles` to those relevant given the files touched in `diff`. An
/// empty diff leaves the roster untouched.
pub fn filter_relevant_roles(roles: &[Role], diff: &str) -> Vec<Role> {
    if diff.trim().is_empty() {
        return roles.to_vec();
    }
    let files = changed_files(diff);

    roles
        .iter()
        .filter(|role| {
            let name_lower = role.name.to_lowercase();
            let role_key = role.role.to_lowercase();

            if ALWAYS_RELEVANT.contains(&name_lower.as_str()) || ALWAYS_RELEVANT.contains(&role_key.as_str()) {
                return true;
            }

            let matched_platform = PLATFORMS.iter().find(|p| role_key.contains(*p) || name_lower.contains(*p));
            match matched_platform {
                Some(platform) => files_match_platform(&files, platform),
                None => true,
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(role: &str, name: &str) -> Role {
        Role { role: role.into(), name: name.into(), focus: String::new(), instruction: String::new() }
    }

    #[test]
    fn empty_diff_keeps_every_role() {
        let roles = vec![role("mobile", "Mobile")];
        assert_eq!(filter_relevant_roles(&roles, "").len(), 1);
    }

    #[test]
    fn always_relevant_role_survives_regardless_of_files() {
        let roles = vec![role("security", "Security (CISO)")];
        let diff = "+++ b/app.tsx\n";
        assert_eq!(filter_relevant_roles(&roles, diff).len(), 1);
    }

    #[test]
    fn mobile_role_dropped_when_no_mobile_files_touched() {
        let roles = vec![role("mobile", "Mobile")];
        let diff = "--- a/backend/server.py\n+++ b/backend/server.py\n";
        assert!(filter_relevant_roles(&roles, diff).is_empty());
    }

    #[test]
    fn mobile_role_kept_when_tsx_file_touched() {
        let roles = vec![role("mobile", "Mobile")];
        let diff = "--- a/app/screen.tsx\n+++ b/app/screen.tsx\n";
        assert_eq!(filter_relevant_roles(&roles, diff).len(), 1);
    }

    #[test]
    fn backend_role_kept_when_python_file_touched() {
        let roles = vec![role("backend", "Backend")];
        let diff = "+++ b/service/handler.py\n";
        assert_eq!(filter_relevant_roles(&roles, diff).len(), 1);
    }

    #[test]
    fn unknown_role_defaults_to_included() {
        let roles = vec![role("growth", "Growth Lead")];
        let diff = "+++ b/backend/handler.py\n";
        assert_eq!(filter_relevant_roles(&roles, diff).len(), 1);
    }
}
