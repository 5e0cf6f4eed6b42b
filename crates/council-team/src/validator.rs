// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Finding Validator (C5) — the hardest part. Runs an ordered sequence of
//! falsifiers over each candidate finding; the first falsifier that matches
//! filters the finding out. Absent any match, the finding is assumed valid:
//! every falsifier below only ever returns `false` on an explicit
//! disproof, never on absence of evidence.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

const PATH_PREFIXES: &[&str] = &[".agent/src/", ".agent/", "backend/", "web/", "mobile/"];
const STRIP_PREFIXES: &[&str] = &["agent/", "tests/"];
const STRIP_BASES: &[&str] = &[".agent/src/", ".agent/"];

const STDLIB_MODULES: &[&str] = &[
    "abc", "argparse", "ast", "asyncio", "atexit", "base64", "bisect", "calendar", "cmath", "code",
    "codecs", "collections", "colorsys", "compileall", "concurrent", "configparser", "contextlib",
    "contextvars", "copy", "copyreg", "csv", "ctypes", "dataclasses", "datetime", "decimal",
    "difflib", "dis", "email", "enum", "errno", "faulthandler", "filecmp", "fileinput", "fnmatch",
    "fractions", "ftplib", "functools", "gc", "getopt", "getpass", "gettext", "glob", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "idlelib", "imaplib", "importlib", "inspect", "io",
    "ipaddress", "itertools", "json", "keyword", "linecache", "locale", "logging", "lzma",
    "mailbox", "math", "mimetypes", "mmap", "multiprocessing", "numbers", "operator", "os",
    "pathlib", "pdb", "pickle", "pkgutil", "platform", "plistlib", "pprint", "profile", "pstats",
    "py_compile", "queue", "quopri", "random", "re", "readline", "reprlib", "resource",
    "rlcompleter", "runpy", "sched", "secrets", "select", "selectors", "shelve", "shlex", "shutil",
    "signal", "site", "smtplib", "socket", "socketserver", "sqlite3", "ssl", "stat", "statistics",
    "string", "struct", "subprocess", "sys", "sysconfig", "syslog", "tarfile", "tempfile",
    "termios", "test", "textwrap", "threading", "time", "timeit", "tkinter", "token", "tokenize",
    "tomllib", "trace", "traceback", "tracemalloc", "tty", "turtle", "types", "typing",
    "unicodedata", "unittest", "urllib", "uuid", "venv", "warnings", "wave", "weakref",
    "webbrowser", "xml", "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib",
];

const GOVERNANCE_FILES: &[&str] = &["governance.py", "agent/core/governance.py", "orchestrator.rs"];
const GOVERNANCE_INTERNAL_NAMES: &[&str] = &[
    "_resolve_file_path",
    "_build_file_context",
    "_validate_finding_against_source",
    "_parse_findings",
    "convene_council",
    "convene_council_full",
    "resolve_file_path",
    "validate_finding",
    "parse_findings",
];
const GOVERNANCE_SELF_REF_KEYWORDS: &[&str] = &[
    "false positive", "false-positive", "validator", "finding validation", "governance check",
    "governance council", "governance system", "ai governance", "suppression rule",
    "hardcoded path", "path prefix", "sanitiz", "command injection", "path.cwd",
];
const META_FINDING_PHRASES: &[&str] = &[
    "false positive", "false-positive", "eliminate false", "reduce false", "preflight process",
    "ai-generated finding", "ai generated finding", "eliminate common sources",
];

fn claim_category_keywords(category: &str) -> &'static [&'static str] {
    match category {
        "path" => &["path", "resolve", "relative_to", "symlink", ".exists()", "is_file", "is_dir"],
        "import" => &["import", "from "],
        "validation" => &["validate", "check", "assert", "raise", "if not"],
        "type_hint" => &["-> ", ": str", ": int", ": bool", ": Optional", ": List", ": Dict"],
        "async" => &["async", "await", "asyncio"],
        "mock" => &["mock", "patch", "return_value", "MagicMock"],
        "docstring" => &["\"\"\"", "'''"],
        _ => &[],
    }
}
const CLAIM_CATEGORIES: &[&str] = &["path", "import", "validation", "type_hint", "async", "mock", "docstring"];

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(Source:\s*[^)]+\)|\[Source:\s*[^\]]+\]").unwrap());
static FILE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[`"]?([a-zA-Z0-9_/.-]+\.[a-zA-Z0-9]+)[`"]?:(\d+)"#).unwrap());
static FILE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[`"]?([a-zA-Z0-9_/.-]+\.[a-zA-Z0-9]+)[`"]?"#).unwrap());
static FILE_LINE_OPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[`"]?([a-zA-Z0-9_/.-]+\.[a-zA-Z0-9]+)[`"]?(?::(\d+))?"#).unwrap());
static META_HAS_FILE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s(])[\w/.-]+\.(py|ts|js|rs|yaml|yml|md|json)\b").unwrap());
static BACKTICK_MOD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(\w+)`").unwrap());
static DEP_MOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:import|module|package|dependency|depend)\w*\s+(?:to\s+)?[`"']?(\w+)[`"']?"#).unwrap()
});
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap());
static LICENSE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(licensed under|copyright|apache license|mit license|bsd license)").unwrap());
static HUNK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").unwrap());
static IDENTIFIER_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z_]\w{3,}").unwrap());
static QUOTED_SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[`"'][^`"']{10,}[`"']"#).unwrap()
});

/// Resolves a file path referenced in a finding against the repository
/// root, trying a raw lookup, a handful of common project prefixes, and a
/// stripped-leading-segment retry. Never follows symlinks for the
/// final candidate — callers read file content through `std::fs`, which
/// itself does not traverse symlinked directories beyond the OS resolving
/// the leaf component.
pub fn resolve_file_path(repo_root: &Path, filepath_str: &str) -> Option<PathBuf> {
    let raw = PathBuf::from(filepath_str);
    if raw.is_file() {
        return Some(raw);
    }
    let cwd_joined = repo_root.join(filepath_str);
    if cwd_joined.is_file() {
        return Some(cwd_joined);
    }
    for prefix in PATH_PREFIXES {
        let candidate = repo_root.join(prefix).join(filepath_str);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    for strip in STRIP_PREFIXES {
        if let Some(stripped) = filepath_str.strip_prefix(strip) {
            for base in STRIP_BASES {
                let candidate = repo_root.join(base).join(stripped);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn read_lines(repo_root: &Path, filepath_str: &str) -> Option<Vec<String>> {
    let path = resolve_file_path(repo_root, filepath_str)?;
    let content = std::fs::read_to_string(path).ok()?;
    Some(content.lines().map(str::to_string).collect())
}

/// Checks whether `line_num` falls within ±5 of a changed hunk for
/// `filepath` in `diff`. If the file is not mentioned in the diff at all,
/// the claim cannot be scoped against anything and is treated as
/// reference-only — this returns `true` (not filtered).
fn line_in_diff_hunk(filepath: &str, line_num: u32, diff: &str) -> bool {
    let normalized = filepath.replace('\\', "/");
    let mut in_target_file = false;
    let mut file_seen = false;
    let mut any_hunk_contains = false;

    for line in diff.lines() {
        if let Some(raw) = line.strip_prefix("+++ ") {
            let diff_path = raw.trim().strip_prefix("b/").unwrap_or(raw.trim());
            in_target_file = diff_path.ends_with(&normalized)
                || normalized.ends_with(diff_path)
                || diff_path.ends_with(filepath)
                || filepath.ends_with(diff_path);
            if in_target_file {
                file_seen = true;
            }
        } else if in_target_file && line.starts_with("@@ ") {
            if let Some(caps) = HUNK_HEADER_RE.captures(line) {
                let hunk_start: i64 = caps[1].parse().unwrap_or(1);
                let hunk_count: i64 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
                let hunk_end = hunk_start + hunk_count - 1;
                let n = line_num as i64;
                if hunk_start - 5 <= n && n <= hunk_end + 5 {
                    any_hunk_contains = true;
                }
            }
        } else if line.starts_with("diff --git") {
            in_target_file = false;
        }
    }

    if !file_seen {
        return true;
    }
    any_hunk_contains
}

fn has_citation(finding: &str) -> bool {
    CITATION_RE.is_match(finding)
}

fn falsifier_1_missing_citation(finding: &str) -> bool {
    !has_citation(finding)
}

fn falsifier_2_out_of_hunk(finding: &str, diff: &str) -> bool {
    if diff.trim().is_empty() {
        return false;
    }
    for caps in FILE_LINE_RE.captures_iter(finding) {
        let file = &caps[1];
        let line_num: u32 = caps[2].parse().unwrap_or(0);
        if !line_in_diff_hunk(file, line_num, diff) {
            return true;
        }
    }
    false
}

fn falsifier_3_self_referential(finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let targets_governance = GOVERNANCE_FILES.iter().any(|gf| lower.contains(gf));
    if !targets_governance {
        return false;
    }
    let refs_internal = GOVERNANCE_INTERNAL_NAMES.iter().any(|n| finding.contains(n));
    let describes_self = GOVERNANCE_SELF_REF_KEYWORDS.iter().any(|kw| lower.contains(kw));
    refs_internal || describes_self
}

fn falsifier_4_meta_finding(finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let is_meta = META_FINDING_PHRASES.iter().any(|p| lower.contains(p));
    if !is_meta {
        return false;
    }
    !META_HAS_FILE_REF_RE.is_match(finding)
}

fn falsifier_5_line_drift(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let refs: Vec<(String, u32)> = FILE_LINE_RE
        .captures_iter(finding)
        .map(|c| (c[1].to_string(), c[2].parse().unwrap_or(0)))
        .collect();
    if refs.is_empty() {
        return false;
    }
    let categories: Vec<&str> =
        CLAIM_CATEGORIES.iter().copied().filter(|cat| claim_category_keywords(cat).iter().any(|kw| lower.contains(kw))).collect();
    if categories.is_empty() {
        return false;
    }

    let mut checked = 0usize;
    let mut drifted = 0usize;
    for (file, line_num) in &refs {
        let Some(lines) = read_lines(repo_root, file) else { continue };
        checked += 1;
        if *line_num == 0 || *line_num as usize > lines.len() {
            drifted += 1;
            continue;
        }
        let idx = *line_num as usize;
        let start = idx.saturating_sub(4);
        let end = (idx + 3).min(lines.len());
        let region = lines[start..end].join("\n").to_lowercase();
        let region_matches = categories.iter().any(|cat| claim_category_keywords(cat).iter().any(|kw| region.contains(kw)));
        if !region_matches {
            drifted += 1;
        }
    }
    checked > 0 && drifted == checked
}

fn falsifier_6_stdlib_dependency(finding: &str) -> bool {
    let lower = finding.to_lowercase();
    if !(lower.contains("pyproject") || lower.contains("requirements") || lower.contains("dependency")) {
        return false;
    }
    let mut modules: Vec<String> = DEP_MOD_RE.captures_iter(finding).map(|c| c[1].to_string()).collect();
    modules.extend(BACKTICK_MOD_RE.captures_iter(finding).map(|c| c[1].to_string()));
    modules.iter().any(|m| STDLIB_MODULES.contains(&m.to_lowercase().as_str()))
}

fn falsifier_7_sync_as_async(repo_root: &Path, finding: &str, diff: &str) -> bool {
    let lower = finding.to_lowercase();
    let is_async_claim = [
        "await", "not awaited", "should be async", "convert to async", "missing await",
        "without awaiting", "async function",
    ]
    .iter()
    .any(|kw| lower.contains(kw));
    if !is_async_claim {
        return false;
    }

    let func_names: Vec<String> = IDENTIFIER_TOKEN_RE
        .find_iter(finding)
        .map(|m| m.as_str().to_string())
        .filter(|n| finding.contains(&format!("{n}(")) || finding.contains(&format!("`{n}`")))
        .collect();

    for name in &func_names {
        let sync_pattern = Regex::new(&format!(r"(?m)^\s*def\s+{}\s*\(", regex::escape(name))).unwrap();
        let async_pattern = Regex::new(&format!(r"(?m)^\s*async\s+def\s+{}\s*\(", regex::escape(name))).unwrap();

        if sync_pattern.is_match(diff) && !async_pattern.is_match(diff) {
            return true;
        }

        for caps in FILE_REF_RE.captures_iter(finding) {
            let fref = &caps[1];
            if let Some(lines) = read_lines(repo_root, fref) {
                let content = lines.join("\n");
                if sync_pattern.is_match(&content) && !async_pattern.is_match(&content) {
                    return true;
                }
            }
        }
    }
    false
}

fn falsifier_8_lazy_init(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let is_import_violation = [
        "direct import", "lazy init", "lazy initial", "violates adr-025", "should be lazy", "top-level import",
    ]
    .iter()
    .any(|kw| lower.contains(kw));
    if !is_import_violation {
        return false;
    }

    let words: Vec<&str> = lower.split_whitespace().filter(|w| w.len() > 3).collect();

    for caps in FILE_LINE_OPT_RE.captures_iter(finding) {
        let file = &caps[1];
        let Some(lines) = read_lines(repo_root, file) else { continue };
        for line in &lines {
            let stripped = line.trim_start();
            let is_import_stmt = stripped.starts_with("from ") || stripped.starts_with("import ") || stripped.starts_with("use ");
            if is_import_stmt && line != stripped {
                if words.iter().any(|w| stripped.to_lowercase().contains(w)) {
                    return true;
                }
                if line.to_lowercase().contains("adr-025") || line.to_lowercase().contains("lazy") {
                    return true;
                }
            }
        }
    }
    false
}

fn falsifier_9_pii_without_pii(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let pii_keywords = [
        "exposed email", "exposes email", "email leak", "developer email", "exposed name",
        "exposes name", "developer name", "exposes developer", "pii", "personal data", "data leak",
        "personally identifiable",
    ];
    if !pii_keywords.iter().any(|kw| lower.contains(kw)) {
        return false;
    }

    let refs: Vec<(String, u32)> =
        FILE_LINE_RE.captures_iter(finding).map(|c| (c[1].to_string(), c[2].parse().unwrap_or(0))).collect();
    if refs.is_empty() {
        return false;
    }

    for (file, line_num) in &refs {
        let Some(lines) = read_lines(repo_root, file) else { continue };
        if *line_num == 0 || *line_num as usize > lines.len() {
            continue;
        }
        let idx = *line_num as usize;
        let start = idx.saturating_sub(4);
        let end = (idx + 3).min(lines.len());
        let region = lines[start..end].join("\n");
        if EMAIL_RE.is_match(&region) || PHONE_RE.is_match(&region) {
            return false;
        }
    }
    true
}

fn falsifier_10_copyright_in_header(finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let about_header = lower.contains("copyright") || lower.contains("license header") || lower.contains("licence header");
    about_header && (lower.contains("exposes") || lower.contains("leak") || lower.contains("pii"))
}

fn falsifier_11_gdpr_on_source(finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let invokes_gdpr = lower.contains("gdpr") || lower.contains("lawful basis") || lower.contains("data protection");
    if !invokes_gdpr {
        return false;
    }
    [
        "source code", "code analysis", ".py file", "reading file", "processing code",
        "test generation", "ai service", "ai-powered", "function docstring", "generate test",
    ]
    .iter()
    .any(|kw| lower.contains(kw))
}

fn falsifier_12_yaml_safe_load(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    if !(lower.contains("yaml") && lower.contains("deserialization")) {
        return false;
    }
    for caps in FILE_LINE_RE.captures_iter(finding) {
        let file = &caps[1];
        if let Some(lines) = read_lines(repo_root, file) {
            let content = lines.join("\n");
            if content.contains("safe_load") && !content.contains("yaml.load(") {
                return true;
            }
        }
    }
    false
}

fn falsifier_13_license_header_present(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let topics = ["license", "copyright", "boilerplate"];
    let actions = [
        "missing", "add", "update", "should", "needs", "require", "lacks", "incorrect", "correct",
        "replace", "include", "insert", "standard", "generic", "holder",
    ];
    let is_license_related = topics.iter().any(|t| lower.contains(t)) && actions.iter().any(|a| lower.contains(a));
    if !is_license_related {
        return false;
    }

    let file_refs: Vec<String> = FILE_REF_RE.captures_iter(finding).map(|c| c[1].to_string()).collect();
    if file_refs.is_empty() {
        return false;
    }

    let mut any_file_found = false;
    for file in &file_refs {
        let Some(lines) = read_lines(repo_root, file) else { continue };
        any_file_found = true;
        let content = lines.join("\n");
        let head: String = content.chars().take(500).collect();
        if LICENSE_HEADER_RE.is_match(&head) {
            return true;
        }
    }
    !any_file_found
}

fn falsifier_14_copyright_holder_opinion(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let keywords = [
        "copyright holder", "copyright statement", "copyright notice", "correct copyright",
        "update the copyright", "replace the copyright", "generic statement", "copyright should",
    ];
    if !keywords.iter().any(|kw| lower.contains(kw)) {
        return false;
    }

    let refs: Vec<(String, u32)> =
        FILE_LINE_RE.captures_iter(finding).map(|c| (c[1].to_string(), c[2].parse().unwrap_or(0))).collect();
    if refs.is_empty() {
        return true;
    }

    for (file, line_num) in &refs {
        let Some(lines) = read_lines(repo_root, file) else { return true };
        if *line_num == 0 || *line_num as usize > lines.len() {
            continue;
        }
        let idx = *line_num as usize;
        let start = idx.saturating_sub(4);
        let end = (idx + 3).min(lines.len());
        let region = lines[start..end].join("\n").to_lowercase();
        if !region.contains("copyright") && !region.contains("license") {
            return true;
        }
    }
    false
}

fn falsifier_15_quoted_code_mismatch(repo_root: &Path, finding: &str) -> bool {
    for caps in FILE_LINE_RE.captures_iter(finding) {
        let file = &caps[1];
        let line_num: u32 = caps[2].parse().unwrap_or(0);
        let Some(after) = finding.get(caps.get(0).unwrap().end()..) else { continue };
        let Some(snippet_match) = QUOTED_SNIPPET_RE.find(after) else { continue };
        let snippet = snippet_match.as_str().trim_matches(|c| c == '`' || c == '"' || c == '\'');

        let Some(lines) = read_lines(repo_root, file) else { continue };
        if line_num == 0 || line_num as usize > lines.len() {
            continue;
        }
        let idx = line_num as usize;
        let start = idx.saturating_sub(6);
        let end = (idx + 5).min(lines.len());
        let region = lines[start..end].join("\n");

        let tokens: Vec<&str> = IDENTIFIER_TOKEN_RE.find_iter(snippet).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            continue;
        }
        let matches = tokens.iter().filter(|t| region.contains(*t)).count();
        let ratio = matches as f64 / tokens.len() as f64;
        if ratio < 0.3 {
            return true;
        }
    }
    false
}

fn falsifier_16_path_claim_mismatch(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let keywords = [
        "path traversal", "directory traversal", "symlink", "symlink manipulation", "symlink bypass",
        "path containment", "path escape", "escaping the repo", "command injection", "path injection",
    ];
    if !keywords.iter().any(|kw| lower.contains(kw)) {
        return false;
    }

    let markers = [
        "path(", "os.path", ".resolve()", "open(", "read_text(", "startswith(", "relative_to(",
        "is_relative_to(", "pathlib", "shutil", "symlink", "readlink",
    ];

    for caps in FILE_LINE_RE.captures_iter(finding) {
        let file = &caps[1];
        let line_num: u32 = caps[2].parse().unwrap_or(0);
        let Some(lines) = read_lines(repo_root, file) else { continue };
        if line_num == 0 || line_num as usize > lines.len() {
            continue;
        }
        let idx = line_num as usize;
        let start = idx.saturating_sub(6);
        let end = (idx + 5).min(lines.len());
        let region = lines[start..end].join("\n").to_lowercase();
        if !markers.iter().any(|m| region.contains(m)) {
            return true;
        }
    }
    false
}

fn falsifier_17_missing_x_disproof(repo_root: &Path, finding: &str) -> bool {
    let lower = finding.to_lowercase();
    let refs: Vec<(String, Option<u32>)> = FILE_LINE_OPT_RE
        .captures_iter(finding)
        .map(|c| (c[1].to_string(), c.get(2).and_then(|m| m.as_str().parse().ok())))
        .collect();
    if refs.is_empty() {
        return false;
    }

    let is_missing_claim = [
        "missing type hint", "missing type annotation", "lacks type hint", "no type hint",
        "untyped", "missing return type", "missing import", "should import", "import from wrong",
        "missing validation", "missing check", "no validation", "missing error handling",
        "no error handling",
    ]
    .iter()
    .any(|kw| lower.contains(kw));
    if !is_missing_claim {
        return false;
    }

    for (file, line_num) in &refs {
        let Some(lines) = read_lines(repo_root, file) else { continue };
        let content = lines.join("\n");

        if lower.contains("type hint") || lower.contains("type annotation") || lower.contains("untyped") {
            for name_match in IDENTIFIER_TOKEN_RE.find_iter(finding) {
                let name = name_match.as_str();
                let pattern = Regex::new(&format!(r"def\s+{}\s*\([^)]*\)\s*->", regex::escape(name))).unwrap();
                if pattern.is_match(&content) {
                    return true;
                }
            }
        }

        if lower.contains("import") {
            for name_match in IDENTIFIER_TOKEN_RE.find_iter(finding) {
                let name = name_match.as_str();
                let direct = Regex::new(&format!(r"\bimport\s+{}\b", regex::escape(name))).unwrap();
                let from_import = Regex::new(&format!(r"from\s+\S+\s+import\s+.*\b{}\b", regex::escape(name))).unwrap();
                if direct.is_match(&content) || from_import.is_match(&content) {
                    return true;
                }
            }
        }

        if (lower.contains("validation") || lower.contains("check")) && line_num.is_some() {
            let idx = line_num.unwrap() as usize;
            if idx >= 1 && idx <= lines.len() {
                let start = idx.saturating_sub(20);
                let end = (idx + 20).min(lines.len());
                let region = lines[start..end].join("\n");
                let validation_patterns = [
                    r"\.resolve\(\)\.relative_to\(",
                    r"if\s+not\s+\w+",
                    r"raise\s+\w+Error",
                    r"validate\w*\(",
                    r"assert\s+",
                ];
                for vp in validation_patterns {
                    if Regex::new(vp).unwrap().is_match(&region) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Runs every falsifier in order against `finding`. Returns `true` if the
/// finding survives (is admissible), `false` if it was filtered.
pub fn validate_finding(repo_root: &Path, finding: &str, diff: &str) -> bool {
    if falsifier_1_missing_citation(finding) {
        return false;
    }
    if falsifier_2_out_of_hunk(finding, diff) {
        return false;
    }
    if falsifier_3_self_referential(finding) {
        return false;
    }
    if falsifier_4_meta_finding(finding) {
        return false;
    }
    if falsifier_5_line_drift(repo_root, finding) {
        return false;
    }
    if falsifier_6_stdlib_dependency(finding) {
        return false;
    }
    if falsifier_7_sync_as_async(repo_root, finding, diff) {
        return false;
    }
    if falsifier_8_lazy_init(repo_root, finding) {
        return false;
    }
    if falsifier_9_pii_without_pii(repo_root, finding) {
        return false;
    }
    if falsifier_10_copyright_in_header(finding) {
        return false;
    }
    if falsifier_11_gdpr_on_source(finding) {
        return false;
    }
    if falsifier_12_yaml_safe_load(repo_root, finding) {
        return false;
    }
    if falsifier_13_license_header_present(repo_root, finding) {
        return false;
    }
    if falsifier_14_copyright_holder_opinion(repo_root, finding) {
        return false;
    }
    if falsifier_15_quoted_code_mismatch(repo_root, finding) {
        return false;
    }
    if falsifier_16_path_claim_mismatch(repo_root, finding) {
        return false;
    }
    if falsifier_17_missing_x_disproof(repo_root, finding) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_citation_is_filtered() {
        let dir = tempdir().unwrap();
        assert!(!validate_finding(dir.path(), "The function handle() is unsafe.", ""));
    }

    #[test]
    fn citation_present_survives_with_no_diff() {
        let dir = tempdir().unwrap();
        assert!(validate_finding(dir.path(), "The function is unsafe (Source: foo.py:1)", ""));
    }

    #[test]
    fn out_of_hunk_line_is_filtered() {
        let dir = tempdir().unwrap();
        let diff = "--- a/foo.py\n+++ b/foo.py\n@@ -1,3 +1,3 @@\n+x = 1\n";
        let finding = "Issue at foo.py:500 (Source: foo.py:500)";
        assert!(!validate_finding(dir.path(), finding, diff));
    }

    #[test]
    fn in_hunk_line_survives() {
        let dir = tempdir().unwrap();
        let diff = "--- a/foo.py\n+++ b/foo.py\n@@ -1,3 +1,3 @@\n+x = 1\n";
        let finding = "Issue at foo.py:2 (Source: foo.py:2)";
        assert!(validate_finding(dir.path(), finding, diff));
    }

    #[test]
    fn file_not_in_diff_is_not_filtered_by_hunk_check() {
        let dir = tempdir().unwrap();
        let diff = "--- a/bar.py\n+++ b/bar.py\n@@ -1,3 +1,3 @@\n+x = 1\n";
        let finding = "Issue at foo.py:999 (Source: foo.py:999)";
        assert!(validate_finding(dir.path(), finding, diff));
    }

    #[test]
    fn self_referential_governance_finding_is_filtered() {
        let dir = tempdir().unwrap();
        let finding = "governance.py calls _resolve_file_path insecurely (Source: governance.py:10)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn meta_finding_without_file_ref_is_filtered() {
        let dir = tempdir().unwrap();
        let finding = "The preflight process needs to eliminate false positives (Source: notes)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn meta_phrase_with_real_file_ref_survives() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "def handle():\n    pass\n").unwrap();
        let finding = "handle() has a false positive rate issue at foo.py:1 (Source: foo.py:1)";
        assert!(validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn stdlib_module_flagged_as_dependency_is_filtered() {
        let dir = tempdir().unwrap();
        let finding = "Add `ast` to pyproject.toml as a dependency (Source: pyproject.toml:3)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn sync_function_flagged_as_needing_await_is_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("svc.py"), "def fetch():\n    return 1\n").unwrap();
        let finding = "`fetch` is not awaited and should be async (Source: svc.py:1)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn pii_claim_without_pii_in_region_is_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "x = 1\ny = 2\nz = 3\n").unwrap();
        let finding = "exposed email leak at foo.py:2 (Source: foo.py:2)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn pii_claim_with_real_email_survives() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "x = 1\nadmin_email = 'a@b.com'\nz = 3\n").unwrap();
        let finding = "exposed email leak at foo.py:2 (Source: foo.py:2)";
        assert!(validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn copyright_in_license_header_claim_is_filtered() {
        let dir = tempdir().unwrap();
        let finding = "This license header exposes PII via the copyright name (Source: foo.py:1)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn gdpr_on_source_code_is_filtered() {
        let dir = tempdir().unwrap();
        let finding = "Reading .py file content requires a GDPR lawful basis (Source: foo.py:1)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn yaml_safe_load_flag_is_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "import yaml\ndata = yaml.safe_load(f)\n").unwrap();
        let finding = "yaml deserialization vulnerability (Source: foo.py:2)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn license_header_present_claim_is_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "# Copyright 2026\n# Licensed under the Apache License\nx=1\n").unwrap();
        let finding = "foo.py is missing a license header (Source: foo.py:1)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn generic_copyright_holder_opinion_without_line_is_filtered() {
        let dir = tempdir().unwrap();
        let finding = "The copyright holder name should be updated (Source: notes)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn path_traversal_claim_without_path_code_is_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "x = 1\ny = 2\nz = 3\n").unwrap();
        let finding = "path traversal vulnerability at foo.py:2 (Source: foo.py:2)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn path_traversal_claim_with_path_code_survives() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "p = Path(x)\np.resolve()\nz = 3\n").unwrap();
        let finding = "path traversal vulnerability at foo.py:2 (Source: foo.py:2)";
        assert!(validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn missing_type_hint_claim_disproved_by_annotation() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "def handle(x: int) -> str:\n    return str(x)\n").unwrap();
        let finding = "handle is missing type hint (Source: foo.py:1)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn line_drift_with_no_matching_keywords_is_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.py"), "x = 1\ny = 2\nz = 3\n").unwrap();
        let finding = "missing type hint on handle at foo.py:2 (Source: foo.py:2)";
        assert!(!validate_finding(dir.path(), finding, ""));
    }

    #[test]
    fn resolve_file_path_tries_prefixes() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join(".agent/src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("mod.py"), "x=1").unwrap();
        assert!(resolve_file_path(dir.path(), "mod.py").is_some());
    }

    #[test]
    fn resolve_file_path_strips_leading_agent_segment() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join(".agent/src/agent/commands");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("x.py"), "x=1").unwrap();
        assert!(resolve_file_path(dir.path(), "agent/commands/x.py").is_some());
    }
}
