// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `agent.panel.thorough` file context: full-file signature summaries for
//! files touched by a diff, injected into the role prompt so a reviewer can
//! see that a symbol exists outside the hunk instead of flagging it missing.

use std::path::Path;

const MAX_CONTEXT_CHARS: usize = 30_000;
const PREVIEW_LINES: usize = 30;

const SIGNATURE_PREFIXES: &[&str] = &[
    "fn ", "pub fn ", "pub(crate) fn ", "async fn ", "pub async fn ",
    "def ", "async def ",
    "class ", "struct ", "pub struct ", "enum ", "pub enum ", "impl ", "trait ", "pub trait ",
    "interface ", "function ", "export function ", "export default function ",
    "export class ", "export interface ", "public class ", "public interface ", "public static",
    "func ",
];

fn looks_like_signature(line: &str) -> bool {
    let trimmed = line.trim_start();
    SIGNATURE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

fn changed_files(diff: &str) -> Vec<String> {
    let mut files = Vec::new();
    for line in diff.lines() {
        if let Some(path) = line.strip_prefix("+++ b/") {
            if !path.is_empty() && path != "/dev/null" && !files.contains(&path.to_string()) {
                files.push(path.to_string());
            }
        }
    }
    files
}

/// One file's section of the context block: a line-numbered signature list,
/// or a short preview when nothing looks like a declaration.
fn file_section(repo_root: &Path, relative: &str) -> Option<String> {
    let content = std::fs::read_to_string(repo_root.join(relative)).ok()?;

    let signatures: Vec<String> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| looks_like_signature(line))
        .map(|(i, line)| format!("  L{}: {}", i + 1, line.trim()))
        .collect();

    if !signatures.is_empty() {
        return Some(format!("FILE: {relative}\n{}", signatures.join("\n")));
    }

    let preview: Vec<&str> = content.lines().take(PREVIEW_LINES).collect();
    if preview.is_empty() {
        return None;
    }
    Some(format!("FILE: {relative} (preview)\n{}", preview.join("\n")))
}

/// Builds the `<file_context>` block for a diff: one section per changed
/// file that still exists on disk, capped to keep the prompt bounded.
/// Empty when the diff touches no files, or none of them exist.
pub fn build_file_context(repo_root: &Path, diff: &str) -> String {
    let files = changed_files(diff);
    if files.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = files.iter().filter_map(|f| file_section(repo_root, f)).collect();
    if parts.is_empty() {
        return String::new();
    }

    let mut result = parts.join("\n\n");
    if result.len() > MAX_CONTEXT_CHARS {
        result.truncate(MAX_CONTEXT_CHARS);
        result.push_str("\n... (file context truncated)");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_yields_empty_context() {
        assert_eq!(build_file_context(Path::new("."), ""), "");
    }

    #[test]
    fn missing_file_is_skipped() {
        let diff = "+++ b/does/not/exist.rs\n";
        assert_eq!(build_file_context(Path::new("."), diff), "");
    }

    #[test]
    fn extracts_function_signature_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "use std::fmt;\n\npub fn greet(name: &str) -> String {\n    String::new()\n}\n").unwrap();
        let diff = "+++ b/lib.rs\n";
        let ctx = build_file_context(dir.path(), diff);
        assert!(ctx.contains("FILE: lib.rs"));
        assert!(ctx.contains("L3: pub fn greet(name: &str) -> String {"));
    }

    #[test]
    fn falls_back_to_preview_when_no_signatures_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "just some prose\nwith no declarations\n").unwrap();
        let diff = "+++ b/notes.md\n";
        let ctx = build_file_context(dir.path(), diff);
        assert!(ctx.contains("notes.md (preview)"));
        assert!(ctx.contains("just some prose"));
    }
}
