// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Diff Chunker (C7): splits a unified diff into byte-order-preserving,
//! disjoint pieces sized for the chosen provider's context window.

/// `gh` (GitHub Models CLI) has a tight prompt budget; every other provider
/// in the fallback chain accepts a context window large enough that a
/// typical governance diff never needs splitting.
const GH_CHUNK_CHARS: usize = 6000;
const LARGE_CONTEXT_CHARS: usize = usize::MAX;

fn chunk_size_for(provider: &str) -> usize {
    if provider == "gh" {
        GH_CHUNK_CHARS
    } else {
        LARGE_CONTEXT_CHARS
    }
}

/// Splits `diff` on line boundaries into chunks no larger than the
/// provider's chunk size. Chunks are disjoint, cover the entire diff, and
/// preserve byte order; a chunk never exceeds the target size unless a
/// single line does (a line is never split mid-line).
pub fn chunk_diff(diff: &str, provider: &str) -> Vec<String> {
    let limit = chunk_size_for(provider);
    if diff.len() <= limit {
        return vec![diff.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in diff.split_inclusive('\n') {
        if !current.is_empty() && current.len() + line.len() > limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Formats the `i/N` chunk-index marker included in each role prompt.
pub fn chunk_label(index: usize, total: usize) -> String {
    format!("{}/{}", index + 1, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_context_provider_never_splits() {
        let diff = "x".repeat(50_000);
        assert_eq!(chunk_diff(&diff, "openai").len(), 1);
    }

    #[test]
    fn gh_splits_long_diff_into_multiple_chunks() {
        let line = "+".repeat(100) + "\n";
        let diff = line.repeat(100); // 10,100 chars
        let chunks = chunk_diff(&diff, "gh");
        assert!(chunks.len() > 1);
    }

    #[test]
    fn chunks_are_disjoint_and_cover_the_whole_diff() {
        let line = "+".repeat(100) + "\n";
        let diff = line.repeat(100);
        let chunks = chunk_diff(&diff, "gh");
        assert_eq!(chunks.concat(), diff);
    }

    #[test]
    fn chunk_label_is_one_indexed() {
        assert_eq!(chunk_label(0, 3), "1/3");
        assert_eq!(chunk_label(2, 3), "3/3");
    }

    #[test]
    fn short_diff_under_limit_is_a_single_chunk() {
        let diff = "+small change\n";
        assert_eq!(chunk_diff(diff, "gh"), vec![diff.to_string()]);
    }
}
