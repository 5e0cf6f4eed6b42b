// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The [`ModelProvider`] trait: one async completion call per backend.

use async_trait::async_trait;

use crate::error::ProviderError;

/// A single completion request. Providers that support streaming
/// (`gemini`, `vertex`, `anthropic`) consume their stream internally and
/// return the concatenation — callers never see partial output, which
/// keeps the fallback chain and retry loop working over a plain `Result`.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Overrides the provider's configured default model for this call.
    pub model: Option<String>,
    /// `Some(0.0)` for the governance path (deterministic); `None` lets the
    /// provider use its own default.
    pub temperature: Option<f32>,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Stable identifier: `gh`, `openai`, `gemini`, `vertex`, `anthropic`,
    /// `ollama`.
    fn id(&self) -> &'static str;

    /// The model this handle will use absent a per-call override.
    fn default_model(&self) -> &str;

    /// Whether this provider streams its response and must be drained
    /// incrementally (gemini/vertex/anthropic) rather than issuing one
    /// blocking request (openai/ollama/gh).
    fn streams(&self) -> bool {
        false
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String, ProviderError>;
}
