// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Provider registry: one lazily-constructed handle per provider, held for
//! the process lifetime and exclusively owned by the router: a
//! lazily-constructed, process-scoped registry keyed by provider id,
//! replacing a module-level singleton.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use council_config::AgentConfig;

use crate::anthropic::AnthropicProvider;
use crate::gh::GhProvider;
use crate::google::GoogleProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::provider::ModelProvider;

/// Canonical fallback order. Never reordered at runtime.
pub const FALLBACK_ORDER: [&str; 6] = ["gh", "gemini", "vertex", "openai", "anthropic", "ollama"];

pub struct ProviderRegistry {
    pub(crate) handles: HashMap<&'static str, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    pub fn get(&self, id: &str) -> Option<Arc<dyn ModelProvider>> {
        self.handles.get(id).cloned()
    }

    pub fn is_configured(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }
}

fn model_for(cfg: &AgentConfig, provider: &str, default: &str) -> String {
    cfg.models.get(provider).cloned().unwrap_or_else(|| default.to_string())
}

/// Builds every provider whose credentials are discoverable from the
/// environment. API keys never flow through `cfg` (there is no
/// credential-bearing config field) — they come from a secret store with
/// env-var fallback, and are never logged.
///
/// `gh` availability is probed by the caller (it requires an async
/// subprocess check) and passed in as `gh_available`.
pub fn build_registry(cfg: &AgentConfig, gh_available: bool) -> ProviderRegistry {
    let mut handles: HashMap<&'static str, Arc<dyn ModelProvider>> = HashMap::new();

    if gh_available {
        let model = model_for(cfg, "gh", "gpt-4o");
        handles.insert("gh", Arc::new(GhProvider::new(model)));
    }

    if let Ok(key) = env::var("OPENAI_API_KEY") {
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| model_for(cfg, "openai", "gpt-4o"));
        handles.insert(
            "openai",
            Arc::new(OpenAiCompatProvider::new("openai", model, Some(key), "https://api.openai.com/v1".to_string())),
        );
    }

    if let Ok(key) = env::var("GOOGLE_GEMINI_API_KEY").or_else(|_| env::var("GEMINI_API_KEY")) {
        let model = model_for(cfg, "gemini", "gemini-2.0-flash");
        handles.insert("gemini", Arc::new(GoogleProvider::gemini(model, key)));
    }

    if let (Ok(project), Ok(location)) =
        (env::var("GOOGLE_CLOUD_PROJECT"), env::var("GOOGLE_CLOUD_LOCATION"))
    {
        let model = model_for(cfg, "vertex", "gemini-2.0-flash");
        // The bearer token is resolved from application default credentials
        // by the host environment (e.g. `gcloud auth print-access-token`);
        // this registry does not mint tokens itself.
        if let Ok(token) = env::var("GOOGLE_APPLICATION_CREDENTIALS_TOKEN") {
            handles.insert("vertex", Arc::new(GoogleProvider::vertex(model, project, location, token)));
        }
    }

    if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
        let model = model_for(cfg, "anthropic", "claude-sonnet-4-5");
        handles.insert("anthropic", Arc::new(AnthropicProvider::new(model, key)));
    }

    let ollama_host = env::var("OLLAMA_HOST").unwrap_or_default();
    let ollama_model = model_for(cfg, "ollama", "llama3");
    if let Ok(provider) = OpenAiCompatProvider::ollama(ollama_model, &ollama_host) {
        handles.insert("ollama", Arc::new(provider));
    }

    ProviderRegistry { handles }
}
