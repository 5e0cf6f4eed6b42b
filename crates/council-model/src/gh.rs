// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `gh` CLI provider: shells out to the `gh-models` extension.
//!
//! Selection is gated on `gh --version` succeeding and the `gh-models`
//! extension being installed (auto-installed on first check) — see
//! [`is_available`].

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ProviderError;
use crate::provider::{CompletionRequest, ModelProvider};

pub struct GhProvider {
    model: String,
}

impl GhProvider {
    pub fn new(model: String) -> Self {
        Self { model }
    }

    /// Checks `gh --version` and ensures the `gh-models` extension is
    /// installed, installing it if missing. Returns `false` (never errors)
    /// if `gh` is not on PATH at all — the caller treats this provider as
    /// unconfigured and skips it in the fallback chain.
    pub async fn is_available() -> bool {
        let version_ok = Command::new("gh").arg("--version").output().await.map(|o| o.status.success()).unwrap_or(false);
        if !version_ok {
            return false;
        }
        let has_extension = Command::new("gh")
            .args(["extension", "list"])
            .output()
            .await
            .map(|o| String::from_utf8_lossy(&o.stdout).contains("gh-models"))
            .unwrap_or(false);
        if has_extension {
            return true;
        }
        Command::new("gh")
            .args(["extension", "install", "github/gh-models"])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ModelProvider for GhProvider {
    fn id(&self) -> &'static str {
        "gh"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String, ProviderError> {
        let model = req.model.clone().unwrap_or_else(|| self.model.clone());
        let prompt = format!("{}\n\n{}", req.system_prompt, req.user_prompt);

        let output = Command::new("gh")
            .args(["models", "run", &model, &prompt])
            .output()
            .await
            .map_err(|e| ProviderError::transient(format!("gh spawn error: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(ProviderError::classify(format!("gh exited non-zero: {stderr}")));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_reflects_constructor_arg() {
        let p = GhProvider::new("gpt-4o".into());
        assert_eq!(p.default_model(), "gpt-4o");
        assert_eq!(p.id(), "gh");
    }
}
