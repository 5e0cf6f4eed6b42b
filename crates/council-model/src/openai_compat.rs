// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! OpenAI-compatible chat-completions provider.
//!
//! Backs both `openai` (HTTPS, Bearer auth) and `ollama` (loopback-only,
//! no auth). Non-streaming: the governance path issues one request and
//! reads the full JSON body, since C1 only requires streaming for
//! `gemini`/`vertex`/`anthropic`.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ProviderError;
use crate::provider::{CompletionRequest, ModelProvider};

pub struct OpenAiCompatProvider {
    id: &'static str,
    model: String,
    api_key: Option<String>,
    chat_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(id: &'static str, model: String, api_key: Option<String>, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            id,
            model,
            api_key,
            chat_url: format!("{base_url}/chat/completions"),
            client: reqwest::Client::new(),
        }
    }

    /// Constructs the `ollama` provider, enforcing a loopback-only guard:
    /// `OLLAMA_HOST` must resolve to `127.0.0.1` or `localhost`.
    pub fn ollama(model: String, host: &str) -> Result<Self, ProviderError> {
        let host = host.trim();
        let is_loopback = host.is_empty()
            || host.contains("127.0.0.1")
            || host.contains("localhost")
            || host.contains("[::1]");
        if !is_loopback {
            return Err(ProviderError::terminal(format!(
                "ollama host '{host}' does not resolve to loopback; refusing for security"
            )));
        }
        let base = if host.is_empty() { "http://127.0.0.1:11434".to_string() } else { host.to_string() };
        Ok(Self::new("ollama", model, None, format!("{base}/v1")))
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String, ProviderError> {
        let model = req.model.clone().unwrap_or_else(|| self.model.clone());
        let mut body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": req.system_prompt},
                {"role": "user", "content": req.user_prompt},
            ],
            "stream": false,
        });
        if let Some(temp) = req.temperature {
            body["temperature"] = json!(temp);
        }

        let mut builder = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ProviderError::classify(format!("{} request error: {e}", self.id)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = format!("{} error {status}: {text}", self.id);
            if status.as_u16() == 429 {
                return Err(ProviderError::transient(message));
            }
            if status.is_client_error() {
                return Err(ProviderError::terminal(message));
            }
            return Err(ProviderError::classify(message));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::terminal(format!("{} parse error: {e}", self.id)))?;

        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::terminal(format!("{}: no choices in response", self.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_accepts_empty_host_as_default_loopback() {
        let p = OpenAiCompatProvider::ollama("llama3".into(), "").unwrap();
        assert_eq!(p.id(), "ollama");
        assert_eq!(p.chat_url, "http://127.0.0.1:11434/v1/chat/completions");
    }

    #[test]
    fn ollama_accepts_localhost_host() {
        let p = OpenAiCompatProvider::ollama("llama3".into(), "http://localhost:11434").unwrap();
        assert!(p.chat_url.starts_with("http://localhost:11434"));
    }

    #[test]
    fn ollama_rejects_non_loopback_host() {
        let result = OpenAiCompatProvider::ollama("llama3".into(), "http://evil.example.com:11434");
        assert!(result.is_err());
    }

    #[test]
    fn openai_chat_url_strips_trailing_slash_from_base() {
        let p = OpenAiCompatProvider::new("openai", "gpt-4o".into(), None, "https://api.openai.com/v1/".into());
        assert_eq!(p.chat_url, "https://api.openai.com/v1/chat/completions");
    }
}
