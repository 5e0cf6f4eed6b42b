// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Google GenAI streaming provider, backing both `gemini` (API key auth)
//! and `vertex` (cloud project + location via application default
//! credentials, no API key).

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use crate::error::ProviderError;
use crate::provider::{CompletionRequest, ModelProvider};

enum Auth {
    ApiKey(String),
    /// Vertex uses application default credentials; the bearer token is
    /// expected to already be resolvable from the ambient environment
    /// (`gcloud auth application-default login` or workload identity).
    /// This provider does not itself mint tokens — it is handed one.
    ApplicationDefault { project: String, location: String, bearer_token: String },
}

pub struct GoogleProvider {
    id: &'static str,
    model: String,
    auth: Auth,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn gemini(model: String, api_key: String) -> Self {
        Self { id: "gemini", model, auth: Auth::ApiKey(api_key), client: reqwest::Client::new() }
    }

    pub fn vertex(model: String, project: String, location: String, bearer_token: String) -> Self {
        Self {
            id: "vertex",
            model,
            auth: Auth::ApplicationDefault { project, location, bearer_token },
            client: reqwest::Client::new(),
        }
    }

    fn stream_url(&self, model: &str) -> String {
        match &self.auth {
            Auth::ApiKey(_) => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:streamGenerateContent?alt=sse"
            ),
            Auth::ApplicationDefault { project, location, .. } => format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:streamGenerateContent?alt=sse"
            ),
        }
    }
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn streams(&self) -> bool {
        true
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String, ProviderError> {
        let model = req.model.clone().unwrap_or_else(|| self.model.clone());
        let mut body = json!({
            "system_instruction": {"parts": [{"text": req.system_prompt}]},
            "contents": [{"role": "user", "parts": [{"text": req.user_prompt}]}],
        });
        if let Some(temp) = req.temperature {
            body["generationConfig"] = json!({"temperature": temp});
        }

        let mut builder = self.client.post(self.stream_url(&model)).json(&body);
        builder = match &self.auth {
            Auth::ApiKey(key) => builder.header("x-goog-api-key", key),
            Auth::ApplicationDefault { bearer_token, .. } => builder.bearer_auth(bearer_token),
        };

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

        let mut stream = resp.bytes_stream();
        let mut buf = String::new();
        let mut out = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::classify(format!("{} stream error: {e}", self.id)))?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            for line in drain_complete_lines(&mut buf) {
                if let Some(delta) = parse_sse_text(&line) {
                    out.push_str(&delta);
                }
            }
        }

        Ok(out)
    }
}

fn drain_complete_lines(buf: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.find('\n') {
        let line = buf[..pos].trim_end_matches('\r').to_string();
        lines.push(line);
        buf.drain(..=pos);
    }
    lines
}

fn parse_sse_text(line: &str) -> Option<String> {
    let data = line.strip_prefix("data: ")?;
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    value["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_uses_api_key_header_and_public_url() {
        let p = GoogleProvider::gemini("gemini-2.0-flash".into(), "k".into());
        let url = p.stream_url("gemini-2.0-flash");
        assert!(url.starts_with("https://generativelanguage.googleapis.com"));
    }

    #[test]
    fn vertex_uses_project_location_url() {
        let p = GoogleProvider::vertex("gemini-2.0-flash".into(), "my-proj".into(), "us-central1".into(), "tok".into());
        let url = p.stream_url("gemini-2.0-flash");
        assert!(url.contains("us-central1-aiplatform.googleapis.com"));
        assert!(url.contains("projects/my-proj/locations/us-central1"));
    }

    #[test]
    fn parses_candidate_text_delta() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#;
        assert_eq!(parse_sse_text(line), Some("hi".to_string()));
    }

    #[test]
    fn ignores_lines_without_candidates() {
        let line = r#"data: {"usageMetadata":{}}"#;
        assert_eq!(parse_sse_text(line), None);
    }
}
