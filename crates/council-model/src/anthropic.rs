// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Anthropic Messages API provider, consumed as a server-sent-event stream
//! and concatenated into a single completion string. Streaming is consumed
//! incrementally rather than buffered server-side, which avoids
//! idle-connection timeouts on long outputs.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use crate::error::ProviderError;
use crate::provider::{CompletionRequest, ModelProvider};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(model: String, api_key: String) -> Self {
        Self { model, api_key, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn id(&self) -> &'static str {
        "anthropic"
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
            "model": model,
            "max_tokens": 4096,
            "system": req.system_prompt,
            "messages": [{"role": "user", "content": req.user_prompt}],
            "stream": true,
        });
        if let Some(temp) = req.temperature {
            body["temperature"] = json!(temp);
        }

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::classify(format!("anthropic request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = format!("anthropic error {status}: {text}");
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
            let chunk = chunk.map_err(|e| ProviderError::classify(format!("anthropic stream error: {e}")))?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            for line in drain_complete_lines(&mut buf) {
                if let Some(delta) = parse_sse_text_delta(&line) {
                    out.push_str(&delta);
                }
            }
        }

        Ok(out)
    }
}

/// Splits complete `\n`-terminated lines off the front of `buf`, leaving any
/// trailing partial line for the next chunk. Strips `\r` for CRLF streams.
fn drain_complete_lines(buf: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.find('\n') {
        let line = buf[..pos].trim_end_matches('\r').to_string();
        lines.push(line);
        buf.drain(..=pos);
    }
    lines
}

/// Extracts the text delta from an Anthropic `content_block_delta` SSE line,
/// if present.
fn parse_sse_text_delta(line: &str) -> Option<String> {
    let data = line.strip_prefix("data: ")?;
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    if value["type"] != "content_block_delta" {
        return None;
    }
    value["delta"]["text"].as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_only_complete_lines() {
        let mut buf = "data: one\ndata: two".to_string();
        let lines = drain_complete_lines(&mut buf);
        assert_eq!(lines, vec!["data: one".to_string()]);
        assert_eq!(buf, "data: two");
    }

    #[test]
    fn drains_lines_split_across_chunks() {
        let mut buf = "data: partial".to_string();
        assert!(drain_complete_lines(&mut buf).is_empty());
        buf.push_str(" line\n");
        let lines = drain_complete_lines(&mut buf);
        assert_eq!(lines, vec!["data: partial line".to_string()]);
    }

    #[test]
    fn parses_content_block_delta_text() {
        let line = r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"hello"}}"#;
        assert_eq!(parse_sse_text_delta(line), Some("hello".to_string()));
    }

    #[test]
    fn ignores_non_delta_events() {
        let line = r#"data: {"type":"message_start"}"#;
        assert_eq!(parse_sse_text_delta(line), None);
    }

    #[test]
    fn strips_crlf() {
        let mut buf = "data: one\r\n".to_string();
        let lines = drain_complete_lines(&mut buf);
        assert_eq!(lines, vec!["data: one".to_string()]);
    }
}
