// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Provider Router (C1) and Provider Fallback Chain (C2).

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderErrorKind};
use crate::provider::CompletionRequest;
use crate::registry::{ProviderRegistry, FALLBACK_ORDER};

/// Default retry count when the caller does not supply one (e.g. tests
/// calling the router directly rather than through `agent.panel.num_retries`).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

fn base_delay(provider_id: &str) -> Duration {
    if provider_id == "gh" { Duration::from_secs(3) } else { Duration::from_secs(2) }
}

/// Issues one completion call, retrying up to `max_retries` times on
/// transient errors with exponential backoff `base * 2^attempt`. A
/// transient error that exhausts its retries is reclassified as
/// `ProviderTerminal` so the fallback chain advances instead of retrying
/// forever.
pub async fn call_with_retry(
    registry: &ProviderRegistry,
    provider_id: &str,
    req: &CompletionRequest,
    max_retries: u32,
) -> Result<String, ProviderError> {
    let provider = registry
        .get(provider_id)
        .ok_or_else(|| ProviderError::terminal(format!("provider '{provider_id}' not configured")))?;

    let delay = base_delay(provider_id);
    let mut attempt = 0u32;

    loop {
        let start = Instant::now();
        match provider.complete(req).await {
            Ok(text) => {
                debug!(
                    provider = provider_id,
                    model = provider.default_model(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    outcome = "success",
                    "provider call completed"
                );
                return Ok(text);
            }
            Err(e) if e.kind == ProviderErrorKind::TransientNetwork && attempt < max_retries => {
                warn!(
                    provider = provider_id,
                    attempt,
                    error = %e.message,
                    "transient provider error, retrying"
                );
                tokio::time::sleep(delay * 2u32.pow(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                let outcome = match e.kind {
                    ProviderErrorKind::FatalTransport => "fatal",
                    _ => "terminal",
                };
                debug!(
                    provider = provider_id,
                    model = provider.default_model(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    outcome,
                    "provider call failed"
                );
                let final_kind = if e.kind == ProviderErrorKind::TransientNetwork {
                    ProviderErrorKind::ProviderTerminal
                } else {
                    e.kind
                };
                return Err(ProviderError { kind: final_kind, message: e.message });
            }
        }
    }
}

/// Walks the fallback chain: a forced provider is tried first (still
/// participating in fallback unless `disable_fallback` is set), then the
/// canonical order, skipping unconfigured providers. A fatal transport
/// error propagates immediately with no further attempts. Chain exhaustion
/// returns the last terminal error.
pub async fn complete_with_fallback(
    registry: &ProviderRegistry,
    forced: Option<&str>,
    disable_fallback: bool,
    req: &CompletionRequest,
    max_retries: u32,
) -> Result<(String, String), ProviderError> {
    let mut chain: Vec<&str> = Vec::new();
    if let Some(f) = forced {
        chain.push(f);
        if disable_fallback {
            let text = call_with_retry(registry, f, req, max_retries).await?;
            return Ok((f.to_string(), text));
        }
    }
    for candidate in FALLBACK_ORDER {
        if Some(candidate) != forced {
            chain.push(candidate);
        }
    }

    let mut last_err: Option<ProviderError> = None;
    for provider_id in chain {
        if !registry.is_configured(provider_id) {
            continue;
        }
        match call_with_retry(registry, provider_id, req, max_retries).await {
            Ok(text) => return Ok((provider_id.to_string(), text)),
            Err(e) if e.kind == ProviderErrorKind::FatalTransport => return Err(e),
            Err(e) => {
                last_err = Some(e);
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ProviderError::terminal("no provider configured")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ModelProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyProvider {
        id: &'static str,
        fail_times: AtomicUsize,
        error_kind: ProviderErrorKind,
    }

    #[async_trait]
    impl ModelProvider for FlakyProvider {
        fn id(&self) -> &'static str {
            self.id
        }
        fn default_model(&self) -> &str {
            "test-model"
        }
        async fn complete(&self, _req: &CompletionRequest) -> Result<String, ProviderError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(ProviderError { kind: self.error_kind, message: "synthetic failure".into() })
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn registry_with(id: &'static str, provider: Arc<dyn ModelProvider>) -> ProviderRegistry {
        let mut handles = std::collections::HashMap::new();
        handles.insert(id, provider);
        ProviderRegistry { handles }
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let provider = Arc::new(FlakyProvider {
            id: "openai",
            fail_times: AtomicUsize::new(2),
            error_kind: ProviderErrorKind::TransientNetwork,
        });
        let registry = registry_with("openai", provider);
        let req = CompletionRequest::default();
        let result = call_with_retry(&registry, "openai", &req, DEFAULT_MAX_RETRIES).await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn exhausted_retries_reclassify_as_terminal() {
        let provider = Arc::new(FlakyProvider {
            id: "openai",
            fail_times: AtomicUsize::new(99),
            error_kind: ProviderErrorKind::TransientNetwork,
        });
        let registry = registry_with("openai", provider);
        let req = CompletionRequest::default();
        let err = call_with_retry(&registry, "openai", &req, DEFAULT_MAX_RETRIES).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ProviderTerminal);
    }

    #[tokio::test]
    async fn fatal_error_propagates_without_retry() {
        let provider = Arc::new(FlakyProvider {
            id: "anthropic",
            fail_times: AtomicUsize::new(99),
            error_kind: ProviderErrorKind::FatalTransport,
        });
        let registry = registry_with("anthropic", provider);
        let req = CompletionRequest::default();
        let err = call_with_retry(&registry, "anthropic", &req, DEFAULT_MAX_RETRIES).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::FatalTransport);
    }

    #[tokio::test]
    async fn fallback_skips_unconfigured_and_uses_next_provider() {
        let provider = Arc::new(FlakyProvider {
            id: "anthropic",
            fail_times: AtomicUsize::new(0),
            error_kind: ProviderErrorKind::ProviderTerminal,
        });
        let registry = registry_with("anthropic", provider);
        let req = CompletionRequest::default();
        let (used, text) = complete_with_fallback(&registry, None, false, &req, DEFAULT_MAX_RETRIES).await.unwrap();
        assert_eq!(used, "anthropic");
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn fallback_exhaustion_propagates_last_error() {
        let registry = ProviderRegistry { handles: std::collections::HashMap::new() };
        let req = CompletionRequest::default();
        let err = complete_with_fallback(&registry, None, false, &req, DEFAULT_MAX_RETRIES).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ProviderTerminal);
    }
}
