// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Classified provider errors.
//!
//! Every call into a [`crate::provider::ModelProvider`] returns one of three
//! error kinds so the retry loop (C1) and fallback chain (C2) can decide
//! what to do without re-parsing error text at every call site.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Rate limit, disconnect, timeout, reset, DNS failure, or similar.
    /// Retried up to N times before being reclassified as `ProviderTerminal`.
    TransientNetwork,
    /// A non-rate-limit 4xx, or a transient error that exhausted its
    /// retries. Triggers the fallback chain.
    ProviderTerminal,
    /// SSL/certificate failure or `DEADLINE_EXCEEDED`. Propagates straight
    /// to the caller; no retry, no fallback.
    FatalTransport,
}

#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::TransientNetwork, message: message.into() }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::ProviderTerminal, message: message.into() }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self { kind: ProviderErrorKind::FatalTransport, message: message.into() }
    }

    /// Classify a raw error/status string using the transient-error keyword
    /// list from the router policy: rate limit, disconnect, timeout, reset,
    /// DNS, remote protocol error.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if is_fatal_transport(&lower) {
            Self::fatal(message)
        } else if is_transient(&lower) {
            Self::transient(message)
        } else {
            Self::terminal(message)
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProviderError {}

pub fn is_transient(lower_message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "rate limit",
        "server disconnected",
        "timeout",
        "timed out",
        "connection reset",
        "dns",
        "remote protocol error",
    ];
    MARKERS.iter().any(|m| lower_message.contains(m))
}

pub fn is_fatal_transport(lower_message: &str) -> bool {
    const MARKERS: &[&str] = &["ssl", "certificate", "cert verify", "deadline_exceeded"];
    MARKERS.iter().any(|m| lower_message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit_as_transient() {
        let e = ProviderError::classify("429 rate limit exceeded");
        assert_eq!(e.kind, ProviderErrorKind::TransientNetwork);
    }

    #[test]
    fn classifies_ssl_error_as_fatal() {
        let e = ProviderError::classify("SSL certificate verify failed");
        assert_eq!(e.kind, ProviderErrorKind::FatalTransport);
    }

    #[test]
    fn classifies_deadline_exceeded_as_fatal() {
        let e = ProviderError::classify("grpc error: DEADLINE_EXCEEDED");
        assert_eq!(e.kind, ProviderErrorKind::FatalTransport);
    }

    #[test]
    fn classifies_plain_4xx_as_terminal() {
        let e = ProviderError::classify("401 unauthorized");
        assert_eq!(e.kind, ProviderErrorKind::ProviderTerminal);
    }

    #[test]
    fn classifies_connection_reset_as_transient() {
        let e = ProviderError::classify("connection reset by peer");
        assert_eq!(e.kind, ProviderErrorKind::TransientNetwork);
    }
}
