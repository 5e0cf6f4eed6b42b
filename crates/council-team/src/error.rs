// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The top-level governance error taxonomy, as a tagged enum matched by the
//! orchestrator and fallback chain instead of parsed from exception text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Missing or invalid configuration. The only kind that aborts a run
    /// before any role executes.
    #[error("config error: {0}")]
    Config(String),

    /// A fatal transport failure (SSL/cert/DEADLINE_EXCEEDED) propagated
    /// out of the provider layer with no fallback remaining.
    #[error("fatal transport error: {0}")]
    FatalTransport(String),

    /// Every configured provider was exhausted.
    #[error("provider chain exhausted: {0}")]
    ProviderExhausted(String),

    /// The audit report could not be written to disk.
    #[error("audit write error: {0}")]
    AuditWrite(String),
}

impl From<council_model::ProviderError> for GovernanceError {
    fn from(e: council_model::ProviderError) -> Self {
        use council_model::ProviderErrorKind::*;
        match e.kind {
            FatalTransport => GovernanceError::FatalTransport(e.message),
            TransientNetwork | ProviderTerminal => GovernanceError::ProviderExhausted(e.message),
        }
    }
}
