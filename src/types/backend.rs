//! Backend configuration as seen by the recorder.
//!
//! The recorder never interprets these values; it stores the latest
//! configuration per runner so the query endpoint can show what the runner
//! was started with next to its traffic.

use serde::{Deserialize, Serialize};

/// Configuration a backend runner was started with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfiguration {
    /// Context window in tokens (if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_size: Option<u64>,
    /// Extra command-line flags passed to the runner.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtime_flags: Vec<String>,
    /// Speculative decoding settings (if enabled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speculative: Option<SpeculativeDecoding>,
}

impl BackendConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context window size.
    pub fn with_context_size(mut self, tokens: u64) -> Self {
        self.context_size = Some(tokens);
        self
    }

    /// Append a runtime flag.
    pub fn with_runtime_flag(mut self, flag: impl Into<String>) -> Self {
        self.runtime_flags.push(flag.into());
        self
    }

    /// Enable speculative decoding.
    pub fn with_speculative(mut self, speculative: SpeculativeDecoding) -> Self {
        self.speculative = Some(speculative);
        self
    }
}

/// Draft-model settings for speculative decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeculativeDecoding {
    pub draft_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_acceptance_rate: Option<f64>,
}
