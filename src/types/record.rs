//! Recorded traffic types.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BackendConfiguration;
use crate::runner::BackendMode;

/// The parts of an inbound HTTP request the recorder keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// HTTP method (e.g. `"POST"`).
    pub method: String,
    /// URL path, without query string.
    pub path: String,
    /// `User-Agent` header, empty when absent.
    pub user_agent: String,
}

impl RequestMetadata {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            user_agent: String::new(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(feature = "server")]
impl From<&axum::http::request::Parts> for RequestMetadata {
    fn from(parts: &axum::http::request::Parts) -> Self {
        Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            user_agent: user_agent(&parts.headers),
        }
    }
}

#[cfg(feature = "server")]
impl<B> From<&axum::http::Request<B>> for RequestMetadata {
    fn from(req: &axum::http::Request<B>) -> Self {
        Self {
            method: req.method().as_str().to_string(),
            path: req.uri().path().to_string(),
            user_agent: user_agent(req.headers()),
        }
    }
}

#[cfg(feature = "server")]
fn user_agent(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// One captured exchange with an inference runner.
///
/// Created when the request is recorded; `response` and `status_code` stay
/// empty until the matching response is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResponsePair {
    pub id: String,
    pub model: String,
    pub method: String,
    pub url: String,
    pub request: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
}

impl RequestResponsePair {
    /// Whether a response has been recorded for this request.
    pub fn is_pending(&self) -> bool {
        self.status_code == 0
    }
}

/// Per-runner recorder state: latest configuration plus recent history.
///
/// Always read and written as one unit under the recorder's lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    pub config: BackendConfiguration,
    pub records: VecDeque<RequestResponsePair>,
}

/// Overview of one tracked runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSummary {
    pub backend: String,
    /// Model name as the caller last spelled it.
    pub model: String,
    pub mode: BackendMode,
    /// Records currently held.
    pub count: usize,
    /// Records still waiting for a response.
    pub pending: usize,
}
