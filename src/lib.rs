//! Huginn - request/response recorder for model inference proxies
//!
//! This crate keeps, per inference runner, a short history of what a proxy
//! sent to the runner and what came back. Streamed (SSE) responses are
//! collapsed into the single completion a non-streaming call would have
//! returned, so operators can read them at a glance.
//!
//! # Example
//!
//! ```rust
//! use std::io;
//!
//! use huginn::{BackendMode, Recorder, RequestMetadata, ResponseSink, RunnerKey};
//!
//! struct ClientSink(Vec<u8>);
//!
//! impl ResponseSink for ClientSink {
//!     fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
//!         self.0.extend_from_slice(buf);
//!         Ok(buf.len())
//!     }
//!
//!     fn write_status(&mut self, _status: u16) {}
//! }
//!
//! let recorder = Recorder::new(|model| model.to_lowercase());
//! let runner = RunnerKey::new("llama.cpp", "ai/SmolLM2", BackendMode::Completion);
//!
//! let request = RequestMetadata::new("POST", "/v1/chat/completions");
//! let id = recorder.record_request(&runner, &request, br#"{"stream":false}"#);
//!
//! let mut writer = recorder.new_capturing_writer(ClientSink(Vec::new()));
//! writer.write_body(br#"{"object":"chat.completion"}"#).unwrap();
//! recorder.record_response(&id, &runner, &writer);
//!
//! let data = recorder.query("ai/smollm2").unwrap();
//! assert_eq!(data.records[0].response, r#"{"object":"chat.completion"}"#);
//! ```

pub mod capture;
pub mod error;
pub mod recorder;
pub mod runner;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use capture::{CapturingWriter, FlushSink, ResponseSink};
pub use error::{HuginnError, Result};
pub use recorder::{Recorder, RecorderBuilder};
pub use runner::{BackendMode, RunnerKey, RunnerMap};
pub use types::{
    BackendConfiguration, ModelData, RequestMetadata, RequestResponsePair, RunnerSummary,
    SpeculativeDecoding,
};
