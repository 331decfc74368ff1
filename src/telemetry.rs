//! Telemetry metric name constants.
//!
//! Centralised metric names for recorder operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `backend`: backend name of the runner key (e.g. "llama.cpp")
//! - `mode`: runner operating mode (e.g. "completion", "embedding")
//! - `outcome`: what happened to a response or stream body

/// Total requests captured.
///
/// Labels: `backend`, `mode`.
pub const REQUESTS_RECORDED_TOTAL: &str = "huginn_requests_recorded_total";

/// Total responses handed to the recorder.
///
/// Labels: `backend`, `mode`, `outcome` ("matched" | "dropped").
pub const RESPONSES_RECORDED_TOTAL: &str = "huginn_responses_recorded_total";

/// Total records dropped from the front of a full history window.
///
/// Labels: `backend`, `mode`.
pub const RECORDS_EVICTED_TOTAL: &str = "huginn_records_evicted_total";

/// Total streamed bodies run through reconstruction.
///
/// Labels: `outcome` ("reconstructed" | "passthrough").
pub const STREAM_RECONSTRUCTIONS_TOTAL: &str = "huginn_stream_reconstructions_total";
