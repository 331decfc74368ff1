//! The request/response recorder.
//!
//! [`Recorder`] keeps, per runner, the backend configuration and a bounded
//! window of recent exchanges. A caller records the request (getting an id
//! back), wraps the client sink in a [`CapturingWriter`], lets the backend
//! write through it, then hands the writer back with the id so the recorder
//! can fill in the response.
//!
//! # Locking
//!
//! A single `RwLock` guards every runner's [`ModelData`]. Mutations take the
//! write side, snapshots the read side. Stream reconstruction happens before
//! the lock is taken, so only the append/scan/replace bookkeeping is
//! serialized.
//!
//! Recording never fails the caller: unknown runners and evicted ids are
//! logged and the call becomes a no-op. Every update leaves the map
//! consistent, so a lock poisoned by a panicking normalizer is recovered
//! and recording carries on.

mod builder;

pub use builder::{DEFAULT_BACKEND, DEFAULT_HISTORY_CAPACITY, RecorderBuilder};

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::capture::{self, CapturingWriter, ResponseSink};
use crate::runner::{BackendMode, NormalizeFn, RunnerKey, RunnerMap};
use crate::telemetry;
use crate::types::{
    BackendConfiguration, ModelData, RequestMetadata, RequestResponsePair, RunnerSummary,
};

/// Bounded per-runner history of inference traffic.
///
/// Construct one at startup and share it (e.g. behind an `Arc`) with the
/// proxy layer and the query endpoint.
pub struct Recorder {
    records: RwLock<RunnerMap<ModelData>>,
    history_capacity: usize,
    backend: String,
}

impl Recorder {
    /// Create a new builder for configuring the recorder.
    pub fn builder() -> RecorderBuilder {
        RecorderBuilder::new()
    }

    /// Recorder with default capacity and backend, using `normalize` on
    /// model names.
    pub fn new(normalize: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        let normalize: NormalizeFn = Arc::new(normalize);
        Self::from_parts(
            normalize,
            DEFAULT_HISTORY_CAPACITY,
            DEFAULT_BACKEND.to_string(),
        )
    }

    pub(crate) fn from_parts(
        normalize: NormalizeFn,
        history_capacity: usize,
        backend: String,
    ) -> Self {
        Self {
            records: RwLock::new(RunnerMap::with_normalizer(normalize)),
            history_capacity,
            backend,
        }
    }

    /// Records kept per runner.
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Backend addressed by [`Recorder::query`] and [`Recorder::remove`].
    pub fn backend(&self) -> &str {
        &self.backend
    }

    fn read(&self) -> RwLockReadGuard<'_, RunnerMap<ModelData>> {
        self.records.read().unwrap_or_else(|poisoned| {
            warn!("recovering recorder lock poisoned by a panicking caller");
            self.records.clear_poison();
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunnerMap<ModelData>> {
        self.records.write().unwrap_or_else(|poisoned| {
            warn!("recovering recorder lock poisoned by a panicking caller");
            self.records.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Key addressed by the model-name convenience operations.
    fn completion_key(&self, model: &str) -> RunnerKey {
        RunnerKey::new(self.backend.clone(), model, BackendMode::Completion)
    }

    /// Store the configuration `runner` was started with.
    ///
    /// A missing configuration is logged and ignored.
    pub fn set_config(&self, runner: &RunnerKey, config: Option<BackendConfiguration>) {
        let Some(config) = config else {
            warn!(model = %runner.model, "set_config called without a configuration");
            return;
        };

        self.write()
            .get_or_insert_with(runner, || self.empty_model_data())
            .config = config;
    }

    /// Capture an inbound request and return the id to pass to
    /// [`Recorder::record_response`].
    ///
    /// Ids combine the model name with a nanosecond timestamp. They are
    /// unique in practice but not guaranteed to be under very high request
    /// rates or coarse clocks.
    pub fn record_request(
        &self,
        runner: &RunnerKey,
        request: &RequestMetadata,
        body: &[u8],
    ) -> String {
        let now = Utc::now();
        let id = format!(
            "{}_{}",
            runner.model,
            now.timestamp_nanos_opt().unwrap_or_default()
        );

        let record = RequestResponsePair {
            id: id.clone(),
            model: runner.model.clone(),
            method: request.method.clone(),
            url: request.path.clone(),
            request: String::from_utf8_lossy(body).into_owned(),
            response: String::new(),
            timestamp: now,
            status_code: 0,
            user_agent: request.user_agent.clone(),
        };

        let mut records = self.write();
        let data = records.get_or_insert_with(runner, || self.empty_model_data());
        data.records.push_back(record);

        let mut evicted = 0u64;
        while data.records.len() > self.history_capacity {
            data.records.pop_front();
            evicted += 1;
        }
        drop(records);

        let mode = runner.mode.as_str();
        metrics::counter!(
            telemetry::REQUESTS_RECORDED_TOTAL,
            "backend" => runner.backend.clone(),
            "mode" => mode
        )
        .increment(1);
        if evicted > 0 {
            metrics::counter!(
                telemetry::RECORDS_EVICTED_TOTAL,
                "backend" => runner.backend.clone(),
                "mode" => mode
            )
            .increment(evicted);
        }

        id
    }

    /// Wrap `sink` so the response written through it can be recorded.
    pub fn new_capturing_writer<S: ResponseSink>(&self, sink: S) -> CapturingWriter<S> {
        CapturingWriter::new(sink)
    }

    /// Fill in the response for the request recorded under `id`.
    ///
    /// Streamed bodies are reconstructed into a single completion first.
    /// If `runner` is unknown or `id` is no longer in its window, the
    /// response is logged and dropped.
    pub fn record_response<S: ResponseSink>(
        &self,
        id: &str,
        runner: &RunnerKey,
        writer: &CapturingWriter<S>,
    ) {
        let body = writer.body_text();
        let status_code = writer.status();

        let response = if capture::is_event_stream(&body) {
            capture::reconstruct_stream(&body)
        } else {
            body
        };

        let matched = self.fill_response(id, runner, response, status_code);

        metrics::counter!(
            telemetry::RESPONSES_RECORDED_TOTAL,
            "backend" => runner.backend.clone(),
            "mode" => runner.mode.as_str(),
            "outcome" => if matched { "matched" } else { "dropped" }
        )
        .increment(1);
    }

    fn fill_response(
        &self,
        id: &str,
        runner: &RunnerKey,
        response: String,
        status_code: u16,
    ) -> bool {
        let mut records = self.write();
        let Some(data) = records.get_mut(runner) else {
            error!(
                model = %runner.model,
                status_code,
                response_len = response.len(),
                "model not found in records"
            );
            return false;
        };

        match data.records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.response = response;
                record.status_code = status_code;
                true
            }
            None => {
                error!(
                    id,
                    model = %runner.model,
                    status_code,
                    response_len = response.len(),
                    "matching request not found"
                );
                false
            }
        }
    }

    /// Snapshot of the completion runner for `model` on the configured
    /// backend.
    ///
    /// The returned value is an independent copy.
    pub fn query(&self, model: &str) -> Option<ModelData> {
        self.read().get(&self.completion_key(model)).cloned()
    }

    /// Drop everything recorded for the completion runner of `model`.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&self, model: &str) -> bool {
        if self.write().delete(&self.completion_key(model)).is_some() {
            info!(model, "removed records for model");
            true
        } else {
            warn!(model, "no records found for model");
            false
        }
    }

    /// Overview of every tracked runner, sorted by backend, model, mode.
    pub fn runners(&self) -> Vec<RunnerSummary> {
        let records = self.read();
        let mut summaries: Vec<RunnerSummary> = records
            .iter()
            .map(|(key, data)| RunnerSummary {
                backend: key.backend.clone(),
                model: records
                    .initial_model(key)
                    .unwrap_or(&key.model)
                    .to_string(),
                mode: key.mode,
                count: data.records.len(),
                pending: data.records.iter().filter(|r| r.is_pending()).count(),
            })
            .collect();
        drop(records);

        summaries.sort_by(|a, b| {
            (a.backend.as_str(), a.model.as_str(), a.mode)
                .cmp(&(b.backend.as_str(), b.model.as_str(), b.mode))
        });
        summaries
    }

    fn empty_model_data(&self) -> ModelData {
        ModelData {
            config: BackendConfiguration::default(),
            records: VecDeque::with_capacity(self.history_capacity + 1),
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("history_capacity", &self.history_capacity)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
