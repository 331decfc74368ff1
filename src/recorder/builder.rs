//! Builder for configuring recorder instances

use std::sync::Arc;

use super::Recorder;
use crate::runner::NormalizeFn;
use crate::{HuginnError, Result};

/// Records kept per runner before the oldest is dropped.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Backend addressed by model-name queries.
pub const DEFAULT_BACKEND: &str = "llama.cpp";

/// Builder for configuring recorder instances.
pub struct RecorderBuilder {
    normalize: Option<NormalizeFn>,
    history_capacity: usize,
    backend: String,
}

impl RecorderBuilder {
    pub fn new() -> Self {
        Self {
            normalize: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            backend: DEFAULT_BACKEND.to_string(),
        }
    }

    /// Set the model-name normalizer (default: identity).
    pub fn normalize(mut self, normalize: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        let normalize: NormalizeFn = Arc::new(normalize);
        self.normalize = Some(normalize);
        self
    }

    /// Set how many records each runner keeps (default: 10).
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the backend that [`Recorder::query`] and [`Recorder::remove`]
    /// address (default: `"llama.cpp"`).
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Build the recorder.
    pub fn build(self) -> Result<Recorder> {
        if self.history_capacity == 0 {
            return Err(HuginnError::Configuration(
                "history capacity must be at least 1".to_string(),
            ));
        }
        if self.backend.is_empty() {
            return Err(HuginnError::Configuration(
                "backend name must not be empty".to_string(),
            ));
        }

        let normalize: NormalizeFn = match self.normalize {
            Some(normalize) => normalize,
            None => Arc::new(|model: &str| model.to_string()),
        };

        Ok(Recorder::from_parts(
            normalize,
            self.history_capacity,
            self.backend,
        ))
    }
}

impl Default for RecorderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
