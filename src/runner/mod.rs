//! Runner identity and the normalized runner map.
//!
//! A runner is addressed by `(backend, model, mode)`. Model names arrive in
//! whatever spelling the client used, so [`RunnerMap`] folds them through a
//! caller-supplied normalizer before every lookup while remembering the
//! last raw spelling for display.
//!
//! [`RunnerMap`] is not synchronized; callers wrap it in a lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Operating mode of an inference runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Completion,
    Embedding,
    Reranking,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Completion => "completion",
            BackendMode::Embedding => "embedding",
            BackendMode::Reranking => "reranking",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an inference runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunnerKey {
    /// Backend serving the runner (e.g. `"llama.cpp"`).
    pub backend: String,
    /// Model name as supplied by the caller.
    pub model: String,
    /// Operating mode of the runner.
    pub mode: BackendMode,
}

impl RunnerKey {
    pub fn new(backend: impl Into<String>, model: impl Into<String>, mode: BackendMode) -> Self {
        Self {
            backend: backend.into(),
            model: model.into(),
            mode,
        }
    }
}

/// Model-name normalizer shared by the map and its owner.
pub type NormalizeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Map keyed on [`RunnerKey`] with model-name normalization.
///
/// Every operation normalizes the key's model before touching storage, so
/// `"Org/Model"` and `"org/model"` share a bucket under a case-folding
/// normalizer. [`RunnerMap::initial_model`] returns the raw spelling that
/// last wrote the bucket.
pub struct RunnerMap<T> {
    entries: HashMap<RunnerKey, T>,
    initial_model: HashMap<RunnerKey, String>,
    normalize: NormalizeFn,
}

impl<T> RunnerMap<T> {
    /// Create an empty map using `normalize` on model names.
    pub fn new(normalize: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::with_normalizer(Arc::new(normalize))
    }

    /// Create an empty map sharing an existing normalizer.
    pub fn with_normalizer(normalize: NormalizeFn) -> Self {
        Self {
            entries: HashMap::new(),
            initial_model: HashMap::new(),
            normalize,
        }
    }

    fn normalize_key(&self, key: &RunnerKey) -> RunnerKey {
        RunnerKey {
            backend: key.backend.clone(),
            model: (self.normalize)(&key.model),
            mode: key.mode,
        }
    }

    /// Insert or replace the value for `key`, remembering `key.model` as the
    /// display spelling of the normalized bucket.
    pub fn set(&mut self, key: &RunnerKey, value: T) {
        let norm = self.normalize_key(key);
        self.initial_model.insert(norm.clone(), key.model.clone());
        self.entries.insert(norm, value);
    }

    pub fn get(&self, key: &RunnerKey) -> Option<&T> {
        self.entries.get(&self.normalize_key(key))
    }

    pub fn get_mut(&mut self, key: &RunnerKey) -> Option<&mut T> {
        let norm = self.normalize_key(key);
        self.entries.get_mut(&norm)
    }

    /// Return the value for `key`, creating it with `init` (via
    /// [`RunnerMap::set`]) when absent.
    ///
    /// An existing bucket keeps its recorded display spelling.
    pub fn get_or_insert_with(&mut self, key: &RunnerKey, init: impl FnOnce() -> T) -> &mut T {
        let norm = self.normalize_key(key);
        if !self.entries.contains_key(&norm) {
            self.initial_model.insert(norm.clone(), key.model.clone());
        }
        self.entries.entry(norm).or_insert_with(init)
    }

    /// The raw model string that last created or replaced the bucket `key`
    /// normalizes to.
    pub fn initial_model(&self, key: &RunnerKey) -> Option<&str> {
        self.initial_model
            .get(&self.normalize_key(key))
            .map(String::as_str)
    }

    /// Remove the bucket for `key`, returning its value.
    pub fn delete(&mut self, key: &RunnerKey) -> Option<T> {
        let norm = self.normalize_key(key);
        self.initial_model.remove(&norm);
        self.entries.remove(&norm)
    }

    /// Iterate over entries, keyed by normalized key.
    pub fn iter(&self) -> impl Iterator<Item = (&RunnerKey, &T)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> RunnerMap<T> {
    /// Independent copy of every entry, keyed by normalized key.
    ///
    /// The returned map shares no storage with `self`.
    pub fn items(&self) -> HashMap<RunnerKey, T> {
        self.entries.clone()
    }
}

impl<T> fmt::Debug for RunnerMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerMap")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lowercase_map<T>() -> RunnerMap<T> {
        RunnerMap::new(|m: &str| m.to_lowercase())
    }

    fn key(model: &str) -> RunnerKey {
        RunnerKey::new("llama.cpp", model, BackendMode::Completion)
    }

    #[test]
    fn spellings_share_a_bucket() {
        let mut map = lowercase_map();
        map.set(&key("ai/SmolLM2"), 1);

        assert_eq!(map.get(&key("AI/smollm2")), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn initial_model_tracks_last_set() {
        let mut map = lowercase_map();
        map.set(&key("ai/SmolLM2"), 1);
        assert_eq!(map.initial_model(&key("ai/smollm2")), Some("ai/SmolLM2"));

        map.set(&key("AI/SMOLLM2"), 2);
        assert_eq!(map.initial_model(&key("ai/smollm2")), Some("AI/SMOLLM2"));
        assert_eq!(map.get(&key("ai/smollm2")), Some(&2));
    }

    #[test]
    fn get_or_insert_keeps_existing_spelling() {
        let mut map = lowercase_map();
        *map.get_or_insert_with(&key("Model-A"), || 0) += 1;
        *map.get_or_insert_with(&key("model-a"), || 0) += 1;

        assert_eq!(map.get(&key("MODEL-A")), Some(&2));
        assert_eq!(map.initial_model(&key("model-a")), Some("Model-A"));
    }

    #[test]
    fn delete_removes_value_and_spelling() {
        let mut map = lowercase_map();
        map.set(&key("Model"), "x");

        assert_eq!(map.delete(&key("MODEL")), Some("x"));
        assert!(map.get(&key("model")).is_none());
        assert!(map.initial_model(&key("model")).is_none());
        assert!(map.is_empty());
        assert_eq!(map.delete(&key("model")), None);
    }

    #[test]
    fn backend_and_mode_are_not_normalized() {
        let mut map = lowercase_map();
        map.set(&key("m"), 1);

        assert!(
            map.get(&RunnerKey::new("LLAMA.CPP", "m", BackendMode::Completion))
                .is_none()
        );
        assert!(
            map.get(&RunnerKey::new("llama.cpp", "m", BackendMode::Embedding))
                .is_none()
        );
    }

    #[test]
    fn items_is_an_independent_copy() {
        let mut map = lowercase_map();
        map.set(&key("Model"), vec![1]);

        let mut snapshot = map.items();
        snapshot.get_mut(&key("model")).unwrap().push(2);
        map.set(&key("other"), vec![9]);

        assert_eq!(map.get(&key("model")), Some(&vec![1]));
        assert_eq!(snapshot.len(), 1);
        // snapshot keys are normalized
        assert!(snapshot.contains_key(&key("model")));
    }

    #[test]
    fn mode_serializes_lowercase() {
        let json = serde_json::to_string(&BackendMode::Embedding).unwrap();
        assert_eq!(json, "\"embedding\"");
    }
}
