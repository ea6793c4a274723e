//! Content-hash keyed cache of parsed syntax trees (spec C1).
//!
//! Keys are `SHA-256(source_bytes)`; `source_name` is carried only for
//! diagnostics labelling and invalidation hints, never for identity.
//! Concurrent demand for the same key is serialised through a per-key
//! single-flight lock so the underlying parser runs at most once.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ParseError;

pub type SourceHash = [u8; 32];

/// A diagnostic attached to a [`ParseArtifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The shared, immutable result of a parse. Two artifacts with the same
/// `source_hash` are semantically interchangeable.
#[derive(Debug)]
pub struct ParseArtifact {
    pub tree: tree_sitter::Tree,
    pub diagnostics: Vec<Diagnostic>,
    pub source_hash: SourceHash,
    pub source_name: String,
}

type Producer = dyn Fn(&[u8], &str) -> Result<tree_sitter::Tree, ParseError> + Send + Sync;

/// Exactly-once construction under concurrent demand, LRU bounded.
pub struct ParseCache {
    producer: Arc<Producer>,
    capacity: usize,
    entries: DashMap<SourceHash, Arc<ParseArtifact>>,
    order: Mutex<Vec<SourceHash>>,
    inflight: DashMap<SourceHash, Arc<Mutex<()>>>,
}

impl ParseCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(
        capacity: usize,
        producer: impl Fn(&[u8], &str) -> Result<tree_sitter::Tree, ParseError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            producer: Arc::new(producer),
            capacity,
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
            inflight: DashMap::new(),
        }
    }

    pub fn hash(source_bytes: &[u8]) -> SourceHash {
        let mut hasher = Sha256::new();
        hasher.update(source_bytes);
        hasher.finalize().into()
    }

    /// `parse(source_bytes, source_name) -> Result<ParseArtifact, ParseError>`.
    ///
    /// Successful results are cached; a `ParseError` is never cached, so a
    /// subsequent call re-attempts. Panics inside the producer are caught
    /// and surfaced as `ParseError::Internal`.
    pub fn parse(&self, source_bytes: &[u8], source_name: &str) -> Result<Arc<ParseArtifact>, ParseError> {
        let key = Self::hash(source_bytes);

        if let Some(hit) = self.entries.get(&key) {
            self.touch(key);
            return Ok(Arc::clone(hit.value()));
        }

        let lock = self
            .inflight
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap();

        if let Some(hit) = self.entries.get(&key) {
            self.touch(key);
            self.inflight.remove(&key);
            return Ok(Arc::clone(hit.value()));
        }

        let producer = Arc::clone(&self.producer);
        let source_name_owned = source_name.to_string();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            producer(source_bytes, &source_name_owned)
        }))
        .unwrap_or_else(|_| {
            Err(ParseError::Internal {
                source_name: source_name_owned.clone(),
            })
        });

        self.inflight.remove(&key);

        let tree = result?;
        let artifact = Arc::new(ParseArtifact {
            tree,
            diagnostics: Vec::new(),
            source_hash: key,
            source_name: source_name.to_string(),
        });
        self.insert(key, Arc::clone(&artifact));
        Ok(artifact)
    }

    fn touch(&self, key: SourceHash) {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| *k == key) {
            let k = order.remove(pos);
            order.push(k);
        }
    }

    fn insert(&self, key: SourceHash, artifact: Arc<ParseArtifact>) {
        self.entries.insert(key, artifact);
        let mut order = self.order.lock().unwrap();
        order.retain(|k| *k != key);
        order.push(key);
        while order.len() > self.capacity {
            let oldest = order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    /// Clears any entry whose last-observed `source_name` equals `name`.
    /// A hint, not a correctness primitive — identity stays by hash.
    pub fn invalidate(&self, name: &str) {
        let stale: Vec<SourceHash> = self
            .entries
            .iter()
            .filter(|e| e.value().source_name == name)
            .map(|e| *e.key())
            .collect();
        for key in &stale {
            self.entries.remove(key);
        }
        if !stale.is_empty() {
            let mut order = self.order.lock().unwrap();
            order.retain(|k| !stale.contains(k));
            debug!(count = stale.len(), name, "invalidated parse cache entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A plain in-process counter used by tests to assert single-flight (§8 S4).
#[derive(Default)]
pub struct InvocationCounter(Mutex<HashMap<SourceHash, usize>>);

impl InvocationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: SourceHash) {
        *self.0.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    pub fn count(&self, key: SourceHash) -> usize {
        *self.0.lock().unwrap().get(&key).unwrap_or(&0)
    }
}
