//! Live model cache
//!
//! Holds the single mutable shared reference in the system: the current
//! `ModelSnapshot`. `current()` hands out a clone of the `Arc`, so a reader
//! keeps its snapshot for the whole request even if a publish lands
//! mid-flight. `publish()` is an indivisible pointer swap; the lock is held
//! only for the clone or the swap, never across a build or a request.

use std::sync::{Arc, PoisonError, RwLock};

use cinematch_core::types::SimilarityMode;

use crate::snapshot::ModelSnapshot;

/// Atomically swappable holder of the current snapshot
#[derive(Debug)]
pub struct ModelCache {
    current: RwLock<Arc<ModelSnapshot>>,
}

impl ModelCache {
    pub fn new(initial: ModelSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Cache primed with the empty bootstrap snapshot.
    pub fn bootstrap(mode: SimilarityMode) -> Self {
        Self::new(ModelSnapshot::empty(mode))
    }

    /// The latest fully-built snapshot. Non-blocking in practice: the read
    /// lock guards a single `Arc` clone.
    pub fn current(&self) -> Arc<ModelSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replace the live snapshot. In-flight readers keep the
    /// reference they already took; the superseded snapshot drops once the
    /// last of them finishes.
    pub fn publish(&self, snapshot: ModelSnapshot) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(snapshot);
    }

    /// Age of the live snapshot, an observability hook.
    pub fn snapshot_age(&self) -> chrono::Duration {
        self.current().age()
    }
}
