//! Published model snapshot
//!
//! One recompute cycle produces one `ModelSnapshot`: the matrix, the
//! similarity index derived from it, and the build metadata. A snapshot is
//! immutable and self-consistent; readers hold an `Arc` to it for a whole
//! request and are unaffected by later publishes.

use chrono::{DateTime, Utc};
use cinematch_core::types::SimilarityMode;

use crate::matrix::{BuildReport, InteractionMatrix};
use crate::similarity::SimilarityIndex;

/// Immutable bundle of matrix + similarity index, the unit of atomic
/// publication
#[derive(Debug)]
pub struct ModelSnapshot {
    pub matrix: InteractionMatrix,
    pub similarity: SimilarityIndex,
    /// When this snapshot finished building
    pub built_at: DateTime<Utc>,
    /// Events present in the store when the build started, including ones
    /// the builder skipped. Baseline for the staleness predicate.
    pub source_event_count: u64,
    /// Skip counters from the matrix build
    pub report: BuildReport,
}

impl ModelSnapshot {
    pub fn new(
        matrix: InteractionMatrix,
        similarity: SimilarityIndex,
        source_event_count: u64,
        report: BuildReport,
    ) -> Self {
        Self {
            matrix,
            similarity,
            built_at: Utc::now(),
            source_event_count,
            report,
        }
    }

    /// Bootstrap snapshot served before the first build completes.
    pub fn empty(mode: SimilarityMode) -> Self {
        Self::new(
            InteractionMatrix::empty(),
            SimilarityIndex::empty(mode),
            0,
            BuildReport::default(),
        )
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.built_at
    }
}
