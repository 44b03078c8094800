//! # CineMatch Engine
//!
//! Collaborative-filtering recommendation engine: ingests user-item
//! interaction signals and serves personalized top-N recommendations from
//! an in-memory model rebuilt periodically from a durable interaction log.
//!
//! The moving parts, in pipeline order:
//!
//! - [`store::InteractionStore`]: append-only interaction log abstraction
//! - [`matrix::MatrixBuilder`]: log to sparse user-item matrix
//! - [`similarity::SimilarityEngine`]: matrix to top-K neighbor index
//! - [`cache::ModelCache`]: atomic publication of immutable snapshots
//! - [`scheduler::RecomputeScheduler`]: background rebuild loop
//! - [`recommend::RecommendationGenerator`]: snapshot to ranked items
//! - [`engine::Recommender`]: the facade tying the above together
//!
//! Request handlers only ever touch an immutable [`snapshot::ModelSnapshot`]
//! obtained once per request; recomputation never blocks reads.

pub mod cache;
pub mod engine;
pub mod matrix;
pub mod metrics;
pub mod recommend;
pub mod scheduler;
pub mod similarity;
pub mod snapshot;
pub mod store;

// Re-export key types
pub use cache::ModelCache;
pub use engine::Recommender;
pub use matrix::{BuildReport, InteractionMatrix, MatrixBuilder};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use recommend::RecommendationGenerator;
pub use scheduler::{RecomputeScheduler, SchedulerHandle};
pub use similarity::{Neighbor, NeighborCountSummary, NeighborIndex, SimilarityEngine, SimilarityIndex};
pub use snapshot::ModelSnapshot;
pub use store::{InteractionStore, JsonlInteractionStore, MemoryInteractionStore};

// The shared vocabulary lives in cinematch-core; re-exported here so the
// bot layer can depend on a single crate.
pub use cinematch_core::config::{ConfigLoader, EngineConfig};
pub use cinematch_core::error::CineMatchError;
pub use cinematch_core::types::{
    Interaction, ItemId, Recommendation, ReductionPolicy, SimilarityMetric, SimilarityMode, UserId,
};
