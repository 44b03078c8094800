//! Recommendation engine facade
//!
//! `Recommender` wires the pipeline together: interaction store in, matrix
//! build, similarity computation, snapshot publication, recommendation
//! reads out. The read path (`get_recommendations`, `popular_items`,
//! `user_history`) touches only the published snapshot and never blocks on
//! I/O; `rebuild` is the scheduler's side and the only place storage is
//! read.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use cinematch_core::config::{ConfigLoader, EngineConfig};
use cinematch_core::error::CineMatchError;
use cinematch_core::types::{ItemId, Recommendation, UserId};
use cinematch_core::validation;

use crate::cache::ModelCache;
use crate::matrix::{BuildReport, MatrixBuilder};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::recommend::RecommendationGenerator;
use crate::scheduler::{RecomputeScheduler, SchedulerHandle};
use crate::similarity::SimilarityEngine;
use crate::snapshot::ModelSnapshot;
use crate::store::InteractionStore;

/// Collaborative-filtering recommendation engine
pub struct Recommender {
    store: Arc<dyn InteractionStore>,
    cache: ModelCache,
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl Recommender {
    /// Create an engine serving the empty bootstrap snapshot until the
    /// first rebuild completes.
    pub fn new(
        store: Arc<dyn InteractionStore>,
        config: EngineConfig,
    ) -> Result<Self, CineMatchError> {
        config.validate()?;
        Ok(Self {
            cache: ModelCache::bootstrap(config.mode),
            store,
            config,
            metrics: EngineMetrics::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The snapshot currently being served.
    pub fn current_snapshot(&self) -> Arc<ModelSnapshot> {
        self.cache.current()
    }

    /// Age of the served snapshot, an observability hook.
    pub fn snapshot_age(&self) -> chrono::Duration {
        self.cache.snapshot_age()
    }

    /// Build counters, an observability hook.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Interactions appended since the served snapshot was built. Drives
    /// the scheduler's staleness predicate.
    pub async fn pending_events(&self) -> anyhow::Result<u64> {
        let count = self.store.count().await.context("counting interaction log")?;
        Ok(count.saturating_sub(self.cache.current().source_event_count))
    }

    /// Top-N recommendations for a user against the current snapshot.
    ///
    /// The snapshot reference is taken once and used for the whole request;
    /// a publish landing mid-request has no effect on the result.
    pub fn get_recommendations(
        &self,
        user_id: &str,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, CineMatchError> {
        validation::validate_user_id(user_id)?;
        let snapshot = self.cache.current();
        RecommendationGenerator::recommend(&UserId::new(user_id), &snapshot, top_n)
    }

    /// Globally popular items, the caller-side cold-start fallback.
    pub fn popular_items(&self, limit: usize) -> Result<Vec<Recommendation>, CineMatchError> {
        let snapshot = self.cache.current();
        RecommendationGenerator::popular(&snapshot, limit)
    }

    /// The user's reduced interaction history in the current snapshot,
    /// strongest first.
    pub fn user_history(&self, user_id: &str) -> Result<Vec<(ItemId, f64)>, CineMatchError> {
        validation::validate_user_id(user_id)?;
        let snapshot = self.cache.current();

        let mut history: Vec<(ItemId, f64)> = snapshot
            .matrix
            .user_items(&UserId::new(user_id))
            .map(|items| items.iter().map(|(id, w)| (id.clone(), *w)).collect())
            .unwrap_or_default();
        history.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(history)
    }

    /// Run one full recompute cycle and publish the result.
    ///
    /// On failure the previous snapshot stays live and the error is
    /// reported as a `BuildFailure`; the scheduler retries on a later
    /// cycle.
    pub async fn rebuild(&self) -> Result<(), CineMatchError> {
        let started = Instant::now();
        match self.rebuild_inner().await {
            Ok(report) => {
                self.metrics
                    .record_success(started.elapsed(), report.total_skipped());
                Ok(())
            }
            Err(err) => {
                self.metrics.record_failure(started.elapsed());
                let chain = format!("{err:#}");
                tracing::error!(
                    error = %chain,
                    "Model rebuild failed; previous snapshot stays live"
                );
                Err(CineMatchError::build_failure(chain, Some(err.into())))
            }
        }
    }

    async fn rebuild_inner(&self) -> anyhow::Result<BuildReport> {
        let events = self
            .store
            .read_all()
            .await
            .context("reading interaction log")?;
        let source_event_count = events.len() as u64;

        let (matrix, report) = MatrixBuilder::from_config(&self.config).build(&events);
        let similarity = SimilarityEngine::from_config(&self.config).compute(&matrix);

        tracing::info!(
            users = matrix.user_count(),
            items = matrix.item_count(),
            pairs = matrix.pair_count(),
            accepted = report.accepted,
            skipped = report.total_skipped(),
            neighbor_entities = similarity.entity_count(),
            "Publishing rebuilt model snapshot"
        );

        self.cache
            .publish(ModelSnapshot::new(matrix, similarity, source_event_count, report));
        Ok(report)
    }

    /// Start the background recompute scheduler for this engine.
    pub fn spawn_scheduler(self: Arc<Self>) -> SchedulerHandle {
        RecomputeScheduler::new(self).spawn()
    }
}
