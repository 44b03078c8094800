//! Background recomputation
//!
//! One tokio task owns the whole rebuild pipeline, which gives single-flight
//! for free: builds can never overlap, and rebuild requests arriving while a
//! build is running coalesce into at most one follow-up pass (`Notify`
//! stores a single permit).
//!
//! A rebuild happens when the fixed interval has elapsed, when the
//! staleness predicate fires (enough new interactions since the published
//! snapshot), or on explicit request. Failures only cost freshness: the
//! previous snapshot keeps serving and the next attempt is delayed by the
//! backoff policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use cinematch_core::retry::RetryPolicy;

use crate::engine::Recommender;

/// Drives periodic model rebuilds for a `Recommender`
pub struct RecomputeScheduler {
    engine: Arc<Recommender>,
    backoff: RetryPolicy,
}

impl RecomputeScheduler {
    pub fn new(engine: Arc<Recommender>) -> Self {
        Self {
            engine,
            backoff: RetryPolicy::gentle(),
        }
    }

    /// Override the failure backoff policy.
    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Start the background task and return its control handle.
    pub fn spawn(self) -> SchedulerHandle {
        let rebuild = Arc::new(Notify::new());
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(Arc::clone(&rebuild), Arc::clone(&shutdown)));
        SchedulerHandle {
            rebuild,
            shutdown,
            task,
        }
    }

    async fn run(self, rebuild: Arc<Notify>, shutdown: Arc<Notify>) {
        let interval = self.engine.config().recompute_interval;
        // Staleness is polled more often than the full rebuild interval.
        let poll_period = (interval / 4).max(Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        let mut interval_ticker = tokio::time::interval_at(start + interval, interval);
        interval_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut staleness_ticker = tokio::time::interval_at(start + poll_period, poll_period);
        staleness_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = interval.as_secs(),
            staleness_poll_secs = poll_period.as_secs(),
            "Recompute scheduler started"
        );

        let mut consecutive_failures: u32 = 0;

        // Replace the bootstrap snapshot as soon as possible.
        self.build_once(&mut consecutive_failures).await;

        loop {
            tokio::select! {
                _ = interval_ticker.tick() => {
                    self.build_once(&mut consecutive_failures).await;
                }
                _ = staleness_ticker.tick() => {
                    if self.stale().await {
                        self.build_once(&mut consecutive_failures).await;
                    }
                }
                _ = rebuild.notified() => {
                    self.build_once(&mut consecutive_failures).await;
                }
                _ = shutdown.notified() => {
                    tracing::info!("Recompute scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Whether enough interactions have accumulated since the live snapshot
    /// to warrant an early rebuild.
    async fn stale(&self) -> bool {
        match self.engine.pending_events().await {
            Ok(pending) => pending >= self.engine.config().staleness_threshold,
            Err(err) => {
                // Let the build surface the store problem and back off.
                tracing::warn!(error = %err, "Staleness check failed; forcing a rebuild attempt");
                true
            }
        }
    }

    async fn build_once(&self, consecutive_failures: &mut u32) {
        match self.engine.rebuild().await {
            Ok(()) => {
                *consecutive_failures = 0;
            }
            Err(_) => {
                // Already logged by the engine; only freshness is affected.
                let delay = self.backoff.delay_for_attempt(*consecutive_failures);
                *consecutive_failures = consecutive_failures.saturating_add(1);
                tracing::warn!(
                    consecutive_failures = *consecutive_failures,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off after failed rebuild"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Control handle for a running scheduler task
pub struct SchedulerHandle {
    rebuild: Arc<Notify>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask for a rebuild outside the regular cadence. Requests made while a
    /// build is in flight coalesce into one follow-up build.
    pub fn request_rebuild(&self) {
        self.rebuild.notify_one();
    }

    /// Stop the scheduler and wait for the task to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InteractionStore, MemoryInteractionStore};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use cinematch_core::config::EngineConfig;
    use cinematch_core::types::Interaction;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose reads can be failed on demand.
    struct FlakyStore {
        inner: MemoryInteractionStore,
        fail_reads: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryInteractionStore::new(),
                fail_reads: AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.fail_reads.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl InteractionStore for FlakyStore {
        async fn read_all(&self) -> Result<Vec<Interaction>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                bail!("store unreachable");
            }
            self.inner.read_all().await
        }

        async fn append(&self, interaction: Interaction) -> Result<()> {
            self.inner.append(interaction).await
        }

        async fn count(&self) -> Result<u64> {
            if self.fail_reads.load(Ordering::SeqCst) {
                bail!("store unreachable");
            }
            self.inner.count().await
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            recompute_interval: Duration::from_secs(3600),
            staleness_threshold: 3,
            min_co_rated: 1,
            ..EngineConfig::default()
        }
    }

    fn event(user: &str, item: &str, weight: f64) -> Interaction {
        Interaction::new(user, item, weight, Utc::now())
    }

    fn fast_backoff() -> RetryPolicy {
        RetryPolicy::new(10, 100, false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_build_replaces_bootstrap() {
        let store = Arc::new(MemoryInteractionStore::new());
        store.append(event("u1", "i1", 5.0)).await.unwrap();

        let engine = Arc::new(Recommender::new(store, test_config()).unwrap());
        let handle = RecomputeScheduler::new(Arc::clone(&engine))
            .with_backoff(fast_backoff())
            .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.current_snapshot().source_event_count, 1);
        assert_eq!(engine.metrics().builds_succeeded, 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_triggers_early_rebuild() {
        let store = Arc::new(MemoryInteractionStore::new());
        let engine = Arc::new(Recommender::new(Arc::clone(&store) as _, test_config()).unwrap());
        let handle = RecomputeScheduler::new(Arc::clone(&engine))
            .with_backoff(fast_backoff())
            .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.metrics().builds_succeeded, 1);

        // Threshold is 3: two new events are not stale yet.
        store.append(event("u1", "i1", 5.0)).await.unwrap();
        store.append(event("u2", "i1", 4.0)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1000)).await;
        assert_eq!(engine.current_snapshot().source_event_count, 0);

        store.append(event("u2", "i2", 3.0)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1000)).await;
        assert_eq!(engine.current_snapshot().source_event_count, 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_elapse_triggers_rebuild() {
        let store = Arc::new(MemoryInteractionStore::new());
        let engine = Arc::new(Recommender::new(Arc::clone(&store) as _, test_config()).unwrap());
        let handle = RecomputeScheduler::new(Arc::clone(&engine))
            .with_backoff(fast_backoff())
            .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.current_snapshot().source_event_count, 0);

        // One new event stays under the staleness threshold; only the
        // elapsed interval forces the rebuild.
        store.append(event("u1", "i1", 5.0)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(4000)).await;

        assert_eq!(engine.current_snapshot().source_event_count, 1);
        assert!(engine.metrics().builds_succeeded >= 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_requested_rebuild_runs_out_of_cadence() {
        let store = Arc::new(MemoryInteractionStore::new());
        let engine = Arc::new(Recommender::new(Arc::clone(&store) as _, test_config()).unwrap());
        let handle = RecomputeScheduler::new(Arc::clone(&engine))
            .with_backoff(fast_backoff())
            .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;

        store.append(event("u1", "i1", 5.0)).await.unwrap();
        handle.request_rebuild();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(engine.current_snapshot().source_event_count, 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_build_retains_snapshot_and_recovers() {
        let store = Arc::new(FlakyStore::new());
        store.append(event("u1", "i1", 5.0)).await.unwrap();

        let engine = Arc::new(Recommender::new(Arc::clone(&store) as _, test_config()).unwrap());
        let handle = RecomputeScheduler::new(Arc::clone(&engine))
            .with_backoff(fast_backoff())
            .spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.current_snapshot().source_event_count, 1);

        store.set_failing(true);
        store.append(event("u2", "i1", 4.0)).await.unwrap();
        handle.request_rebuild();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // The failed cycle is counted but the last good snapshot survives.
        assert!(engine.metrics().builds_failed >= 1);
        assert_eq!(engine.current_snapshot().source_event_count, 1);

        store.set_failing(false);
        handle.request_rebuild();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.current_snapshot().source_event_count, 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let store = Arc::new(MemoryInteractionStore::new());
        let engine = Arc::new(Recommender::new(store, test_config()).unwrap());
        let handle = RecomputeScheduler::new(engine).spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.shutdown().await;
    }
}
