//! Interaction log storage
//!
//! The engine consumes an append-only log of interaction events through the
//! `InteractionStore` trait and never mutates or deletes records. Appending
//! is the ingestion layer's side of the contract. Two implementations are
//! provided: an in-memory store for tests and bootstrap, and a durable
//! JSON-lines file log.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use cinematch_core::types::Interaction;
use tokio::io::AsyncWriteExt;

/// Append-only interaction log
///
/// `read_all` returns events oldest first. The recompute pipeline is the
/// only reader and the only caller allowed to block on storage I/O.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Full interaction log, oldest first.
    async fn read_all(&self) -> Result<Vec<Interaction>>;

    /// Append one event to the log. Called by the ingestion layer, not by
    /// the engine.
    async fn append(&self, interaction: Interaction) -> Result<()>;

    /// Number of events currently in the log. Used by the staleness
    /// predicate; must be cheap.
    async fn count(&self) -> Result<u64>;
}

/// In-memory interaction log
#[derive(Default)]
pub struct MemoryInteractionStore {
    events: RwLock<Vec<Interaction>>,
}

impl MemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a fixed event sequence.
    pub fn with_events(events: Vec<Interaction>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }
}

#[async_trait]
impl InteractionStore for MemoryInteractionStore {
    async fn read_all(&self) -> Result<Vec<Interaction>> {
        let events = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(events.clone())
    }

    async fn append(&self, interaction: Interaction) -> Result<()> {
        let mut events = self
            .events
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        events.push(interaction);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let events = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(events.len() as u64)
    }
}

/// Durable JSON-lines interaction log
///
/// One serialized `Interaction` per line. Corrupt lines found on read are
/// skipped and counted, mirroring the build pipeline's policy for malformed
/// records; they never fail a rebuild.
pub struct JsonlInteractionStore {
    path: PathBuf,
    /// Valid events observed at open plus appends since.
    event_count: AtomicU64,
    /// Serializes concurrent appends so lines are never interleaved.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlInteractionStore {
    /// Open a log file, creating it if absent, and count the events it
    /// already holds.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let existing = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::parse_lines(&contents, &path).len() as u64,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::File::create(&path)
                    .await
                    .with_context(|| format!("creating interaction log {}", path.display()))?;
                0
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("opening interaction log {}", path.display()))
            }
        };

        Ok(Self {
            path,
            event_count: AtomicU64::new(existing),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_lines(contents: &str, path: &Path) -> Vec<Interaction> {
        let mut events = Vec::new();
        let mut corrupt = 0u64;

        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Interaction>(line) {
                Ok(interaction) => events.push(interaction),
                Err(err) => {
                    corrupt += 1;
                    tracing::debug!(
                        line = line_no + 1,
                        error = %err,
                        "Skipping corrupt interaction log line"
                    );
                }
            }
        }

        if corrupt > 0 {
            tracing::warn!(
                path = %path.display(),
                corrupt_lines = corrupt,
                "Interaction log contained unreadable lines"
            );
        }

        events
    }
}

#[async_trait]
impl InteractionStore for JsonlInteractionStore {
    async fn read_all(&self) -> Result<Vec<Interaction>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading interaction log {}", self.path.display()))?;
        Ok(Self::parse_lines(&contents, &self.path))
    }

    async fn append(&self, interaction: Interaction) -> Result<()> {
        let mut line =
            serde_json::to_string(&interaction).context("serializing interaction record")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening interaction log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("appending interaction record")?;
        file.flush().await.context("flushing interaction log")?;

        self.event_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.event_count.load(Ordering::Relaxed))
    }
}
