//! Domain types for the recommendation engine
//!
//! Interaction records are immutable once appended to the log. Ids are
//! caller-supplied opaque strings (chat ids, catalog ids); format rules live
//! in the `validation` module and are enforced at the engine boundary, not at
//! construction time, so that a malformed record in the log can be skipped
//! and counted instead of poisoning a whole build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CineMatchError;

/// Opaque user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for UserId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Opaque item identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ItemId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// A recorded user-item interaction signal
///
/// The weight is an explicit rating or an implicit strength (view count,
/// completion fraction scaled by the ingestion layer). Records are never
/// mutated or deleted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub weight: f64,
    pub recorded_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(
        user_id: impl Into<UserId>,
        item_id: impl Into<ItemId>,
        weight: f64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            weight,
            recorded_at,
        }
    }
}

/// A ranked recommendation, derived per request and never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    /// Predicted preference on the scale of the stored weights
    pub score: f64,
    /// 1-based position in the result list
    pub rank: usize,
}

/// Similarity metric, dispatched by pure functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Dot product over shared dimensions divided by the full vector norms
    Cosine,
    /// Correlation centered on each entity's mean over the shared dimensions
    Pearson,
    /// Set overlap for binary/implicit signals
    Jaccard,
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Pearson => "pearson",
            Self::Jaccard => "jaccard",
        };
        f.write_str(name)
    }
}

impl FromStr for SimilarityMetric {
    type Err = CineMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "pearson" => Ok(Self::Pearson),
            "jaccard" => Ok(Self::Jaccard),
            other => Err(CineMatchError::configuration(format!(
                "Unknown similarity metric '{other}' (expected cosine, pearson, or jaccard)"
            ))),
        }
    }
}

/// Which side of the interaction matrix neighbors are computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    /// Neighbors are users with overlapping item histories
    UserBased,
    /// Neighbors are items rated by overlapping user sets
    ItemBased,
}

impl fmt::Display for SimilarityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserBased => "user_based",
            Self::ItemBased => "item_based",
        };
        f.write_str(name)
    }
}

impl FromStr for SimilarityMode {
    type Err = CineMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "user_based" => Ok(Self::UserBased),
            "item" | "item_based" => Ok(Self::ItemBased),
            other => Err(CineMatchError::configuration(format!(
                "Unknown similarity mode '{other}' (expected user or item)"
            ))),
        }
    }
}

/// How duplicate (user, item) pairs are reduced during a matrix build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionPolicy {
    /// Sum all weights for the pair; suits implicit-feedback counts
    SumWeights,
    /// Keep the most recent weight; suits explicit re-rating
    LatestWins,
}

impl fmt::Display for ReductionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SumWeights => "sum_weights",
            Self::LatestWins => "latest_wins",
        };
        f.write_str(name)
    }
}

impl FromStr for ReductionPolicy {
    type Err = CineMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" | "sum_weights" => Ok(Self::SumWeights),
            "latest" | "latest_wins" => Ok(Self::LatestWins),
            other => Err(CineMatchError::configuration(format!(
                "Unknown reduction policy '{other}' (expected sum_weights or latest_wins)"
            ))),
        }
    }
}
