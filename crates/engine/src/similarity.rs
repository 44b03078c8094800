//! Pairwise similarity computation
//!
//! Scores every pair of entities (users or items, per configured mode) that
//! share at least `min_co_rated` counterparts, then keeps the top-K
//! neighbors per entity. Pair discovery walks the co-occurrence index, so
//! cost tracks the actual overlap instead of entity-count squared.
//!
//! A pair below the co-rated threshold is absent from the index, not scored
//! zero: a one-item overlap produces no evidence either way.

use std::collections::HashMap;
use std::hash::Hash;

use cinematch_core::config::EngineConfig;
use cinematch_core::types::{ItemId, SimilarityMetric, SimilarityMode, UserId};

use crate::matrix::InteractionMatrix;

/// One scored neighbor of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<I> {
    pub id: I,
    /// Finite, inside the metric's range ([-1, 1] for cosine and pearson,
    /// [0, 1] for jaccard)
    pub score: f64,
    /// Shared counterparts backing the score
    pub co_rated: u64,
}

/// Per-entity neighbor lists, sorted best-first and truncated to top-K
#[derive(Debug)]
pub struct NeighborIndex<I> {
    map: HashMap<I, Vec<Neighbor<I>>>,
}

impl<I> Default for NeighborIndex<I> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<I: Eq + Hash> NeighborIndex<I> {
    /// Neighbor list for an entity. `None` means the entity was absent from
    /// the matrix; a present entity with no qualifying pairs has an empty
    /// list.
    pub fn neighbors_of(&self, id: &I) -> Option<&[Neighbor<I>]> {
        self.map.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &I) -> bool {
        self.map.contains_key(id)
    }

    pub fn entity_count(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&I, &[Neighbor<I>])> {
        self.map.iter().map(|(id, list)| (id, list.as_slice()))
    }

    fn count_summary(&self) -> NeighborCountSummary {
        if self.map.is_empty() {
            return NeighborCountSummary::default();
        }
        let mut min = usize::MAX;
        let mut max = 0usize;
        let mut total = 0usize;
        for list in self.map.values() {
            min = min.min(list.len());
            max = max.max(list.len());
            total += list.len();
        }
        NeighborCountSummary {
            entities: self.map.len(),
            min,
            max,
            mean: total as f64 / self.map.len() as f64,
        }
    }
}

/// Neighbor-count distribution, exposed for the metrics collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeighborCountSummary {
    pub entities: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

/// Similarity index over one side of the matrix
#[derive(Debug)]
pub enum SimilarityIndex {
    UserBased(NeighborIndex<UserId>),
    ItemBased(NeighborIndex<ItemId>),
}

impl SimilarityIndex {
    pub fn empty(mode: SimilarityMode) -> Self {
        match mode {
            SimilarityMode::UserBased => Self::UserBased(NeighborIndex::default()),
            SimilarityMode::ItemBased => Self::ItemBased(NeighborIndex::default()),
        }
    }

    pub fn mode(&self) -> SimilarityMode {
        match self {
            Self::UserBased(_) => SimilarityMode::UserBased,
            Self::ItemBased(_) => SimilarityMode::ItemBased,
        }
    }

    pub fn entity_count(&self) -> usize {
        match self {
            Self::UserBased(index) => index.entity_count(),
            Self::ItemBased(index) => index.entity_count(),
        }
    }

    pub fn neighbor_counts(&self) -> NeighborCountSummary {
        match self {
            Self::UserBased(index) => index.count_summary(),
            Self::ItemBased(index) => index.count_summary(),
        }
    }
}

/// Computes a `SimilarityIndex` from a matrix snapshot
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    metric: SimilarityMetric,
    mode: SimilarityMode,
    min_co_rated: usize,
    top_k: usize,
}

impl SimilarityEngine {
    pub fn new(
        metric: SimilarityMetric,
        mode: SimilarityMode,
        min_co_rated: usize,
        top_k: usize,
    ) -> Self {
        Self {
            metric,
            mode,
            min_co_rated,
            top_k,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.metric,
            config.mode,
            config.min_co_rated,
            config.top_k_neighbors,
        )
    }

    pub fn compute(&self, matrix: &InteractionMatrix) -> SimilarityIndex {
        match self.mode {
            SimilarityMode::UserBased => SimilarityIndex::UserBased(
                self.compute_index(matrix.user_vectors(), matrix.item_index()),
            ),
            SimilarityMode::ItemBased => {
                // Transpose the matrix: items become entities, users become
                // the shared dimensions.
                let mut item_vectors: HashMap<ItemId, HashMap<UserId, f64>> = HashMap::new();
                let mut by_user: HashMap<UserId, Vec<ItemId>> = HashMap::new();
                for (user_id, items) in matrix.user_vectors() {
                    for (item_id, weight) in items {
                        item_vectors
                            .entry(item_id.clone())
                            .or_default()
                            .insert(user_id.clone(), *weight);
                        by_user
                            .entry(user_id.clone())
                            .or_default()
                            .push(item_id.clone());
                    }
                }
                SimilarityIndex::ItemBased(self.compute_index(&item_vectors, &by_user))
            }
        }
    }

    /// Score all co-occurring entity pairs and keep top-K per entity.
    ///
    /// `vectors` maps each entity to its weight vector; `by_dim` maps each
    /// shared dimension to the entities occurring in it.
    fn compute_index<I, D>(
        &self,
        vectors: &HashMap<I, HashMap<D, f64>>,
        by_dim: &HashMap<D, Vec<I>>,
    ) -> NeighborIndex<I>
    where
        I: Clone + Eq + Hash + Ord,
        D: Eq + Hash,
    {
        // Full-vector norms for the cosine denominator.
        let norms: HashMap<&I, f64> = vectors
            .iter()
            .map(|(id, v)| (id, v.values().map(|w| w * w).sum::<f64>().sqrt()))
            .collect();

        #[derive(Default)]
        struct PairAcc {
            dot: f64,
            sum_a: f64,
            sum_b: f64,
            sq_a: f64,
            sq_b: f64,
            co: u64,
        }

        let mut pairs: HashMap<(I, I), PairAcc> = HashMap::new();
        for (dim, entities) in by_dim {
            for i in 0..entities.len() {
                for j in (i + 1)..entities.len() {
                    let w_i = vectors[&entities[i]][dim];
                    let w_j = vectors[&entities[j]][dim];
                    // Canonical key: smaller id first.
                    let (a, b, w_a, w_b) = if entities[i] <= entities[j] {
                        (&entities[i], &entities[j], w_i, w_j)
                    } else {
                        (&entities[j], &entities[i], w_j, w_i)
                    };

                    let acc = pairs.entry((a.clone(), b.clone())).or_default();
                    acc.dot += w_a * w_b;
                    acc.sum_a += w_a;
                    acc.sum_b += w_b;
                    acc.sq_a += w_a * w_a;
                    acc.sq_b += w_b * w_b;
                    acc.co += 1;
                }
            }
        }

        // Every matrix entity gets a list, so "no qualifying neighbors" is an
        // empty list rather than a missing entry.
        let mut lists: HashMap<I, Vec<Neighbor<I>>> = vectors
            .keys()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        for ((a, b), acc) in pairs {
            if (acc.co as usize) < self.min_co_rated {
                continue;
            }

            let score = match self.metric {
                SimilarityMetric::Cosine => {
                    let denom = norms[&a] * norms[&b];
                    if denom == 0.0 {
                        continue;
                    }
                    (acc.dot / denom).clamp(-1.0, 1.0)
                }
                SimilarityMetric::Pearson => {
                    let n = acc.co as f64;
                    let cov = acc.dot - acc.sum_a * acc.sum_b / n;
                    let var_a = acc.sq_a - acc.sum_a * acc.sum_a / n;
                    let var_b = acc.sq_b - acc.sum_b * acc.sum_b / n;
                    // Zero variance on the overlap leaves the correlation
                    // undefined; the pair is excluded, not scored zero.
                    if var_a <= 0.0 || var_b <= 0.0 {
                        continue;
                    }
                    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
                }
                SimilarityMetric::Jaccard => {
                    let union = vectors[&a].len() + vectors[&b].len() - acc.co as usize;
                    if union == 0 {
                        continue;
                    }
                    acc.co as f64 / union as f64
                }
            };

            if !score.is_finite() {
                continue;
            }

            if let Some(list) = lists.get_mut(&a) {
                list.push(Neighbor {
                    id: b.clone(),
                    score,
                    co_rated: acc.co,
                });
            }
            if let Some(list) = lists.get_mut(&b) {
                list.push(Neighbor {
                    id: a,
                    score,
                    co_rated: acc.co,
                });
            }
        }

        for list in lists.values_mut() {
            list.sort_by(|x, y| {
                y.score
                    .total_cmp(&x.score)
                    .then_with(|| y.co_rated.cmp(&x.co_rated))
                    .then_with(|| x.id.cmp(&y.id))
            });
            list.truncate(self.top_k);
        }

        NeighborIndex { map: lists }
    }
}
