//! Sparse interaction matrix
//!
//! `MatrixBuilder` reduces the raw interaction log into an immutable sparse
//! user-item matrix with a reverse index for co-rated lookups. The build is
//! a pure function of its input sequence: same events in, same matrix out.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cinematch_core::config::EngineConfig;
use cinematch_core::types::{Interaction, ItemId, ReductionPolicy, UserId};
use cinematch_core::validation;

/// Immutable sparse user-item matrix snapshot
///
/// Holds the forward map (user to item weights) and the reverse index
/// (item to rating users), both produced in the same build pass. Never
/// mutated after construction.
#[derive(Debug, Default)]
pub struct InteractionMatrix {
    by_user: HashMap<UserId, HashMap<ItemId, f64>>,
    by_item: HashMap<ItemId, Vec<UserId>>,
    pair_count: u64,
}

impl InteractionMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Weights for every item the user has interacted with.
    pub fn user_items(&self, user_id: &UserId) -> Option<&HashMap<ItemId, f64>> {
        self.by_user.get(user_id)
    }

    /// Users that have interacted with the item.
    pub fn item_users(&self, item_id: &ItemId) -> Option<&[UserId]> {
        self.by_item.get(item_id).map(Vec::as_slice)
    }

    pub fn weight(&self, user_id: &UserId, item_id: &ItemId) -> Option<f64> {
        self.by_user.get(user_id)?.get(item_id).copied()
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.by_user.keys()
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemId> {
        self.by_item.keys()
    }

    pub fn user_vectors(&self) -> &HashMap<UserId, HashMap<ItemId, f64>> {
        &self.by_user
    }

    pub fn item_index(&self) -> &HashMap<ItemId, Vec<UserId>> {
        &self.by_item
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn item_count(&self) -> usize {
        self.by_item.len()
    }

    /// Distinct (user, item) pairs after reduction.
    pub fn pair_count(&self) -> u64 {
        self.pair_count
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

/// Outcome counters for one matrix build
///
/// Malformed records are skipped and counted, never fatal to the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Events that made it into the matrix
    pub accepted: u64,
    /// Events dropped for an empty or malformed id
    pub skipped_invalid_id: u64,
    /// Events dropped for a non-finite or non-positive weight
    pub skipped_invalid_weight: u64,
}

impl BuildReport {
    pub fn total_skipped(&self) -> u64 {
        self.skipped_invalid_id + self.skipped_invalid_weight
    }
}

/// Builds an `InteractionMatrix` from an event sequence
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    reduction: ReductionPolicy,
    require_positive_weights: bool,
}

impl MatrixBuilder {
    pub fn new(reduction: ReductionPolicy, require_positive_weights: bool) -> Self {
        Self {
            reduction,
            require_positive_weights,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.reduction, config.require_positive_weights)
    }

    /// Reduce the event sequence into a matrix, one pass, O(events) time.
    ///
    /// Duplicate (user, item) pairs are reduced per the configured policy:
    /// `SumWeights` accumulates, `LatestWins` keeps the weight with the
    /// newest `recorded_at` (input order breaks timestamp ties).
    pub fn build(&self, interactions: &[Interaction]) -> (InteractionMatrix, BuildReport) {
        let mut report = BuildReport::default();
        let mut cells: HashMap<UserId, HashMap<ItemId, (f64, DateTime<Utc>)>> = HashMap::new();

        for interaction in interactions {
            if !validation::is_valid_entity_id(interaction.user_id.as_str())
                || !validation::is_valid_entity_id(interaction.item_id.as_str())
            {
                report.skipped_invalid_id += 1;
                tracing::debug!(
                    user_id = %interaction.user_id,
                    item_id = %interaction.item_id,
                    "Skipping interaction with malformed id"
                );
                continue;
            }

            if !interaction.weight.is_finite()
                || (self.require_positive_weights && interaction.weight <= 0.0)
            {
                report.skipped_invalid_weight += 1;
                tracing::debug!(
                    user_id = %interaction.user_id,
                    item_id = %interaction.item_id,
                    weight = interaction.weight,
                    "Skipping interaction with unusable weight"
                );
                continue;
            }

            report.accepted += 1;
            let cell = cells
                .entry(interaction.user_id.clone())
                .or_default()
                .entry(interaction.item_id.clone());

            match self.reduction {
                ReductionPolicy::SumWeights => {
                    let entry = cell.or_insert((0.0, interaction.recorded_at));
                    entry.0 += interaction.weight;
                    entry.1 = entry.1.max(interaction.recorded_at);
                }
                ReductionPolicy::LatestWins => {
                    let entry = cell.or_insert((interaction.weight, interaction.recorded_at));
                    if interaction.recorded_at >= entry.1 {
                        *entry = (interaction.weight, interaction.recorded_at);
                    }
                }
            }
        }

        let mut by_user: HashMap<UserId, HashMap<ItemId, f64>> =
            HashMap::with_capacity(cells.len());
        let mut by_item: HashMap<ItemId, Vec<UserId>> = HashMap::new();
        let mut pair_count = 0u64;

        for (user_id, items) in cells {
            let mut weights = HashMap::with_capacity(items.len());
            for (item_id, (weight, _)) in items {
                by_item
                    .entry(item_id.clone())
                    .or_default()
                    .push(user_id.clone());
                weights.insert(item_id, weight);
                pair_count += 1;
            }
            by_user.insert(user_id, weights);
        }

        if report.total_skipped() > 0 {
            tracing::info!(
                accepted = report.accepted,
                skipped_invalid_id = report.skipped_invalid_id,
                skipped_invalid_weight = report.skipped_invalid_weight,
                "Matrix build skipped unusable interactions"
            );
        }

        (
            InteractionMatrix {
                by_user,
                by_item,
                pair_count,
            },
            report,
        )
    }
}
