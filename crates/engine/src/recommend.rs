//! Recommendation generation
//!
//! Pure reads over one immutable snapshot: no locking, no I/O. The
//! predicted score for a candidate item is the similarity-weighted average
//! of neighbor weights, `sum(sim * weight) / sum(|sim|)`, over the
//! neighbors that rated it. Candidates the user has already interacted
//! with are excluded, as are candidates with no contributing neighbor.
//!
//! An unknown user is a normal cold-start case and yields an empty list;
//! choosing a fallback (popularity, editorial picks) is the caller's call.

use std::collections::HashMap;

use cinematch_core::error::CineMatchError;
use cinematch_core::types::{ItemId, Recommendation, UserId};
use cinematch_core::validation;

use crate::matrix::InteractionMatrix;
use crate::similarity::{NeighborIndex, SimilarityIndex};
use crate::snapshot::ModelSnapshot;

#[derive(Default)]
struct Contribution {
    weighted_sum: f64,
    similarity_mass: f64,
    contributors: u64,
}

/// Produces ranked recommendations from a snapshot
pub struct RecommendationGenerator;

impl RecommendationGenerator {
    /// Top-N items for a user, best first, ranks 1-based.
    ///
    /// Fails with `InvalidArgument` when `top_n` is zero; an unknown user
    /// returns `Ok` with an empty list.
    pub fn recommend(
        user_id: &UserId,
        snapshot: &ModelSnapshot,
        top_n: usize,
    ) -> Result<Vec<Recommendation>, CineMatchError> {
        validation::validate_top_n(top_n)?;

        let candidates = match &snapshot.similarity {
            SimilarityIndex::UserBased(index) => {
                Self::user_based_candidates(user_id, &snapshot.matrix, index)
            }
            SimilarityIndex::ItemBased(index) => {
                Self::item_based_candidates(user_id, &snapshot.matrix, index)
            }
        };

        Ok(Self::rank(candidates, top_n))
    }

    /// Items ranked by total interaction weight across all users.
    ///
    /// Supplied as caller-side cold-start material; deliberately not folded
    /// into `recommend`.
    pub fn popular(
        snapshot: &ModelSnapshot,
        limit: usize,
    ) -> Result<Vec<Recommendation>, CineMatchError> {
        validation::validate_top_n(limit)?;

        let mut totals: HashMap<&ItemId, f64> = HashMap::new();
        for items in snapshot.matrix.user_vectors().values() {
            for (item_id, weight) in items {
                *totals.entry(item_id).or_default() += weight;
            }
        }

        let mut scored: Vec<(&ItemId, f64)> = totals.into_iter().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(position, (item_id, score))| Recommendation {
                item_id: item_id.clone(),
                score,
                rank: position + 1,
            })
            .collect())
    }

    /// Aggregate over the user's similar users: every item a neighbor rated
    /// that the target user has not.
    fn user_based_candidates(
        user_id: &UserId,
        matrix: &InteractionMatrix,
        index: &NeighborIndex<UserId>,
    ) -> HashMap<ItemId, Contribution> {
        let mut candidates: HashMap<ItemId, Contribution> = HashMap::new();

        let Some(neighbors) = index.neighbors_of(user_id) else {
            return candidates;
        };
        let seen = matrix.user_items(user_id);

        for neighbor in neighbors {
            if neighbor.score == 0.0 {
                continue;
            }
            let Some(items) = matrix.user_items(&neighbor.id) else {
                continue;
            };
            for (item_id, weight) in items {
                if seen.is_some_and(|s| s.contains_key(item_id)) {
                    continue;
                }
                let entry = candidates.entry(item_id.clone()).or_default();
                entry.weighted_sum += neighbor.score * weight;
                entry.similarity_mass += neighbor.score.abs();
                entry.contributors += 1;
            }
        }

        candidates
    }

    /// Aggregate over the user's own history: every neighbor item of a
    /// rated item, weighted by the rating of the anchor item.
    fn item_based_candidates(
        user_id: &UserId,
        matrix: &InteractionMatrix,
        index: &NeighborIndex<ItemId>,
    ) -> HashMap<ItemId, Contribution> {
        let mut candidates: HashMap<ItemId, Contribution> = HashMap::new();

        let Some(rated) = matrix.user_items(user_id) else {
            return candidates;
        };

        for (rated_item, weight) in rated {
            let Some(neighbors) = index.neighbors_of(rated_item) else {
                continue;
            };
            for neighbor in neighbors {
                if neighbor.score == 0.0 || rated.contains_key(&neighbor.id) {
                    continue;
                }
                let entry = candidates.entry(neighbor.id.clone()).or_default();
                entry.weighted_sum += neighbor.score * weight;
                entry.similarity_mass += neighbor.score.abs();
                entry.contributors += 1;
            }
        }

        candidates
    }

    fn rank(candidates: HashMap<ItemId, Contribution>, top_n: usize) -> Vec<Recommendation> {
        let mut scored: Vec<(ItemId, f64, u64)> = candidates
            .into_iter()
            .filter_map(|(item_id, c)| {
                if c.contributors == 0 || c.similarity_mass == 0.0 {
                    return None;
                }
                let score = c.weighted_sum / c.similarity_mass;
                score
                    .is_finite()
                    .then_some((item_id, score, c.contributors))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_n);

        scored
            .into_iter()
            .enumerate()
            .map(|(position, (item_id, score, _))| Recommendation {
                item_id,
                score,
                rank: position + 1,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixBuilder;
    use crate::similarity::SimilarityEngine;
    use chrono::Utc;
    use cinematch_core::types::{
        Interaction, ReductionPolicy, SimilarityMetric, SimilarityMode,
    };

    fn snapshot_from(
        events: &[(&str, &str, f64)],
        metric: SimilarityMetric,
        mode: SimilarityMode,
        min_co_rated: usize,
        top_k: usize,
    ) -> ModelSnapshot {
        let interactions: Vec<_> = events
            .iter()
            .map(|(u, i, w)| Interaction::new(*u, *i, *w, Utc::now()))
            .collect();
        let (matrix, report) =
            MatrixBuilder::new(ReductionPolicy::SumWeights, true).build(&interactions);
        let index = SimilarityEngine::new(metric, mode, min_co_rated, top_k).compute(&matrix);
        ModelSnapshot::new(matrix, index, interactions.len() as u64, report)
    }

    const THREE_USERS: &[(&str, &str, f64)] = &[
        ("u1", "i1", 5.0),
        ("u1", "i2", 3.0),
        ("u2", "i1", 4.0),
        ("u2", "i3", 5.0),
        ("u3", "i2", 5.0),
        ("u3", "i3", 4.0),
    ];

    #[test]
    fn test_user_based_worked_example() {
        let snapshot = snapshot_from(
            THREE_USERS,
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let recs = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 1).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item_id.as_str(), "i3");
        assert_eq!(recs[0].rank, 1);

        // sim(u1,u2) = 20/sqrt(34*41), sim(u1,u3) = 15/sqrt(34*41);
        // score(i3) = (sim12*5 + sim13*4) / (sim12 + sim13)
        let sim12 = 20.0 / (34.0_f64 * 41.0).sqrt();
        let sim13 = 15.0 / (34.0_f64 * 41.0).sqrt();
        let expected = (sim12 * 5.0 + sim13 * 4.0) / (sim12 + sim13);
        assert!((recs[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_already_seen_items_excluded() {
        let snapshot = snapshot_from(
            THREE_USERS,
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let recs = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 10).unwrap();
        assert!(recs.iter().all(|r| r.item_id.as_str() == "i3"));
    }

    #[test]
    fn test_unknown_user_yields_empty() {
        let snapshot = snapshot_from(
            THREE_USERS,
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let recs = RecommendationGenerator::recommend(&"stranger".into(), &snapshot, 5).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_zero_top_n_is_invalid() {
        let snapshot = snapshot_from(
            THREE_USERS,
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let err = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 0).unwrap_err();
        assert!(matches!(err, CineMatchError::InvalidArgument { .. }));
    }

    #[test]
    fn test_item_based_mode_recommends_unseen_items() {
        let snapshot = snapshot_from(
            THREE_USERS,
            SimilarityMetric::Cosine,
            SimilarityMode::ItemBased,
            1,
            5,
        );

        let recs = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 5).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item_id.as_str(), "i3");
    }

    #[test]
    fn test_ranks_are_one_based_and_ordered() {
        // u1 overlaps u2 on i1; u2 brings two unseen items with different
        // weights, so both become candidates with the same neighbor set.
        let snapshot = snapshot_from(
            &[
                ("u1", "i1", 5.0),
                ("u2", "i1", 5.0),
                ("u2", "i2", 4.0),
                ("u2", "i3", 2.0),
            ],
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let recs = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 5).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].item_id.as_str(), "i2");
        assert_eq!(recs[0].rank, 1);
        assert_eq!(recs[1].item_id.as_str(), "i3");
        assert_eq!(recs[1].rank, 2);
        assert!(recs[0].score > recs[1].score);
    }

    #[test]
    fn test_score_ties_break_by_item_id() {
        let snapshot = snapshot_from(
            &[
                ("u1", "i1", 5.0),
                ("u2", "i1", 5.0),
                ("u2", "i3", 4.0),
                ("u2", "i2", 4.0),
            ],
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let recs = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 5).unwrap();
        assert_eq!(recs.len(), 2);
        // Same score and contributor count; the lower id ranks first.
        assert_eq!(recs[0].item_id.as_str(), "i2");
        assert_eq!(recs[1].item_id.as_str(), "i3");
    }

    #[test]
    fn test_empty_snapshot_serves_empty_results() {
        let snapshot = ModelSnapshot::empty(SimilarityMode::UserBased);
        let recs = RecommendationGenerator::recommend(&"u1".into(), &snapshot, 3).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_popular_ranks_by_total_weight() {
        let snapshot = snapshot_from(
            THREE_USERS,
            SimilarityMetric::Cosine,
            SimilarityMode::UserBased,
            1,
            5,
        );

        let popular = RecommendationGenerator::popular(&snapshot, 2).unwrap();
        // Totals: i1 = 9, i2 = 8, i3 = 9. Tie between i1 and i3 goes to i1.
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].item_id.as_str(), "i1");
        assert_eq!(popular[1].item_id.as_str(), "i3");
        assert_eq!(popular[1].rank, 2);
    }

    #[test]
    fn test_popular_rejects_zero_limit() {
        let snapshot = ModelSnapshot::empty(SimilarityMode::UserBased);
        assert!(RecommendationGenerator::popular(&snapshot, 0).is_err());
    }

    #[test]
    fn test_determinism_of_full_pipeline() {
        let run = || {
            let snapshot = snapshot_from(
                THREE_USERS,
                SimilarityMetric::Cosine,
                SimilarityMode::UserBased,
                1,
                5,
            );
            RecommendationGenerator::recommend(&"u1".into(), &snapshot, 5).unwrap()
        };

        assert_eq!(run(), run());
    }
}
