use std::cmp::Ordering;

use itertools::Itertools;

use super::CorruptionScore;
use crate::{config::Ranking, netlist::Edge};

fn rank(ranking: Ranking, a: &CorruptionScore, b: &CorruptionScore) -> Ordering {
    let by_score = match ranking {
        Ranking::Highest => b.score.total_cmp(&a.score),
        Ranking::Balanced => (a.score - 0.5).abs().total_cmp(&(b.score - 0.5).abs()),
    };
    by_score.then_with(|| a.edge.cmp(&b.edge))
}

/// Orders `scores` best first under `ranking`, ties broken by edge.
pub fn ranked(scores: &[CorruptionScore], ranking: Ranking) -> Vec<CorruptionScore> {
    scores
        .iter()
        .copied()
        .sorted_by(|a, b| rank(ranking, a, b))
        .collect()
}

/// Picks up to `count` distinct edges, best first.
///
/// Duplicate edges are collapsed (keeping their best score) before picking.
/// Asking for more than exist returns everything; reporting the shortfall is
/// the caller's job.
pub fn select(scores: &[CorruptionScore], count: usize, ranking: Ranking) -> Vec<Edge> {
    ranked(scores, ranking)
        .into_iter()
        .map(|s| s.edge)
        .unique()
        .take(count)
        .collect()
}
