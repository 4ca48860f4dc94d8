use rand::Rng;
use std::cmp::Ordering;

/// Tournament selection: index of the best of `tournament_size` uniformly drawn
/// candidates, drawn with replacement. Ties keep the first drawn. `scores` must be
/// non-empty.
pub fn tournament_selection<R: Rng>(scores: &[f64], tournament_size: usize, rng: &mut R) -> usize {
    let mut best_idx = rng.gen_range(0..scores.len());

    for _ in 1..tournament_size.max(1) {
        let idx = rng.gen_range(0..scores.len());
        if compare_fitness(scores[idx], scores[best_idx]) == Ordering::Greater {
            best_idx = idx;
        }
    }

    best_idx
}

/// Indices sorted by descending fitness; NaN sorts last and ties keep population order.
pub fn rank_by_fitness(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| compare_fitness(scores[b], scores[a]));
    order
}

/// Total order on fitness values with NaN below everything
pub fn compare_fitness(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
