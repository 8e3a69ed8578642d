//! Random walk primitives shared by the index schemes.
//!
//! A PPR walk from `v` takes uniform out-edge steps and stops after each step with
//! probability `alpha`; it also stops on reaching a dangling node. The endpoint is a sample
//! from the PPR distribution of `v` (conditioned on the first step, which is why the
//! caller scales by `1 - alpha`).

use rand::distr::{Bernoulli, Distribution};
use rand::Rng;

use crate::graph::{DynamicGraph, GraphRef};

/// Upper bound on a stored walk's step count. Any width works as long as it is far beyond
/// practical `1/alpha` scales; the probability of reaching it is `(1-alpha)^65535`.
pub const MAX_WALK_LENGTH: usize = u16::MAX as usize;

/// Endpoint of a fresh walk from `start`, not stored anywhere.
pub fn walk_endpoint<R: Rng + ?Sized>(graph: &DynamicGraph, start: usize, alpha: f64, rng: &mut R) -> usize {
    let mut curr = start;
    loop {
        let nbrs = graph.neighbors_ref(curr);
        if nbrs.is_empty() {
            return curr;
        }
        curr = nbrs[rng.random_range(0..nbrs.len())];
        if rng.random::<f64>() < alpha {
            return curr;
        }
    }
}

/// Number of steps in a stored walk: Bernoulli(`alpha`) trials up to and including the
/// first success, capped at [`MAX_WALK_LENGTH`].
pub fn walk_length<R: Rng + ?Sized>(alpha: f64, rng: &mut R) -> usize {
    let stop = match Bernoulli::new(alpha) {
        Ok(d) => d,
        Err(_) => return 1,
    };
    let mut len = 1;
    while len < MAX_WALK_LENGTH && !stop.sample(rng) {
        len += 1;
    }
    len
}

/// Geometric draw on `{1, 2, ...}` by inversion.
fn geometric<R: Rng + ?Sized>(p: f64, rng: &mut R) -> u64 {
    if p >= 1.0 {
        return 1;
    }
    // 1 - u lies in (0, 1], keeping ln finite.
    let u = 1.0 - rng.random::<f64>();
    let k = (u.ln() / (1.0 - p).ln()).ceil();
    if k < 1.0 {
        1
    } else if k >= u64::MAX as f64 {
        u64::MAX
    } else {
        k as u64
    }
}

/// Binomial(`n`, `p`) by summing geometric gaps between successes; expected cost `O(np)`.
pub fn binomial<R: Rng + ?Sized>(n: usize, p: f64, rng: &mut R) -> usize {
    if p <= 0.0 || n == 0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    let mut successes = 0usize;
    let mut at = 0u64;
    loop {
        at = at.saturating_add(geometric(p, rng));
        if at > n as u64 {
            return successes;
        }
        successes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn endpoint_of_dangling_start_is_itself() {
        let g = DynamicGraph::new(3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(walk_endpoint(&g, 2, 0.2, &mut rng), 2);
    }

    #[test]
    fn endpoints_follow_edges() {
        // 1 -> 2 -> 3 (dangling): every walk from 1 ends at 2 or 3.
        let g = DynamicGraph::from_edges(3, &[(1, 2), (2, 3)], true);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let t = walk_endpoint(&g, 1, 0.2, &mut rng);
            assert!(t == 2 || t == 3, "t={t}");
        }
    }

    #[test]
    fn walk_length_mean_is_about_one_over_alpha() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 20_000;
        let total: usize = (0..n).map(|_| walk_length(0.25, &mut rng)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 4.0).abs() < 0.2, "mean={mean}");
        assert_eq!(walk_length(1.0, &mut rng), 1);
    }

    #[test]
    fn binomial_edges_and_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(binomial(10, 0.0, &mut rng), 0);
        assert_eq!(binomial(10, 1.0, &mut rng), 10);
        assert_eq!(binomial(0, 0.5, &mut rng), 0);

        let trials = 5_000;
        let mut total = 0usize;
        for _ in 0..trials {
            let k = binomial(40, 0.25, &mut rng);
            assert!(k <= 40);
            total += k;
        }
        let mean = total as f64 / trials as f64;
        assert!((mean - 10.0).abs() < 0.3, "mean={mean}");
    }
}
