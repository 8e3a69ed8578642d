//! Ranking utilities.
//!
//! Only finite, strictly positive scores are ranked. Equal scores rank the smaller node id
//! first, so output order is a pure function of the scores.

use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

type Key = (NotNan<f64>, Reverse<usize>);

/// Top `k` of `(node, score)` pairs, best first.
pub fn top_k_by<I>(scored: I, k: usize) -> Vec<(usize, f64)>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<Key>> = BinaryHeap::with_capacity(k + 1);
    for (i, score) in scored {
        if !score.is_finite() || score <= 0.0 {
            continue;
        }
        let Ok(s) = NotNan::new(score) else { continue };
        let key = (s, Reverse(i));
        if heap.len() < k {
            heap.push(Reverse(key));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if key > *worst {
                heap.pop();
                heap.push(Reverse(key));
            }
        }
    }
    let mut keys: Vec<Key> = heap.into_iter().map(|Reverse(key)| key).collect();
    keys.sort_unstable_by(|a, b| b.cmp(a));
    keys.into_iter().map(|(s, Reverse(i))| (i, s.into_inner())).collect()
}

/// Top `k` entries of a score vector indexed by node id.
pub fn top_k(scores: &[f64], k: usize) -> Vec<(usize, f64)> {
    top_k_by(scores.iter().copied().enumerate(), k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending_and_truncates() {
        let scores = [0.0, 0.1, 0.4, 0.2, 0.3];
        let top = top_k(&scores, 2);
        assert_eq!(top, vec![(2, 0.4), (4, 0.3)]);
    }

    #[test]
    fn skips_non_positive_and_non_finite() {
        let scores = [0.0, -1.0, f64::NAN, 0.5, f64::INFINITY, 0.0];
        assert_eq!(top_k(&scores, 10), vec![(3, 0.5)]);
    }

    #[test]
    fn ties_prefer_smaller_ids() {
        let scored = vec![(7, 0.25), (3, 0.25), (5, 0.5), (1, 0.25)];
        let top = top_k_by(scored, 3);
        assert_eq!(top, vec![(5, 0.5), (1, 0.25), (3, 0.25)]);
    }

    #[test]
    fn zero_k_is_empty() {
        assert!(top_k(&[0.0, 1.0], 0).is_empty());
    }
}
